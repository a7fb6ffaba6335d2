use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::database::StoreError;
use crate::models::ValidationError;
use crate::utils::{error_codes, error_to_api_response};

/// 接口错误，每种错误对应不同的 HTTP 状态码和错误码
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    #[error("too many requests, retry in {0} seconds")]
    RateLimited(u64),
    #[error("service temporarily unavailable: {0}")]
    Unavailable(String),
    #[error("internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            AppError::Validation(_) => error_codes::VALIDATION_ERROR,
            AppError::Unauthorized(_) => error_codes::AUTH_FAILED,
            AppError::NotFound(_) => error_codes::NOT_FOUND,
            AppError::RateLimited(_) => error_codes::RATE_LIMIT,
            AppError::Unavailable(_) => error_codes::UNAVAILABLE,
            AppError::Internal(_) => error_codes::INTERNAL_ERROR,
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(e: ValidationError) -> Self {
        AppError::Validation(e.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => AppError::NotFound("group not found".into()),
            StoreError::Validation(v) => v.into(),
            StoreError::Backend(msg) => AppError::Unavailable(msg),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = error_to_api_response::<()>(self.code(), self.to_string());
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_distinct_kinds() {
        let not_found: AppError = StoreError::NotFound.into();
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let invalid: AppError =
            StoreError::Validation(ValidationError::DayOutOfRange { day: 9, max: 5 }).into();
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
        assert_eq!(invalid.to_string(), "day must be between 1 and 5, got 9");

        let backend: AppError = StoreError::Backend("connection refused".into()).into();
        assert_eq!(backend.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(backend.code(), error_codes::UNAVAILABLE);
    }

    #[test]
    fn validation_messages_name_the_field() {
        let e: AppError = ValidationError::MissingGroupName.into();
        assert_eq!(e.to_string(), "group name required");
        let e: AppError = ValidationError::NoMembers.into();
        assert_eq!(e.to_string(), "at least one member required");
    }
}
