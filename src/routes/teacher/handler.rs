use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::WithRejection;

use crate::{
    AppState,
    error::AppError,
    utils::{Claims, generate_teacher_token, success_to_api_response, verify_teacher_password},
};

use super::model::{CheckTokenResponse, TeacherLoginRequest, TeacherLoginResponse};

/// 教师登录，密码正确时签发令牌
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<TeacherLoginRequest>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    if state.config.teacher_password.is_none() {
        tracing::warn!("Teacher login attempted but no teacher password is configured");
    }

    if !verify_teacher_password(&req.password, state.config.teacher_password.as_deref()) {
        tracing::warn!("Rejected teacher login");
        return Err(AppError::Unauthorized("incorrect password".into()));
    }

    let (token, expires_at) = generate_teacher_token(&state.config)
        .map_err(|e| AppError::Internal(format!("failed to issue token: {}", e)))?;
    tracing::info!("Teacher logged in");

    Ok((
        StatusCode::OK,
        success_to_api_response(TeacherLoginResponse {
            success: true,
            token,
            expires_at,
        }),
    ))
}

/// 令牌已由中间件校验，这里直接返回令牌信息
#[axum::debug_handler]
pub async fn check_token(Extension(claims): Extension<Claims>) -> impl IntoResponse {
    (
        StatusCode::OK,
        success_to_api_response(CheckTokenResponse {
            role: claims.role,
            expires_at: claims.exp,
        }),
    )
}
