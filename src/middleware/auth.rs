use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};

use crate::{AppState, error::AppError, utils::verify_token};

/// 教师接口的令牌校验
///
/// 校验通过后把 Claims 放入请求扩展，供后续 handler 使用。
pub async fn teacher_auth(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let Some(Authorization(bearer)) = req.headers().typed_get::<Authorization<Bearer>>() else {
        return Err(AppError::Unauthorized("teacher login required".into()));
    };

    let claims = verify_token(bearer.token(), &state.config).map_err(|e| {
        tracing::debug!("Rejected teacher token: {}", e);
        AppError::Unauthorized("invalid or expired teacher token".into())
    })?;

    if !claims.is_teacher() {
        return Err(AppError::Unauthorized("teacher role required".into()));
    }

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
