use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;

use crate::{
    AppState,
    error::AppError,
    models::check_day,
    utils::{Claims, success_to_api_response},
};

use super::model::{CreateGroupRequest, SaveDayRequest, SaveGradingRequest};

#[axum::debug_handler]
pub async fn list_groups(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let groups = state.store.list().await?;
    Ok((StatusCode::OK, success_to_api_response(groups)))
}

#[axum::debug_handler]
pub async fn create_group(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<CreateGroupRequest>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let new_group = req.validate()?;
    let group = state.store.create(new_group).await?;
    tracing::info!("Created group {} ({})", group.id, group.group_name);
    Ok((StatusCode::OK, success_to_api_response(group)))
}

#[axum::debug_handler]
pub async fn get_group(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let group = state.store.get(&group_id).await?;
    Ok((StatusCode::OK, success_to_api_response(group)))
}

/// 进度汇总，每次请求时根据当前记录计算
#[axum::debug_handler]
pub async fn get_progress(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let group = state.store.get(&group_id).await?;
    Ok((StatusCode::OK, success_to_api_response(group.progress())))
}

/// 保存或完成某一天，`completed: true` 即为完成
#[axum::debug_handler]
pub async fn save_day(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
    WithRejection(Json(req), _): WithRejection<Json<SaveDayRequest>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let day = check_day(req.day, state.store.stage_count())?;
    let completed = req.data.is_completed();
    let group = state.store.replace_stage(&group_id, day, req.data).await?;
    tracing::info!(
        "Saved day {} of group {}{}",
        day,
        group_id,
        if completed { " (completed)" } else { "" }
    );
    Ok((StatusCode::OK, success_to_api_response(group)))
}

#[axum::debug_handler]
pub async fn save_grading(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(group_id): Path<String>,
    WithRejection(Json(req), _): WithRejection<Json<SaveGradingRequest>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    req.grading.validate()?;
    let group = state.store.replace_grading(&group_id, req.grading).await?;
    tracing::info!("Grading of group {} updated by {}", group_id, claims.sub);
    Ok((StatusCode::OK, success_to_api_response(group)))
}

#[axum::debug_handler]
pub async fn delete_group(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(group_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.store.delete(&group_id).await?;
    tracing::info!("Group {} deleted by {}", group_id, claims.sub);
    Ok((
        StatusCode::OK,
        success_to_api_response(serde_json::json!({
            "success": true
        })),
    ))
}
