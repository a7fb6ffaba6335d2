use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::{
    AppState,
    middleware::{RateLimiter, log_errors, rate_limit, teacher_auth},
    routes,
};

/// 创建主路由
///
/// 传入限流器时对所有请求按 IP 限流。
pub fn create_router(state: AppState, rate_limiter: Option<Arc<RateLimiter>>) -> Router {
    // 学生端和教师端共用的公开路由
    let public_routes = Router::new()
        .route(
            "/groups",
            get(routes::group::list_groups).post(routes::group::create_group),
        )
        .route("/groups/{group_id}", get(routes::group::get_group))
        .route("/groups/{group_id}/progress", get(routes::group::get_progress))
        .route("/groups/{group_id}/day", put(routes::group::save_day))
        .route("/teacher/login", post(routes::teacher::login));

    // 需要教师令牌的路由
    let teacher_routes = Router::new()
        .route("/groups/{group_id}", delete(routes::group::delete_group))
        .route("/groups/{group_id}/grading", put(routes::group::save_grading))
        .route("/teacher/check", get(routes::teacher::check_token))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            teacher_auth,
        ));

    let api_routes = Router::new().merge(public_routes).merge(teacher_routes);

    // 根路径不能 nest，直接合并
    let router = if state.config.api_base_uri == "/" {
        Router::new().merge(api_routes)
    } else {
        Router::new().nest(&state.config.api_base_uri, api_routes)
    };

    let router = router
        .route("/", get(routes::health::root))
        .layer(axum::middleware::from_fn(log_errors));

    let router = match rate_limiter {
        Some(limiter) => router.layer(axum::middleware::from_fn_with_state(limiter, rate_limit)),
        None => router,
    };

    router.with_state(state)
}
