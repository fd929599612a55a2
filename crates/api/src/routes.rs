//! 路由配置模块
//!
//! 定义所有 REST API 端点的路由映射

use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::{handlers, middleware::auth_middleware, state::AppState};

/// 构建用户认证路由（公开路由，无需认证）
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/user/register", post(handlers::user::register))
        .route("/user/login", post(handlers::user::login))
}

/// 构建需要登录的账本路由
fn ledger_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/user/orders",
            post(handlers::order::upload_order).get(handlers::order::list_orders),
        )
        .route("/user/balance", get(handlers::balance::get_balance))
        .route("/user/balance/withdraw", post(handlers::balance::withdraw))
        .route("/user/withdrawals", get(handlers::balance::list_withdrawals))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// 构建 /api 下的全部路由
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(auth_routes())
        .merge(ledger_routes(state))
}

/// 构建完整应用路由（不含外层可观测性与 CORS 中间件）
pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/api", api_routes(state.clone()))
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .with_state(state)
}
