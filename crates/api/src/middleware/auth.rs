//! JWT 认证中间件
//!
//! 验证请求中的 Bearer Token，并将当前用户注入请求扩展

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::ApiError;
use crate::state::AppState;

/// 已认证的当前用户
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub login: String,
}

/// 认证中间件
///
/// 只挂载在需要登录的路由上
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    let Some(token) = token else {
        return ApiError::Unauthorized("缺少认证 Token".to_string()).into_response();
    };

    let user = state
        .jwt_manager
        .verify_token(token)
        .and_then(|claims| {
            Ok(AuthUser {
                user_id: claims.user_id()?,
                login: claims.login,
            })
        });

    match user {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| ApiError::Unauthorized("未登录".to_string()))
    }
}
