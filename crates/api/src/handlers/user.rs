//! 用户注册与登录
//!
//! 成功时在 `Authorization` 响应头中返回 Bearer Token

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderValue, header::AUTHORIZATION},
    response::{IntoResponse, Response},
};
use tracing::info;
use validator::Validate;

use crate::auth::{hash_password, verify_password};
use crate::dto::{ApiResponse, CredentialsRequest, parse_json};
use crate::error::{ApiError, Result};
use crate::state::AppState;

/// 注册
///
/// POST /api/user/register
pub async fn register(State(state): State<AppState>, body: Bytes) -> Result<Response> {
    let req: CredentialsRequest = parse_json(&body)?;
    req.validate()?;

    let password_hash = hash_password(req.password, state.bcrypt_cost).await?;
    let user_id = state.ledger.register_user(&req.login, &password_hash).await?;
    let token = state.jwt_manager.generate_token(user_id, req.login.trim())?;

    info!(user_id, login = %req.login, "用户注册成功");
    with_token(token, ApiResponse::message("注册成功"))
}

/// 登录
///
/// POST /api/user/login
pub async fn login(State(state): State<AppState>, body: Bytes) -> Result<Response> {
    let req: CredentialsRequest = parse_json(&body)?;
    req.validate()?;

    let user = state.ledger.find_user(&req.login).await?;
    if !verify_password(req.password, user.password_hash.clone()).await? {
        return Err(ApiError::InvalidCredentials);
    }

    let token = state.jwt_manager.generate_token(user.id, &user.login)?;

    info!(user_id = user.id, login = %user.login, "用户登录成功");
    with_token(token, ApiResponse::message("登录成功"))
}

fn with_token(token: String, body: ApiResponse<()>) -> Result<Response> {
    let value = HeaderValue::from_str(&format!("Bearer {}", token))
        .map_err(|e| ApiError::Internal(format!("Token 响应头无效: {}", e)))?;

    let mut response = Json(body).into_response();
    response.headers_mut().insert(AUTHORIZATION, value);
    Ok(response)
}
