//! 订单上传与查询

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use loyalty_ledger::LedgerError;

use crate::dto::{ApiResponse, OrderDto};
use crate::error::{ApiError, Result};
use crate::middleware::AuthUser;
use crate::state::AppState;

/// 上传订单号（text/plain 请求体）
///
/// POST /api/user/orders
///
/// - 202：新订单已接受
/// - 200：当前用户已上传过该订单
/// - 409：订单已被其他用户上传
/// - 422：订单号未通过 Luhn 校验
pub async fn upload_order(
    State(state): State<AppState>,
    user: AuthUser,
    body: Bytes,
) -> Result<Response> {
    let number = std::str::from_utf8(&body)
        .map_err(|_| ApiError::BadRequest("请求体必须为 UTF-8 文本".to_string()))?
        .trim();
    if number.is_empty() {
        return Err(ApiError::BadRequest("订单号不能为空".to_string()));
    }

    match state.ledger.create_order(user.user_id, number).await {
        Ok(()) => Ok((
            StatusCode::ACCEPTED,
            Json(ApiResponse::message("订单已接受处理")),
        )
            .into_response()),
        Err(LedgerError::OrderAlreadyUploaded(_)) => Ok((
            StatusCode::OK,
            Json(ApiResponse::message("订单已上传")),
        )
            .into_response()),
        Err(e) => Err(e.into()),
    }
}

/// 查询当前用户的订单，按上传时间倒序；没有订单时返回 204
///
/// GET /api/user/orders
pub async fn list_orders(State(state): State<AppState>, user: AuthUser) -> Result<Response> {
    let orders = state.ledger.list_orders(user.user_id).await?;
    if orders.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let dtos: Vec<OrderDto> = orders.into_iter().map(OrderDto::from).collect();
    Ok(Json(dtos).into_response())
}
