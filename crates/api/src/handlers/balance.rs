//! 余额与提现

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use loyalty_ledger::models::Money;
use tracing::info;
use validator::Validate;

use crate::dto::{ApiResponse, BalanceDto, WithdrawRequest, WithdrawalDto, parse_json};
use crate::error::{ApiError, Result};
use crate::middleware::AuthUser;
use crate::state::AppState;

/// GET /api/user/balance
pub async fn get_balance(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<BalanceDto>> {
    let balance = state.ledger.get_balance(user.user_id).await?;
    Ok(Json(balance.into()))
}

/// 提现
///
/// POST /api/user/balance/withdraw
///
/// - 402：余额不足
/// - 409：该订单号已提现
/// - 422：订单号未通过 Luhn 校验
pub async fn withdraw(
    State(state): State<AppState>,
    user: AuthUser,
    body: Bytes,
) -> Result<Json<ApiResponse<()>>> {
    let req: WithdrawRequest = parse_json(&body)?;
    req.validate()?;

    let amount = Money::try_from_major(req.sum)
        .ok_or_else(|| ApiError::Validation(format!("提现金额超出范围: {}", req.sum)))?;
    state
        .ledger
        .create_withdrawal(user.user_id, &req.order, amount)
        .await?;

    info!(user_id = user.user_id, order = %req.order, amount = %amount, "提现成功");
    Ok(Json(ApiResponse::message("提现成功")))
}

/// 查询提现记录，按处理时间倒序；没有记录时返回 204
///
/// GET /api/user/withdrawals
pub async fn list_withdrawals(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Response> {
    let withdrawals = state.ledger.list_withdrawals(user.user_id).await?;
    if withdrawals.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let dtos: Vec<WithdrawalDto> = withdrawals.into_iter().map(WithdrawalDto::from).collect();
    Ok(Json(dtos).into_response())
}
