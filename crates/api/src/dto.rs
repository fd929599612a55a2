//! 请求和响应的数据传输对象
//!
//! 列表与余额接口直接返回 JSON 数组/对象，金额以元为单位的浮点数表示

use chrono::{DateTime, Utc};
use loyalty_ledger::models::{Money, Order, OrderStatus, UserBalance, Withdrawal};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use validator::Validate;

use crate::error::ApiError;

/// 解析 JSON 请求体，任何格式错误都视为 400
pub fn parse_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(e.to_string()))
}

// ============================================
// 请求
// ============================================

/// 注册 / 登录请求
#[derive(Debug, Deserialize, Validate)]
pub struct CredentialsRequest {
    #[validate(length(min = 1, max = 255, message = "登录名长度必须在 1-255 之间"))]
    pub login: String,
    #[validate(length(min = 1, max = 72, message = "密码长度必须在 1-72 之间"))]
    pub password: String,
}

/// 提现请求
#[derive(Debug, Deserialize, Validate)]
pub struct WithdrawRequest {
    pub order: String,
    #[validate(range(exclusive_min = 0.0, message = "提现金额必须为正数"))]
    pub sum: f64,
}

// ============================================
// 响应
// ============================================

/// 统一消息响应
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            code: "SUCCESS".to_string(),
            message: message.into(),
            data: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderDto {
    pub number: String,
    pub status: OrderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accrual: Option<f64>,
    pub uploaded_at: DateTime<Utc>,
}

impl From<Order> for OrderDto {
    fn from(order: Order) -> Self {
        Self {
            number: order.number,
            status: order.status,
            accrual: Money::nullable_major(order.accrual),
            uploaded_at: order.uploaded_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BalanceDto {
    pub current: f64,
    pub withdrawn: f64,
}

impl From<UserBalance> for BalanceDto {
    fn from(balance: UserBalance) -> Self {
        Self {
            current: balance.current.major(),
            withdrawn: balance.withdrawn.major(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WithdrawalDto {
    pub order: Option<String>,
    pub sum: f64,
    pub processed_at: DateTime<Utc>,
}

impl From<Withdrawal> for WithdrawalDto {
    fn from(withdrawal: Withdrawal) -> Self {
        Self {
            order: withdrawal.order,
            sum: withdrawal.sum.major(),
            processed_at: withdrawal.processed_at,
        }
    }
}
