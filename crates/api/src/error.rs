//! API 错误类型定义
//!
//! 把账本错误映射为 HTTP 状态码和统一的 JSON 错误响应

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use loyalty_ledger::LedgerError;
use serde_json::json;

/// API 错误类型
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    // 认证错误
    #[error("未授权: {0}")]
    Unauthorized(String),
    #[error("登录名或密码错误")]
    InvalidCredentials,

    // 请求错误
    #[error("请求格式错误: {0}")]
    BadRequest(String),
    #[error("参数验证失败: {0}")]
    Validation(String),
    #[error("订单号格式错误: {0}")]
    InvalidOrderNumber(String),

    // 冲突
    #[error("用户已存在: {0}")]
    UserAlreadyExists(String),
    #[error("订单已由其他用户上传: {0}")]
    OrderUploadedByAnotherUser(String),
    #[error("该订单号已存在提现: {0}")]
    WithdrawalAlreadyExists(String),

    // 业务错误
    #[error("余额不足")]
    InsufficientBalance,

    // 系统错误
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),
    #[error("内部错误: {0}")]
    Internal(String),
}

impl ApiError {
    /// 返回对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::InvalidOrderNumber(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::UserAlreadyExists(_)
            | Self::OrderUploadedByAnotherUser(_)
            | Self::WithdrawalAlreadyExists(_) => StatusCode::CONFLICT,
            Self::InsufficientBalance => StatusCode::PAYMENT_REQUIRED,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 返回错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::InvalidOrderNumber(_) => "INVALID_ORDER_NUMBER",
            Self::UserAlreadyExists(_) => "USER_ALREADY_EXISTS",
            Self::OrderUploadedByAnotherUser(_) => "ORDER_UPLOADED_BY_ANOTHER_USER",
            Self::WithdrawalAlreadyExists(_) => "WITHDRAWAL_ALREADY_EXISTS",
            Self::InsufficientBalance => "INSUFFICIENT_BALANCE",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 系统级错误只返回通用提示，详细信息仅记录日志
        let message = match &self {
            Self::Database(e) => {
                tracing::error!(error = %e, "数据库操作失败");
                "服务内部错误，请稍后重试".to_string()
            }
            Self::Internal(e) => {
                tracing::error!(error = %e, "内部错误");
                "服务内部错误，请稍后重试".to_string()
            }
            other => other.to_string(),
        };

        let body = json!({
            "success": false,
            "code": self.error_code(),
            "message": message,
            "data": serde_json::Value::Null
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::UserAlreadyExists(login) => Self::UserAlreadyExists(login),
            LedgerError::UserNotFound(_) | LedgerError::InvalidCredentials => {
                Self::InvalidCredentials
            }
            LedgerError::OrderUploadedByAnotherUser(n) => Self::OrderUploadedByAnotherUser(n),
            LedgerError::WithdrawalAlreadyExists(n) => Self::WithdrawalAlreadyExists(n),
            LedgerError::InsufficientBalance { .. } => Self::InsufficientBalance,
            LedgerError::InvalidOrderNumber(n) => Self::InvalidOrderNumber(n),
            LedgerError::Validation(msg) => Self::Validation(msg),
            LedgerError::Database(e) => Self::Database(e),
            other => Self::Internal(other.to_string()),
        }
    }
}

/// API Result 类型别名
pub type Result<T> = std::result::Result<T, ApiError>;
