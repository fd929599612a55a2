//! 账本错误类型
//!
//! 区分冲突、业务规则和系统错误三类，供 API 层映射状态码，Worker 记录日志时标注错误码与可重试性

use thiserror::Error;

use crate::models::Money;

/// 账本服务错误类型
#[derive(Debug, Error)]
pub enum LedgerError {
    // === 冲突 ===
    #[error("订单已由当前用户上传: {0}")]
    OrderAlreadyUploaded(String),

    #[error("订单已由其他用户上传: {0}")]
    OrderUploadedByAnotherUser(String),

    #[error("该订单号已存在提现: {0}")]
    WithdrawalAlreadyExists(String),

    #[error("用户已存在: {0}")]
    UserAlreadyExists(String),

    // === 业务规则 ===
    #[error("用户不存在: {0}")]
    UserNotFound(String),

    #[error("登录名或密码错误")]
    InvalidCredentials,

    #[error("余额不足: 需要 {required}, 可用 {available}")]
    InsufficientBalance { required: Money, available: Money },

    #[error("订单号格式错误: {0}")]
    InvalidOrderNumber(String),

    #[error("没有可更新的订单: {0}")]
    NoOrdersToUpdate(String),

    #[error("参数校验失败: {0}")]
    Validation(String),

    // === 系统错误 ===
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),
}

/// 账本服务 Result 类型别名
pub type Result<T> = std::result::Result<T, LedgerError>;

impl LedgerError {
    /// 检查是否为可重试的错误
    ///
    /// 订单处理中遇到这类错误时保持 PROCESSING，超时后由其他 Worker 重新领取
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database(_))
    }

    /// 获取错误码（用于日志）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::OrderAlreadyUploaded(_) => "ORDER_ALREADY_UPLOADED",
            Self::OrderUploadedByAnotherUser(_) => "ORDER_UPLOADED_BY_ANOTHER_USER",
            Self::WithdrawalAlreadyExists(_) => "WITHDRAWAL_ALREADY_EXISTS",
            Self::UserAlreadyExists(_) => "USER_ALREADY_EXISTS",
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            Self::InvalidOrderNumber(_) => "INVALID_ORDER_NUMBER",
            Self::NoOrdersToUpdate(_) => "NO_ORDERS_TO_UPDATE",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }
}
