//! 积分计算系统接入
//!
//! 外部积分计算系统对每个订单给出计算状态和积分金额。这里只定义一次只读查询，
//! 不做本地重试，也不触碰本地状态；失败的订单由处理超时机制重新领取。

mod client;

pub use client::AccrualClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::AccrualStatus;

/// 积分计算系统对单个订单的响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccrualResponse {
    pub order: String,
    pub status: AccrualStatus,
    /// 积分金额（元），仅 PROCESSED 时存在
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accrual: Option<f64>,
}

/// 积分计算系统调用错误
#[derive(Debug, Error)]
pub enum AccrualError {
    #[error("请求积分计算系统失败: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("订单未在积分计算系统登记: {0}")]
    NotRegistered(String),

    #[error("积分计算系统限流")]
    RateLimited,

    #[error("积分计算系统返回异常状态码: {0}")]
    UnexpectedStatus(u16),

    #[error("积分计算系统响应格式错误: {0}")]
    MalformedBody(String),

    #[error("积分计算系统返回的订单号不匹配: 请求 {requested}, 响应 {returned}")]
    OrderMismatch { requested: String, returned: String },
}

impl AccrualError {
    /// 是否可能在稍后重新查询时恢复
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::RateLimited | Self::NotRegistered(_) => true,
            Self::UnexpectedStatus(status) => *status >= 500,
            Self::MalformedBody(_) | Self::OrderMismatch { .. } => false,
        }
    }
}

/// 积分计算系统接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccrualOracle: Send + Sync {
    /// 查询订单的积分计算结果
    async fn fetch_accrual(&self, order_number: &str) -> Result<AccrualResponse, AccrualError>;
}
