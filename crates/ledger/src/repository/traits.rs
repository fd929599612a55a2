//! 仓储 Trait 定义
//!
//! 订单处理引擎和账本服务依赖这些抽象而非具体实现，便于 mock 测试

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Money, Order, UserBalance, UserCredentials, Withdrawal};

/// 订单仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderRepositoryTrait: Send + Sync {
    // 用户侧
    async fn create_order(&self, user_id: i64, number: &str) -> Result<()>;
    async fn list_user_orders(&self, user_id: i64) -> Result<Vec<Order>>;

    // 订单处理
    /// 领取一个待处理订单，无可领取订单时返回 None
    async fn claim_next_order(&self, staleness_timeout: Duration) -> Result<Option<String>>;
    async fn apply_settled_accrual(&self, number: &str, accrual: Money) -> Result<()>;
    async fn mark_order_invalid(&self, number: &str) -> Result<()>;
}

/// 账本流水仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TransactionRepositoryTrait: Send + Sync {
    async fn get_user_balance(&self, user_id: i64) -> Result<UserBalance>;
    async fn create_withdrawal(&self, user_id: i64, order_number: &str, amount: Money)
    -> Result<()>;
    async fn list_user_withdrawals(&self, user_id: i64) -> Result<Vec<Withdrawal>>;
}

/// 用户仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepositoryTrait: Send + Sync {
    /// 创建用户，返回新用户 ID
    async fn create_user(&self, login: &str, password_hash: &str) -> Result<i64>;
    async fn get_user_by_login(&self, login: &str) -> Result<Option<UserCredentials>>;
}
