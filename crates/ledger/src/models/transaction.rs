//! 账本流水相关实体定义
//!
//! 流水只追加不修改：正数为积分入账，负数为提现。余额在读取时由 SUM 推导。

use chrono::{DateTime, Utc};

use super::money::Money;

/// 提现流水数据库行
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WithdrawalRow {
    #[sqlx(default)]
    pub order_number: Option<String>,
    /// 流水金额（分），提现为负数
    pub amount: i64,
    pub processed_at: DateTime<Utc>,
}

/// 用户提现记录
///
/// `sum` 以正数展示
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Withdrawal {
    pub order: Option<String>,
    pub sum: Money,
    pub processed_at: DateTime<Utc>,
}

impl From<WithdrawalRow> for Withdrawal {
    fn from(row: WithdrawalRow) -> Self {
        Self {
            order: row.order_number,
            sum: Money::from_minor(row.amount).abs(),
            processed_at: row.processed_at,
        }
    }
}

/// 余额聚合查询结果
#[derive(Debug, Clone, Copy, Default, sqlx::FromRow)]
pub struct BalanceRow {
    pub current: i64,
    pub withdrawn: i64,
}

/// 用户余额（读取时推导）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserBalance {
    /// 所有流水之和
    pub current: Money,
    /// 提现流水绝对值之和
    pub withdrawn: Money,
}

impl From<BalanceRow> for UserBalance {
    fn from(row: BalanceRow) -> Self {
        Self {
            current: Money::from_minor(row.current),
            withdrawn: Money::from_minor(row.withdrawn),
        }
    }
}
