//! 订单相关实体定义

use chrono::{DateTime, Utc};

use super::enums::OrderStatus;
use super::money::Money;

/// 订单号最大长度，与 orders.number 列宽一致
pub const MAX_ORDER_NUMBER_LEN: usize = 64;

/// 订单数据库行
///
/// 用户订单列表查询的结果：订单 LEFT JOIN 该订单号的积分入账流水
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderRow {
    pub number: String,
    pub status: OrderStatus,
    /// 积分入账金额（分），尚未入账时为空
    #[sqlx(default)]
    pub accrual: Option<i64>,
    pub uploaded_at: DateTime<Utc>,
}

/// 用户订单
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub number: String,
    pub status: OrderStatus,
    pub accrual: Option<Money>,
    pub uploaded_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            number: row.number,
            status: row.status,
            accrual: row.accrual.map(Money::from_minor),
            uploaded_at: row.uploaded_at,
        }
    }
}

/// 订单归属查询结果，用于区分重复上传的两种冲突
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderOwner {
    pub user_id: i64,
}
