//! 订单仓储
//!
//! 订单的上传、列表查询，以及订单处理 Worker 使用的领取与结算。
//! 领取使用 `FOR UPDATE SKIP LOCKED`，多个 Worker 并发领取时互不阻塞也不会重复领取。

use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, instrument};

use super::traits::OrderRepositoryTrait;
use crate::error::{LedgerError, Result};
use crate::models::{Money, Order, OrderOwner, OrderRow};

/// 订单仓储
#[derive(Clone)]
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 上传订单
    ///
    /// 订单号全局唯一；已存在时按归属区分为本人重复上传或他人已上传
    #[instrument(skip(self))]
    pub async fn create_order(&self, user_id: i64, number: &str) -> Result<()> {
        let inserted: Option<(String,)> = sqlx::query_as(
            r#"
            INSERT INTO orders (number, user_id, status, uploaded_at)
            VALUES ($1, $2, 'NEW', NOW())
            ON CONFLICT (number) DO NOTHING
            RETURNING number
            "#,
        )
        .bind(number)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        if inserted.is_some() {
            return Ok(());
        }

        let owner = sqlx::query_as::<_, OrderOwner>("SELECT user_id FROM orders WHERE number = $1")
            .bind(number)
            .fetch_one(&self.pool)
            .await?;

        if owner.user_id == user_id {
            Err(LedgerError::OrderAlreadyUploaded(number.to_string()))
        } else {
            Err(LedgerError::OrderUploadedByAnotherUser(number.to_string()))
        }
    }

    /// 列出用户订单，按上传时间倒序
    ///
    /// 积分金额来自该订单号的入账流水，尚未入账时为空
    pub async fn list_user_orders(&self, user_id: i64) -> Result<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT o.number, o.status, t.amount AS accrual, o.uploaded_at
            FROM orders o
            LEFT JOIN transactions t
                ON t.order_number = o.number
               AND t.user_id = o.user_id
               AND t.amount >= 0
            WHERE o.user_id = $1
            ORDER BY o.uploaded_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Order::from).collect())
    }

    /// 领取下一个待处理订单
    ///
    /// 在同一事务内选出最早上传的 NEW 订单或处理超时的 PROCESSING 订单，
    /// 标记为 PROCESSING 并刷新 processing_since。没有可领取订单时返回 None。
    #[instrument(skip(self))]
    pub async fn claim_next_order(&self, staleness_timeout: Duration) -> Result<Option<String>> {
        let mut tx = self.pool.begin().await?;

        let candidate: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT number
            FROM orders
            WHERE status = 'NEW'
               OR (status = 'PROCESSING'
                   AND processing_since < NOW() - make_interval(secs => $1))
            ORDER BY uploaded_at
            LIMIT 1
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .bind(staleness_timeout.as_secs_f64())
        .fetch_optional(&mut *tx)
        .await?;

        let Some((number,)) = candidate else {
            return Ok(None);
        };

        sqlx::query(
            r#"
            UPDATE orders
            SET status = 'PROCESSING', processing_since = NOW()
            WHERE number = $1
            "#,
        )
        .bind(&number)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(order_number = %number, "领取订单");
        Ok(Some(number))
    }

    /// 结算订单积分
    ///
    /// 订单 PROCESSING → PROCESSED 与写入入账流水在同一事务内完成。
    /// 订单不处于 PROCESSING 时返回 [`LedgerError::NoOrdersToUpdate`]。
    #[instrument(skip(self), fields(accrual = %accrual))]
    pub async fn apply_settled_accrual(&self, number: &str, accrual: Money) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let owner = sqlx::query_as::<_, OrderOwner>(
            r#"
            UPDATE orders
            SET status = 'PROCESSED'
            WHERE number = $1 AND status = 'PROCESSING'
            RETURNING user_id
            "#,
        )
        .bind(number)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| LedgerError::NoOrdersToUpdate(number.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO transactions (user_id, order_number, amount, processed_at)
            VALUES ($1, $2, $3, NOW())
            "#,
        )
        .bind(owner.user_id)
        .bind(number)
        .bind(accrual.minor())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// 标记订单无效，不写入流水
    #[instrument(skip(self))]
    pub async fn mark_order_invalid(&self, number: &str) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = 'INVALID'
            WHERE number = $1 AND status = 'PROCESSING'
            "#,
        )
        .bind(number)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::NoOrdersToUpdate(number.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl OrderRepositoryTrait for OrderRepository {
    async fn create_order(&self, user_id: i64, number: &str) -> Result<()> {
        self.create_order(user_id, number).await
    }

    async fn list_user_orders(&self, user_id: i64) -> Result<Vec<Order>> {
        self.list_user_orders(user_id).await
    }

    async fn claim_next_order(&self, staleness_timeout: Duration) -> Result<Option<String>> {
        self.claim_next_order(staleness_timeout).await
    }

    async fn apply_settled_accrual(&self, number: &str, accrual: Money) -> Result<()> {
        self.apply_settled_accrual(number, accrual).await
    }

    async fn mark_order_invalid(&self, number: &str) -> Result<()> {
        self.mark_order_invalid(number).await
    }
}
