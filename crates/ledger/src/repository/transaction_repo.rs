//! 账本流水仓储
//!
//! 余额从不单独存储，每次读取都从流水聚合得到

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{info, instrument};

use super::traits::TransactionRepositoryTrait;
use crate::error::{LedgerError, Result};
use crate::models::{BalanceRow, Money, UserBalance, Withdrawal, WithdrawalRow};

/// 账本流水仓储
#[derive(Clone)]
pub struct TransactionRepository {
    pool: PgPool,
}

impl TransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 查询用户余额
    ///
    /// current 为所有流水之和，withdrawn 为提现流水绝对值之和
    pub async fn get_user_balance(&self, user_id: i64) -> Result<UserBalance> {
        let row = sqlx::query_as::<_, BalanceRow>(
            r#"
            SELECT
                COALESCE(SUM(amount), 0)::BIGINT AS current,
                COALESCE(-SUM(amount) FILTER (WHERE amount < 0), 0)::BIGINT AS withdrawn
            FROM transactions
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    /// 创建提现
    ///
    /// 先锁定用户行作为该用户账本的串行化点，再在新语句中读取余额，
    /// 保证并发提现与积分入账交错时余额不会为负。
    /// 重复提现先于余额检查判定，跨用户的并发重复由部分唯一索引拦截。
    #[instrument(skip(self), fields(amount = %amount))]
    pub async fn create_withdrawal(
        &self,
        user_id: i64,
        order_number: &str,
        amount: Money,
    ) -> Result<()> {
        if !amount.is_positive() {
            return Err(LedgerError::Validation("提现金额必须为正数".to_string()));
        }

        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| LedgerError::UserNotFound(user_id.to_string()))?;

        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM transactions WHERE order_number = $1 AND amount < 0)",
        )
        .bind(order_number)
        .fetch_one(&mut *tx)
        .await?;
        if exists {
            return Err(LedgerError::WithdrawalAlreadyExists(order_number.to_string()));
        }

        let (balance,): (i64,) = sqlx::query_as(
            "SELECT COALESCE(SUM(amount), 0)::BIGINT FROM transactions WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        let available = Money::from_minor(balance);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                required: amount,
                available,
            });
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO transactions (user_id, order_number, amount, processed_at)
            VALUES ($1, $2, $3, NOW())
            "#,
        )
        .bind(user_id)
        .bind(order_number)
        .bind(-amount.minor())
        .execute(&mut *tx)
        .await;

        if let Err(e) = inserted {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return Err(LedgerError::WithdrawalAlreadyExists(order_number.to_string()));
                }
            }
            return Err(e.into());
        }

        tx.commit().await?;

        info!(user_id, order_number, "提现成功");
        Ok(())
    }

    /// 列出用户提现记录，按处理时间倒序
    pub async fn list_user_withdrawals(&self, user_id: i64) -> Result<Vec<Withdrawal>> {
        let rows = sqlx::query_as::<_, WithdrawalRow>(
            r#"
            SELECT order_number, amount, processed_at
            FROM transactions
            WHERE user_id = $1 AND amount < 0
            ORDER BY processed_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Withdrawal::from).collect())
    }
}

#[async_trait]
impl TransactionRepositoryTrait for TransactionRepository {
    async fn get_user_balance(&self, user_id: i64) -> Result<UserBalance> {
        self.get_user_balance(user_id).await
    }

    async fn create_withdrawal(
        &self,
        user_id: i64,
        order_number: &str,
        amount: Money,
    ) -> Result<()> {
        self.create_withdrawal(user_id, order_number, amount).await
    }

    async fn list_user_withdrawals(&self, user_id: i64) -> Result<Vec<Withdrawal>> {
        self.list_user_withdrawals(user_id).await
    }
}
