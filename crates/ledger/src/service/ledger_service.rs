//! 账本服务

use std::sync::Arc;

use loyalty_shared::observability::metrics;
use tracing::{info, instrument, warn};

use crate::error::{LedgerError, Result};
use crate::luhn;
use crate::models::{
    MAX_AMOUNT_MINOR, MAX_ORDER_NUMBER_LEN, Money, Order, UserBalance, UserCredentials, Withdrawal,
};
use crate::repository::{OrderRepositoryTrait, TransactionRepositoryTrait, UserRepositoryTrait};

/// 账本服务
///
/// 组合订单、流水和用户仓储，负责业务校验（Luhn、金额、登录名）
pub struct LedgerService<OR, TR, UR>
where
    OR: OrderRepositoryTrait,
    TR: TransactionRepositoryTrait,
    UR: UserRepositoryTrait,
{
    order_repo: Arc<OR>,
    transaction_repo: Arc<TR>,
    user_repo: Arc<UR>,
}

impl<OR, TR, UR> LedgerService<OR, TR, UR>
where
    OR: OrderRepositoryTrait,
    TR: TransactionRepositoryTrait,
    UR: UserRepositoryTrait,
{
    pub fn new(order_repo: Arc<OR>, transaction_repo: Arc<TR>, user_repo: Arc<UR>) -> Self {
        Self {
            order_repo,
            transaction_repo,
            user_repo,
        }
    }

    // ==================== 用户 ====================

    /// 注册用户，密码哈希由调用方计算
    #[instrument(skip(self, password_hash))]
    pub async fn register_user(&self, login: &str, password_hash: &str) -> Result<i64> {
        let login = login.trim();
        if login.is_empty() {
            return Err(LedgerError::Validation("登录名不能为空".to_string()));
        }

        let user_id = self.user_repo.create_user(login, password_hash).await?;
        info!(user_id, "用户注册成功");
        Ok(user_id)
    }

    /// 按登录名查询用户凭据
    pub async fn find_user(&self, login: &str) -> Result<UserCredentials> {
        self.user_repo
            .get_user_by_login(login.trim())
            .await?
            .ok_or_else(|| LedgerError::UserNotFound(login.to_string()))
    }

    // ==================== 订单 ====================

    /// 上传订单
    #[instrument(skip(self))]
    pub async fn create_order(&self, user_id: i64, number: &str) -> Result<()> {
        let number = number.trim();
        if !is_acceptable_number(number) {
            metrics::record_order_upload("invalid_number");
            return Err(LedgerError::InvalidOrderNumber(number.to_string()));
        }

        let result = self.order_repo.create_order(user_id, number).await;
        metrics::record_order_upload(match &result {
            Ok(()) => "accepted",
            Err(LedgerError::OrderAlreadyUploaded(_)) => "duplicate",
            Err(LedgerError::OrderUploadedByAnotherUser(_)) => "conflict",
            Err(_) => "error",
        });
        result?;

        info!(user_id, order_number = number, "订单已上传");
        Ok(())
    }

    /// 列出用户订单，按上传时间倒序；没有订单时返回空列表
    pub async fn list_orders(&self, user_id: i64) -> Result<Vec<Order>> {
        self.order_repo.list_user_orders(user_id).await
    }

    // ==================== 余额与提现 ====================

    pub async fn get_balance(&self, user_id: i64) -> Result<UserBalance> {
        self.transaction_repo.get_user_balance(user_id).await
    }

    /// 提现
    #[instrument(skip(self), fields(amount = %amount))]
    pub async fn create_withdrawal(
        &self,
        user_id: i64,
        order_number: &str,
        amount: Money,
    ) -> Result<()> {
        let order_number = order_number.trim();
        if !is_acceptable_number(order_number) {
            metrics::record_withdrawal("invalid_number");
            return Err(LedgerError::InvalidOrderNumber(order_number.to_string()));
        }
        if !amount.is_positive() || amount.minor() > MAX_AMOUNT_MINOR {
            metrics::record_withdrawal("invalid_amount");
            return Err(LedgerError::Validation(format!("提现金额超出范围: {}", amount)));
        }

        let result = self
            .transaction_repo
            .create_withdrawal(user_id, order_number, amount)
            .await;

        match &result {
            Ok(()) => metrics::record_withdrawal("success"),
            Err(LedgerError::InsufficientBalance {
                required,
                available,
            }) => {
                warn!(user_id, %required, %available, "余额不足");
                metrics::record_withdrawal("insufficient_balance");
            }
            Err(LedgerError::WithdrawalAlreadyExists(_)) => metrics::record_withdrawal("duplicate"),
            Err(_) => metrics::record_withdrawal("error"),
        }
        result
    }

    /// 列出用户提现记录，按处理时间倒序；没有记录时返回空列表
    pub async fn list_withdrawals(&self, user_id: i64) -> Result<Vec<Withdrawal>> {
        self.transaction_repo.list_user_withdrawals(user_id).await
    }
}

/// 订单号必须能存入数据库列且通过 Luhn 校验
fn is_acceptable_number(number: &str) -> bool {
    number.len() <= MAX_ORDER_NUMBER_LEN && luhn::is_valid(number)
}
