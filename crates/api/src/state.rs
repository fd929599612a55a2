//! 应用状态定义

use std::sync::Arc;

use loyalty_ledger::repository::{OrderRepository, TransactionRepository, UserRepository};
use loyalty_ledger::service::LedgerService;
use loyalty_shared::config::AuthConfig;
use loyalty_shared::database::Database;

use crate::auth::JwtManager;

/// 基于 PostgreSQL 仓储的账本服务
pub type Ledger = LedgerService<OrderRepository, TransactionRepository, UserRepository>;

/// Axum 应用共享状态
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub ledger: Arc<Ledger>,
    pub jwt_manager: JwtManager,
    pub bcrypt_cost: u32,
}

impl AppState {
    pub fn new(db: Database, auth: &AuthConfig) -> Self {
        let pool = db.pool().clone();
        let ledger = LedgerService::new(
            Arc::new(OrderRepository::new(pool.clone())),
            Arc::new(TransactionRepository::new(pool.clone())),
            Arc::new(UserRepository::new(pool)),
        );

        Self {
            db,
            ledger: Arc::new(ledger),
            jwt_manager: JwtManager::new(auth),
            bcrypt_cost: auth.bcrypt_cost,
        }
    }
}
