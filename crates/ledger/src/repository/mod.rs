//! 数据库仓储层
//!
//! 封装订单、账本流水和用户的 SQL 操作。
//!
//! ## 设计原则
//!
//! - 仓储只负责数据持久化，业务校验（Luhn、金额）在服务层完成
//! - 每个对外操作都在单个事务内完成，要么全部生效要么全部不生效
//! - 定义 trait 接口以支持 mock 测试

mod order_repo;
mod traits;
mod transaction_repo;
mod user_repo;

pub use order_repo::OrderRepository;
pub use traits::*;
pub use transaction_repo::TransactionRepository;
pub use user_repo::UserRepository;

/// 内嵌的数据库迁移
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
