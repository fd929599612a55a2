//! 积分账本核心
//!
//! 用户上传购物订单号，外部积分计算系统异步给出每个订单的返积分，
//! 用户可将累计积分提现。本 crate 包含：
//!
//! - [`models`]：订单、流水、余额与金额值类型
//! - [`repository`]：PostgreSQL 仓储与内嵌迁移
//! - [`accrual`]：积分计算系统客户端
//! - [`processor`]：订单领取、结算引擎与 Worker 池
//! - [`service`]：面向用户的账本操作
//!
//! 余额始终由只追加的流水表聚合得出；并发提现与入账交错时余额不会为负。

pub mod accrual;
pub mod error;
pub mod luhn;
pub mod models;
pub mod processor;
pub mod repository;
pub mod service;

pub use error::{LedgerError, Result};
