//! 账本服务层
//!
//! 面向用户的账本操作：上传订单、查询订单、余额、提现。
//! 用户 ID 由调用方显式传入，服务层不依赖任何请求上下文。

mod ledger_service;

pub use ledger_service::LedgerService;
