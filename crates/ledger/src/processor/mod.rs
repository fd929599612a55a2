//! 订单处理流水线
//!
//! - [`engine`]：单次领取与结算
//! - [`pool`]：定时驱动引擎的 Worker 池

pub mod engine;
pub mod pool;

pub use engine::{OrderProcessor, ProcessOutcome};
pub use pool::ProcessorPool;
