//! HTTP 请求处理器

pub mod balance;
pub mod health;
pub mod order;
pub mod user;
