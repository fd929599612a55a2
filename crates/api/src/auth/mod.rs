//! 认证模块
//!
//! JWT 签发与校验、bcrypt 密码哈希

mod jwt;
mod password;

pub use jwt::{Claims, JwtManager};
pub use password::{hash_password, verify_password};
