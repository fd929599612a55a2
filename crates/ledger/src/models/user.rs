//! 用户实体

use chrono::{DateTime, Utc};

/// 用户凭据
///
/// 只在登录校验时读取，不对外序列化
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserCredentials {
    pub id: i64,
    pub login: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}
