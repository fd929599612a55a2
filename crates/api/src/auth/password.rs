//! 密码哈希与校验
//!
//! bcrypt 计算量较大，在阻塞线程池中执行，避免占用异步运行时

use bcrypt::{hash, verify};

use crate::error::ApiError;

/// 对密码进行哈希处理，`cost` 为 bcrypt 计算强度
pub async fn hash_password(password: String, cost: u32) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || hash(password, cost))
        .await
        .map_err(|e| ApiError::Internal(format!("密码哈希任务失败: {}", e)))?
        .map_err(|e| ApiError::Internal(format!("密码哈希失败: {}", e)))
}

/// 比较明文密码与存储的哈希值
pub async fn verify_password(password: String, password_hash: String) -> Result<bool, ApiError> {
    tokio::task::spawn_blocking(move || verify(password, &password_hash))
        .await
        .map_err(|e| ApiError::Internal(format!("密码验证任务失败: {}", e)))?
        .map_err(|e| ApiError::Internal(format!("密码验证失败: {}", e)))
}
