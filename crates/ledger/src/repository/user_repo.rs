//! 用户仓储

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use super::traits::UserRepositoryTrait;
use crate::error::{LedgerError, Result};
use crate::models::UserCredentials;

#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 创建用户，登录名重复时返回 [`LedgerError::UserAlreadyExists`]
    #[instrument(skip(self, password_hash))]
    pub async fn create_user(&self, login: &str, password_hash: &str) -> Result<i64> {
        let result: std::result::Result<(i64,), sqlx::Error> = sqlx::query_as(
            r#"
            INSERT INTO users (login, password_hash, created_at)
            VALUES ($1, $2, NOW())
            RETURNING id
            "#,
        )
        .bind(login)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok((id,)) => Ok(id),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(LedgerError::UserAlreadyExists(login.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get_user_by_login(&self, login: &str) -> Result<Option<UserCredentials>> {
        let user = sqlx::query_as::<_, UserCredentials>(
            "SELECT id, login, password_hash, created_at FROM users WHERE login = $1",
        )
        .bind(login)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}

#[async_trait]
impl UserRepositoryTrait for UserRepository {
    async fn create_user(&self, login: &str, password_hash: &str) -> Result<i64> {
        self.create_user(login, password_hash).await
    }

    async fn get_user_by_login(&self, login: &str) -> Result<Option<UserCredentials>> {
        self.get_user_by_login(login).await
    }
}
