use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;

use super::SqliteStore;
use crate::domain::repository::TokenBlacklist;

#[async_trait]
impl TokenBlacklist for SqliteStore {
    async fn insert(&self, jti: &str) -> Result<()> {
        // Blacklisting an already-blacklisted token is a no-op, not an error.
        sqlx::query(
            "INSERT OR IGNORE INTO blacklisted_tokens (jti, blacklisted_at) VALUES (?1, ?2)",
        )
        .bind(jti)
        .bind(Utc::now().to_rfc3339())
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn contains(&self, jti: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM blacklisted_tokens WHERE jti = ?1")
            .bind(jti)
            .fetch_optional(self.pool())
            .await?;
        Ok(row.is_some())
    }
}
