use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::SqliteStore;
use crate::domain::repository::UserRepository;
use crate::domain::user::{NewUser, User, UserId};

#[async_trait]
impl UserRepository for SqliteStore {
    async fn create(&self, input: NewUser) -> Result<User> {
        let created_at = Utc::now();
        let result = sqlx::query(
            "INSERT INTO users (username, password_hash, created_at) VALUES (?1, ?2, ?3)",
        )
        .bind(&input.username)
        .bind(&input.password_hash)
        .bind(created_at.to_rfc3339())
        .execute(self.pool())
        .await?;
        Ok(User {
            id: UserId(result.last_insert_rowid()),
            username: input.username,
            password_hash: input.password_hash,
            created_at,
        })
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            "SELECT id, username, password_hash, created_at FROM users WHERE username = ?1",
        )
        .bind(username)
        .fetch_optional(self.pool())
        .await?;
        row.map(row_to_user).transpose()
    }
}

fn row_to_user(row: SqliteRow) -> Result<User> {
    let created_at: String = row.get("created_at");
    Ok(User {
        id: UserId(row.get("id")),
        username: row.get("username"),
        password_hash: row.get("password_hash"),
        created_at: DateTime::parse_from_rfc3339(&created_at)?.with_timezone(&Utc),
    })
}
