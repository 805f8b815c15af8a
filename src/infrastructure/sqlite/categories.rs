use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::SqliteStore;
use crate::domain::category::{Category, CategoryId, CreateCategory};
use crate::domain::repository::CategoryRepository;

#[async_trait]
impl CategoryRepository for SqliteStore {
    async fn create(&self, input: CreateCategory) -> Result<Category> {
        let result = sqlx::query("INSERT INTO categories (name) VALUES (?1)")
            .bind(&input.name)
            .execute(self.pool())
            .await?;
        Ok(Category { id: CategoryId(result.last_insert_rowid()), name: input.name })
    }

    async fn find_by_id(&self, id: CategoryId) -> Result<Option<Category>> {
        let row = sqlx::query("SELECT id, name FROM categories WHERE id = ?1")
            .bind(id.0)
            .fetch_optional(self.pool())
            .await?;
        Ok(row.map(row_to_category))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Category>> {
        let row = sqlx::query("SELECT id, name FROM categories WHERE name = ?1")
            .bind(name)
            .fetch_optional(self.pool())
            .await?;
        Ok(row.map(row_to_category))
    }

    async fn list(&self) -> Result<Vec<Category>> {
        let rows = sqlx::query("SELECT id, name FROM categories ORDER BY id")
            .fetch_all(self.pool())
            .await?;
        Ok(rows.into_iter().map(row_to_category).collect())
    }

    async fn delete(&self, id: CategoryId) -> Result<bool> {
        // Detach-then-delete in one transaction, so tasks never point at a
        // vanished category.
        let mut tx = self.pool().begin().await?;
        sqlx::query("UPDATE tasks SET category_id = NULL WHERE category_id = ?1")
            .bind(id.0)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM categories WHERE id = ?1")
            .bind(id.0)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}

fn row_to_category(row: SqliteRow) -> Category {
    Category { id: CategoryId(row.get("id")), name: row.get("name") }
}
