use async_trait::async_trait;

use crate::domain::category::{Category, CategoryId, CreateCategory};
use crate::domain::repository::CategoryRepository;
use crate::error::{AppError, FieldErrors};

#[async_trait]
pub trait CategoryService: Send + Sync + 'static {
    async fn create(&self, input: CreateCategory) -> Result<Category, AppError>;
    async fn list_all(&self) -> Result<Vec<Category>, AppError>;
    async fn delete(&self, id: CategoryId) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct CategoryServiceImpl<R: CategoryRepository> {
    repo: R,
}

impl<R: CategoryRepository> CategoryServiceImpl<R> {
    pub fn new(repo: R) -> Self { Self { repo } }
}

#[async_trait]
impl<R: CategoryRepository> CategoryService for CategoryServiceImpl<R> {
    async fn create(&self, input: CreateCategory) -> Result<Category, AppError> {
        if self.repo.find_by_name(&input.name).await?.is_some() {
            return Err(AppError::Validation(FieldErrors::single(
                "name",
                "task category with this name already exists.",
            )));
        }
        tracing::info!(name = %input.name, "category created");
        Ok(self.repo.create(input).await?)
    }

    async fn list_all(&self) -> Result<Vec<Category>, AppError> {
        Ok(self.repo.list().await?)
    }

    async fn delete(&self, id: CategoryId) -> Result<(), AppError> {
        let category = self.repo.find_by_id(id).await?.ok_or(AppError::NotFound)?;
        tracing::warn!(category_id = %category.id, name = %category.name, "category deleted, tasks detached");
        self.repo.delete(id).await?;
        Ok(())
    }
}
