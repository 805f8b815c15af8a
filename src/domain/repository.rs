use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::category::{Category, CategoryId, CreateCategory};
use super::filter::Predicate;
use super::task::{NewTask, Task, TaskId, TaskPage, TaskPatch};
use super::user::{NewUser, User, UserId};

#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    async fn create(&self, input: NewUser) -> anyhow::Result<User>;
    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>>;
}

#[async_trait]
pub trait CategoryRepository: Send + Sync + 'static {
    async fn create(&self, input: CreateCategory) -> anyhow::Result<Category>;
    async fn find_by_id(&self, id: CategoryId) -> anyhow::Result<Option<Category>>;
    async fn find_by_name(&self, name: &str) -> anyhow::Result<Option<Category>>;
    async fn list(&self) -> anyhow::Result<Vec<Category>>;
    /// Detaches referencing tasks, then deletes. Returns false when the
    /// category does not exist.
    async fn delete(&self, id: CategoryId) -> anyhow::Result<bool>;
}

/// All task access is scoped to an owner; there is no way to reach another
/// user's rows through this trait.
#[async_trait]
pub trait TaskRepository: Send + Sync + 'static {
    async fn create(&self, owner: UserId, input: NewTask) -> anyhow::Result<Task>;
    async fn get(&self, owner: UserId, id: TaskId) -> anyhow::Result<Option<Task>>;
    async fn list(&self, owner: UserId, predicates: &[Predicate]) -> anyhow::Result<Vec<Task>>;
    async fn page(
        &self,
        owner: UserId,
        predicates: &[Predicate],
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<TaskPage>;
    async fn update(
        &self,
        owner: UserId,
        id: TaskId,
        patch: TaskPatch,
    ) -> anyhow::Result<Option<Task>>;
    /// Persists only the completion pair, leaving every other column alone.
    async fn set_completion(
        &self,
        owner: UserId,
        id: TaskId,
        completed: bool,
        completed_at: Option<DateTime<Utc>>,
    ) -> anyhow::Result<bool>;
    async fn delete(&self, owner: UserId, id: TaskId) -> anyhow::Result<bool>;
}

#[async_trait]
pub trait TokenBlacklist: Send + Sync + 'static {
    async fn insert(&self, jti: &str) -> anyhow::Result<()>;
    async fn contains(&self, jti: &str) -> anyhow::Result<bool>;
}
