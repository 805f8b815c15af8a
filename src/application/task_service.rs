use async_trait::async_trait;
use chrono::Utc;

use crate::domain::category::{Category, CategoryId};
use crate::domain::filter::TaskFilter;
use crate::domain::repository::{CategoryRepository, TaskRepository};
use crate::domain::task::{CreateTask, NewTask, Task, TaskId, TaskPage, TaskPatch, UpdateTask};
use crate::domain::user::UserId;
use crate::error::{AppError, FieldErrors};

#[async_trait]
pub trait TaskService: Send + Sync + 'static {
    async fn create(&self, owner: UserId, input: CreateTask) -> Result<Task, AppError>;
    async fn get(&self, owner: UserId, id: TaskId) -> Result<Task, AppError>;
    async fn list(&self, owner: UserId, filter: &TaskFilter) -> Result<Vec<Task>, AppError>;
    async fn page(
        &self,
        owner: UserId,
        filter: &TaskFilter,
        limit: i64,
        offset: i64,
    ) -> Result<TaskPage, AppError>;
    async fn update(&self, owner: UserId, id: TaskId, input: UpdateTask) -> Result<Task, AppError>;
    async fn delete(&self, owner: UserId, id: TaskId) -> Result<(), AppError>;
    async fn toggle_complete(&self, owner: UserId, id: TaskId) -> Result<Task, AppError>;
}

#[derive(Clone)]
pub struct TaskServiceImpl<T: TaskRepository, C: CategoryRepository> {
    tasks: T,
    categories: C,
}

impl<T: TaskRepository, C: CategoryRepository> TaskServiceImpl<T, C> {
    pub fn new(tasks: T, categories: C) -> Self { Self { tasks, categories } }

    async fn resolve_category(&self, id: CategoryId) -> Result<Category, AppError> {
        self.categories.find_by_id(id).await?.ok_or_else(|| {
            AppError::Validation(FieldErrors::single(
                "category",
                format!("Invalid pk \"{id}\" - object does not exist."),
            ))
        })
    }
}

#[async_trait]
impl<T: TaskRepository, C: CategoryRepository> TaskService for TaskServiceImpl<T, C> {
    async fn create(&self, owner: UserId, input: CreateTask) -> Result<Task, AppError> {
        let category = match input.category {
            Some(id) => Some(self.resolve_category(id).await?),
            None => None,
        };
        let record = NewTask {
            title: input.title,
            description: input.description,
            due_date: input.due_date,
            priority: input.priority.unwrap_or_default(),
            category,
        };
        tracing::info!(user_id = %owner, title = %record.title, "task created");
        Ok(self.tasks.create(owner, record).await?)
    }

    async fn get(&self, owner: UserId, id: TaskId) -> Result<Task, AppError> {
        self.tasks.get(owner, id).await?.ok_or(AppError::NotFound)
    }

    async fn list(&self, owner: UserId, filter: &TaskFilter) -> Result<Vec<Task>, AppError> {
        let items = self.tasks.list(owner, &filter.predicates()).await?;
        tracing::info!(user_id = %owner, count = items.len(), "tasks fetched");
        Ok(items)
    }

    async fn page(
        &self,
        owner: UserId,
        filter: &TaskFilter,
        limit: i64,
        offset: i64,
    ) -> Result<TaskPage, AppError> {
        let page = self.tasks.page(owner, &filter.predicates(), limit, offset).await?;
        tracing::info!(user_id = %owner, count = page.count, "tasks fetched");
        Ok(page)
    }

    async fn update(&self, owner: UserId, id: TaskId, input: UpdateTask) -> Result<Task, AppError> {
        let category = match input.category {
            Some(Some(category_id)) => Some(Some(self.resolve_category(category_id).await?)),
            Some(None) => Some(None),
            None => None,
        };
        let patch = TaskPatch {
            title: input.title,
            description: input.description,
            due_date: input.due_date,
            priority: input.priority,
            category,
        };
        tracing::info!(task_id = %id, user_id = %owner, "task updated");
        self.tasks.update(owner, id, patch).await?.ok_or(AppError::NotFound)
    }

    async fn delete(&self, owner: UserId, id: TaskId) -> Result<(), AppError> {
        let task = self.tasks.get(owner, id).await?.ok_or(AppError::NotFound)?;
        tracing::warn!(task_id = %task.id, user_id = %owner, title = %task.title, "task deleted");
        self.tasks.delete(owner, id).await?;
        Ok(())
    }

    async fn toggle_complete(&self, owner: UserId, id: TaskId) -> Result<Task, AppError> {
        let task = self.tasks.get(owner, id).await?.ok_or(AppError::NotFound)?;
        let completed = !task.completed;
        // completed_at tracks the flag: stamped on completion, cleared on reopen.
        let completed_at = completed.then(Utc::now);
        tracing::info!(task_id = %id, user_id = %owner, from = task.completed, to = completed, "toggle complete");
        if !self.tasks.set_completion(owner, id, completed, completed_at).await? {
            return Err(AppError::NotFound);
        }
        Ok(Task { completed, completed_at, ..task })
    }
}
