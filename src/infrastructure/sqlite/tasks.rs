use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::SqliteStore;
use crate::domain::category::{Category, CategoryId};
use crate::domain::filter::Predicate;
use crate::domain::repository::TaskRepository;
use crate::domain::task::{NewTask, Priority, Task, TaskId, TaskPage, TaskPatch};
use crate::domain::user::UserId;

const SELECT_TASK: &str = "SELECT t.id, t.title, t.description, t.completed, t.created_at, \
     t.completed_at, t.due_date, t.priority, t.user_id, t.category_id, c.name AS category_name \
     FROM tasks t LEFT JOIN categories c ON c.id = t.category_id";

const COUNT_TASKS: &str =
    "SELECT COUNT(*) AS count FROM tasks t LEFT JOIN categories c ON c.id = t.category_id";

const ORDER: &str = " ORDER BY t.created_at DESC, t.id DESC";

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone)]
enum SqlArg {
    Int(i64),
    Text(String),
}

/// Renders one clause as SQL, pushing its bind values. Must agree with
/// `Predicate::matches`; the clause list arrives in the fixed order
/// `TaskFilter::predicates` produces and is applied conjunctively.
fn predicate_sql(predicate: &Predicate, args: &mut Vec<SqlArg>) -> &'static str {
    match predicate {
        Predicate::TitleContains(needle) => {
            args.push(SqlArg::Text(needle.to_lowercase()));
            "instr(lower(t.title), ?) > 0"
        }
        Predicate::CompletedEq(completed) => {
            args.push(SqlArg::Int(*completed as i64));
            "t.completed = ?"
        }
        Predicate::CreatedOn(date) => {
            args.push(SqlArg::Text(date.format(DATE_FORMAT).to_string()));
            "substr(t.created_at, 1, 10) = ?"
        }
        Predicate::CompletedOn(date) => {
            args.push(SqlArg::Text(date.format(DATE_FORMAT).to_string()));
            "substr(t.completed_at, 1, 10) = ?"
        }
        Predicate::DueOn(date) => {
            args.push(SqlArg::Text(date.format(DATE_FORMAT).to_string()));
            "t.due_date = ?"
        }
        Predicate::DueOnOrBefore(date) => {
            args.push(SqlArg::Text(date.format(DATE_FORMAT).to_string()));
            "t.due_date <= ?"
        }
        Predicate::DueOnOrAfter(date) => {
            args.push(SqlArg::Text(date.format(DATE_FORMAT).to_string()));
            "t.due_date >= ?"
        }
        Predicate::PriorityEq(priority) => {
            args.push(SqlArg::Text(priority.as_str().to_owned()));
            "t.priority = ?"
        }
        Predicate::CategoryNamed(name) => {
            args.push(SqlArg::Text(name.clone()));
            "c.name = ?"
        }
        Predicate::Search(needle) => {
            let needle = needle.to_lowercase();
            args.push(SqlArg::Text(needle.clone()));
            args.push(SqlArg::Text(needle));
            "(instr(lower(t.title), ?) > 0 OR instr(lower(coalesce(t.description, '')), ?) > 0)"
        }
    }
}

fn where_clause(owner: UserId, predicates: &[Predicate]) -> (String, Vec<SqlArg>) {
    let mut args = vec![SqlArg::Int(owner.0)];
    let mut sql = String::from(" WHERE t.user_id = ?");
    for predicate in predicates {
        let condition = predicate_sql(predicate, &mut args);
        sql.push_str(" AND ");
        sql.push_str(condition);
    }
    (sql, args)
}

fn bind_all<'q>(
    mut query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    args: Vec<SqlArg>,
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    for arg in args {
        query = match arg {
            SqlArg::Int(value) => query.bind(value),
            SqlArg::Text(value) => query.bind(value),
        };
    }
    query
}

#[async_trait]
impl TaskRepository for SqliteStore {
    async fn create(&self, owner: UserId, input: NewTask) -> Result<Task> {
        let created_at = Utc::now();
        let result = sqlx::query(
            "INSERT INTO tasks (title, description, completed, created_at, due_date, priority, category_id, user_id) \
             VALUES (?1, ?2, 0, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&input.title)
        .bind(&input.description)
        .bind(created_at.to_rfc3339())
        .bind(input.due_date.map(|d| d.format(DATE_FORMAT).to_string()))
        .bind(input.priority.as_str())
        .bind(input.category.as_ref().map(|c| c.id.0))
        .bind(owner.0)
        .execute(self.pool())
        .await?;
        Ok(Task {
            id: TaskId(result.last_insert_rowid()),
            title: input.title,
            description: input.description,
            completed: false,
            created_at,
            completed_at: None,
            due_date: input.due_date,
            priority: input.priority,
            category: input.category,
            user: owner,
        })
    }

    async fn get(&self, owner: UserId, id: TaskId) -> Result<Option<Task>> {
        let sql = format!("{SELECT_TASK} WHERE t.id = ?1 AND t.user_id = ?2");
        let row = sqlx::query(&sql)
            .bind(id.0)
            .bind(owner.0)
            .fetch_optional(self.pool())
            .await?;
        row.map(row_to_task).transpose()
    }

    async fn list(&self, owner: UserId, predicates: &[Predicate]) -> Result<Vec<Task>> {
        let (where_sql, args) = where_clause(owner, predicates);
        let sql = format!("{SELECT_TASK}{where_sql}{ORDER}");
        let rows = bind_all(sqlx::query(&sql), args).fetch_all(self.pool()).await?;
        rows.into_iter().map(row_to_task).collect()
    }

    async fn page(
        &self,
        owner: UserId,
        predicates: &[Predicate],
        limit: i64,
        offset: i64,
    ) -> Result<TaskPage> {
        let (where_sql, args) = where_clause(owner, predicates);

        let count_sql = format!("{COUNT_TASKS}{where_sql}");
        let count_row = bind_all(sqlx::query(&count_sql), args.clone())
            .fetch_one(self.pool())
            .await?;
        let count: i64 = count_row.get("count");

        let sql = format!("{SELECT_TASK}{where_sql}{ORDER} LIMIT ? OFFSET ?");
        let rows = bind_all(sqlx::query(&sql), args)
            .bind(limit)
            .bind(offset)
            .fetch_all(self.pool())
            .await?;
        let items = rows.into_iter().map(row_to_task).collect::<Result<Vec<_>>>()?;
        Ok(TaskPage { count, items })
    }

    async fn update(&self, owner: UserId, id: TaskId, patch: TaskPatch) -> Result<Option<Task>> {
        let Some(mut task) = self.get(owner, id).await? else { return Ok(None) };

        if let Some(title) = patch.title {
            task.title = title;
        }
        if let Some(description) = patch.description {
            task.description = Some(description);
        }
        if let Some(due_date) = patch.due_date {
            task.due_date = due_date;
        }
        if let Some(priority) = patch.priority {
            task.priority = priority;
        }
        if let Some(category) = patch.category {
            task.category = category;
        }

        sqlx::query(
            "UPDATE tasks SET title = ?2, description = ?3, due_date = ?4, priority = ?5, category_id = ?6 \
             WHERE id = ?1 AND user_id = ?7",
        )
        .bind(task.id.0)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.due_date.map(|d| d.format(DATE_FORMAT).to_string()))
        .bind(task.priority.as_str())
        .bind(task.category.as_ref().map(|c| c.id.0))
        .bind(owner.0)
        .execute(self.pool())
        .await?;

        Ok(Some(task))
    }

    async fn set_completion(
        &self,
        owner: UserId,
        id: TaskId,
        completed: bool,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE tasks SET completed = ?2, completed_at = ?3 WHERE id = ?1 AND user_id = ?4",
        )
        .bind(id.0)
        .bind(completed as i64)
        .bind(completed_at.map(|at| at.to_rfc3339()))
        .bind(owner.0)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, owner: UserId, id: TaskId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?1 AND user_id = ?2")
            .bind(id.0)
            .bind(owner.0)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn row_to_task(row: SqliteRow) -> Result<Task> {
    let created_at: String = row.get("created_at");
    let completed_at: Option<String> = row.get("completed_at");
    let due_date: Option<String> = row.get("due_date");
    let priority: String = row.get("priority");
    let completed: i64 = row.get("completed");
    let category_id: Option<i64> = row.get("category_id");
    let category_name: Option<String> = row.get("category_name");

    let category = match (category_id, category_name) {
        (Some(id), Some(name)) => Some(Category { id: CategoryId(id), name }),
        _ => None,
    };

    Ok(Task {
        id: TaskId(row.get("id")),
        title: row.get("title"),
        description: row.get("description"),
        completed: completed != 0,
        created_at: DateTime::parse_from_rfc3339(&created_at)?.with_timezone(&Utc),
        completed_at: completed_at
            .map(|at| DateTime::parse_from_rfc3339(&at).map(|at| at.with_timezone(&Utc)))
            .transpose()?,
        due_date: due_date.map(|d| NaiveDate::parse_from_str(&d, DATE_FORMAT)).transpose()?,
        priority: Priority::parse(&priority).unwrap_or_default(),
        category,
        user: UserId(row.get("user_id")),
    })
}
