use chrono::NaiveDate;

use super::task::{Priority, Task};

/// Parsed filter/search parameters for task listings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFilter {
    pub title: Option<String>,
    pub completed: Option<bool>,
    pub created_at: Option<NaiveDate>,
    pub completed_at: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub due_date_before: Option<NaiveDate>,
    pub due_date_after: Option<NaiveDate>,
    pub priority: Option<Priority>,
    pub category: Option<String>,
    pub search: Option<String>,
}

/// One filter clause: a field, an operator, and a value, rendered as a typed
/// variant. Clauses are produced by `TaskFilter::predicates` in a fixed order
/// and applied conjunctively.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    TitleContains(String),
    CompletedEq(bool),
    CreatedOn(NaiveDate),
    CompletedOn(NaiveDate),
    DueOn(NaiveDate),
    DueOnOrBefore(NaiveDate),
    DueOnOrAfter(NaiveDate),
    PriorityEq(Priority),
    CategoryNamed(String),
    Search(String),
}

impl TaskFilter {
    pub fn predicates(&self) -> Vec<Predicate> {
        let mut clauses = Vec::new();
        if let Some(title) = &self.title {
            clauses.push(Predicate::TitleContains(title.clone()));
        }
        if let Some(completed) = self.completed {
            clauses.push(Predicate::CompletedEq(completed));
        }
        if let Some(date) = self.created_at {
            clauses.push(Predicate::CreatedOn(date));
        }
        if let Some(date) = self.completed_at {
            clauses.push(Predicate::CompletedOn(date));
        }
        if let Some(date) = self.due_date {
            clauses.push(Predicate::DueOn(date));
        }
        if let Some(date) = self.due_date_before {
            clauses.push(Predicate::DueOnOrBefore(date));
        }
        if let Some(date) = self.due_date_after {
            clauses.push(Predicate::DueOnOrAfter(date));
        }
        if let Some(priority) = self.priority {
            clauses.push(Predicate::PriorityEq(priority));
        }
        if let Some(category) = &self.category {
            clauses.push(Predicate::CategoryNamed(category.clone()));
        }
        if let Some(search) = &self.search {
            clauses.push(Predicate::Search(search.clone()));
        }
        clauses
    }

    pub fn is_empty(&self) -> bool {
        self.predicates().is_empty()
    }
}

impl Predicate {
    /// In-memory evaluation of a single clause against a task. The SQLite
    /// repository translates the same clauses to SQL; both must agree.
    pub fn matches(&self, task: &Task) -> bool {
        match self {
            Predicate::TitleContains(needle) => contains_ci(&task.title, needle),
            Predicate::CompletedEq(completed) => task.completed == *completed,
            Predicate::CreatedOn(date) => task.created_at.date_naive() == *date,
            Predicate::CompletedOn(date) => {
                task.completed_at.map(|at| at.date_naive()) == Some(*date)
            }
            Predicate::DueOn(date) => task.due_date == Some(*date),
            Predicate::DueOnOrBefore(date) => task.due_date.is_some_and(|due| due <= *date),
            Predicate::DueOnOrAfter(date) => task.due_date.is_some_and(|due| due >= *date),
            Predicate::PriorityEq(priority) => task.priority == *priority,
            Predicate::CategoryNamed(name) => {
                task.category.as_ref().is_some_and(|c| c.name == *name)
            }
            Predicate::Search(needle) => {
                contains_ci(&task.title, needle)
                    || task.description.as_deref().is_some_and(|d| contains_ci(d, needle))
            }
        }
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::category::{Category, CategoryId};
    use crate::domain::task::TaskId;
    use crate::domain::user::UserId;
    use chrono::{TimeZone, Utc};

    fn task() -> Task {
        Task {
            id: TaskId(1),
            title: "Shopping list".into(),
            description: Some("Buy groceries".into()),
            completed: false,
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap(),
            completed_at: None,
            due_date: NaiveDate::from_ymd_opt(2024, 5, 10),
            priority: Priority::Medium,
            category: Some(Category { id: CategoryId(7), name: "Errands".into() }),
            user: UserId(1),
        }
    }

    #[test]
    fn predicates_come_out_in_declaration_order() {
        let filter = TaskFilter {
            search: Some("x".into()),
            completed: Some(true),
            title: Some("y".into()),
            ..TaskFilter::default()
        };
        assert_eq!(
            filter.predicates(),
            vec![
                Predicate::TitleContains("y".into()),
                Predicate::CompletedEq(true),
                Predicate::Search("x".into()),
            ]
        );
    }

    #[test]
    fn search_is_case_insensitive_over_title_and_description() {
        let t = task();
        assert!(Predicate::Search("shopping".into()).matches(&t));
        assert!(Predicate::Search("GROCERIES".into()).matches(&t));
        assert!(!Predicate::Search("laundry".into()).matches(&t));
    }

    #[test]
    fn date_predicates_compare_the_date_part() {
        let t = task();
        let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert!(Predicate::CreatedOn(day).matches(&t));
        assert!(!Predicate::CompletedOn(day).matches(&t));
        assert!(Predicate::DueOnOrAfter(day).matches(&t));
        assert!(!Predicate::DueOnOrBefore(day).matches(&t));
    }

    #[test]
    fn category_matches_by_name_and_misses_on_none() {
        let mut t = task();
        assert!(Predicate::CategoryNamed("Errands".into()).matches(&t));
        t.category = None;
        assert!(!Predicate::CategoryNamed("Errands".into()).matches(&t));
    }
}
