//! Task repository traits
//!
//! Defines the record store operations the task engine depends on.

use async_trait::async_trait;

use super::filter::{Predicate, TaskQuery};
use super::model::{NewTask, Task};
use crate::user::User;
use crate::Result;

/// Repository interface for task rows
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Get a task by ID
    async fn find_one(&self, id: i64) -> Result<Option<Task>>;

    /// Run a built listing query
    async fn find_many(&self, query: &TaskQuery) -> Result<Vec<Task>>;

    /// Insert a task and link its author to it in the same write
    async fn insert(&self, task: NewTask) -> Result<Task>;

    /// Overwrite the row with the same ID, returning rows affected
    async fn update(&self, task: &Task) -> Result<u64>;

    /// Delete a task by ID, returning rows affected
    async fn delete(&self, id: i64) -> Result<u64>;

    /// Count tasks matching every predicate
    async fn count(&self, predicates: &[Predicate]) -> Result<u64>;
}

/// Repository interface for the user/task assignment relation
#[async_trait]
pub trait AssignmentRepository: Send + Sync {
    /// Link a user to a task; linking twice is a no-op
    async fn assign(&self, user_id: i64, task_id: i64) -> Result<()>;

    /// Remove a link, returning rows affected
    async fn unassign(&self, user_id: i64, task_id: i64) -> Result<u64>;

    /// Users linked to a task, ascending by ID
    ///
    /// Links naming a user that no longer exists are skipped.
    async fn users_for_task(&self, task_id: i64) -> Result<Vec<User>>;

    /// Tasks linked to a user, ascending by ID
    async fn tasks_for_user(&self, user_id: i64) -> Result<Vec<Task>>;
}
