//! Task mutation engine
//!
//! Owns every change to a task's fields and status. The rules:
//!
//! - Locking, unlocking and deleting need manager capability.
//! - A create or edit that targets `Lock` needs manager capability, and so does
//!   any edit of a task that is currently locked.
//! - A locked task leaves `Lock` only through unlock. Edits of a locked task
//!   must keep the `Lock` status.
//! - Capability is checked before the target row is read, so a member asking
//!   about a missing task is told `Forbidden`, never `NotFound`.
//! - A rejected mutation writes nothing.
//!
//! Writes are unconditional and keyed by id: concurrent mutations of one task
//! are last-writer-wins.

use std::sync::Arc;

use chrono::Utc;

use super::filter::FilterSet;
use super::model::{NewTask, Task, TaskInput, TaskStatus};
use super::repository::{AssignmentRepository, TaskRepository};
use crate::user::{Capability, User, UserRepository};
use crate::{Error, Result};

#[derive(Clone)]
pub struct TaskService {
    tasks: Arc<dyn TaskRepository>,
    assignments: Arc<dyn AssignmentRepository>,
    users: Arc<dyn UserRepository>,
}

impl TaskService {
    pub fn new(
        tasks: Arc<dyn TaskRepository>,
        assignments: Arc<dyn AssignmentRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            tasks,
            assignments,
            users,
        }
    }

    /// List tasks matching a filter set
    pub async fn list(&self, filters: &FilterSet) -> Result<Vec<Task>> {
        let query = filters.build()?;
        self.tasks.find_many(&query).await
    }

    /// Count tasks matching the predicate keys of a filter set
    pub async fn count(&self, filters: &FilterSet) -> Result<u64> {
        let predicates = filters.predicates()?;
        self.tasks.count(&predicates).await
    }

    pub async fn get(&self, id: i64) -> Result<Task> {
        self.tasks.find_one(id).await?.ok_or_else(|| task_not_found(id))
    }

    /// Create a task and assign its author to it
    pub async fn create(&self, input: TaskInput, capability: Capability) -> Result<Task> {
        input.validate()?;
        if input.status.is_locked() {
            capability.require_manager("create a locked task")?;
        }

        let task = self.tasks.insert(NewTask::new(input)).await?;
        tracing::info!(task_id = task.id, status = %task.status, "task created");
        Ok(task)
    }

    /// Replace every editable field of a task
    pub async fn edit(&self, id: i64, input: TaskInput, capability: Capability) -> Result<Task> {
        input.validate()?;
        if input.status.is_locked() {
            capability.require_manager("lock a task")?;
        }

        let mut task = self.get(id).await?;
        if task.status.is_locked() {
            capability.require_manager("edit a locked task")?;
            if !input.status.is_locked() {
                return Err(Error::validation(format!(
                    "Task {} is locked; unlock it before changing its status",
                    id
                )));
            }
        }

        input.apply_to(&mut task);
        self.write(task).await
    }

    /// Move a task to `Lock` from any state
    pub async fn lock(&self, id: i64, capability: Capability) -> Result<Task> {
        capability.require_manager("lock a task")?;

        let mut task = self.get(id).await?;
        task.status = TaskStatus::Lock;
        self.write(task).await
    }

    /// Move a locked task to `InProgress`
    ///
    /// The status held before locking is not remembered.
    pub async fn unlock(&self, id: i64, capability: Capability) -> Result<Task> {
        capability.require_manager("unlock a task")?;

        let mut task = self.get(id).await?;
        if !task.status.is_locked() {
            return Err(Error::validation(format!(
                "Task {} is not locked (status '{}')",
                id, task.status
            )));
        }
        task.status = TaskStatus::InProgress;
        self.write(task).await
    }

    pub async fn delete(&self, id: i64, capability: Capability) -> Result<()> {
        capability.require_manager("delete a task")?;

        if self.tasks.delete(id).await? == 0 {
            return Err(task_not_found(id));
        }
        tracing::info!(task_id = id, "task deleted");
        Ok(())
    }

    /// Users assigned to an existing task, ascending by ID
    pub async fn assignees(&self, id: i64) -> Result<Vec<User>> {
        self.get(id).await?;
        self.assignments.users_for_task(id).await
    }

    /// Tasks assigned to an existing user, ascending by ID
    pub async fn assigned_to(&self, user_id: i64) -> Result<Vec<Task>> {
        self.find_user(user_id).await?;
        self.assignments.tasks_for_user(user_id).await
    }

    pub async fn assign(&self, id: i64, user_id: i64, capability: Capability) -> Result<()> {
        capability.require_manager("assign users to a task")?;

        self.get(id).await?;
        self.find_user(user_id).await?;
        self.assignments.assign(user_id, id).await?;
        tracing::info!(task_id = id, user_id, "user assigned");
        Ok(())
    }

    pub async fn unassign(&self, id: i64, user_id: i64, capability: Capability) -> Result<()> {
        capability.require_manager("remove users from a task")?;

        if self.assignments.unassign(user_id, id).await? == 0 {
            return Err(Error::not_found(format!(
                "User {} is not assigned to task {}",
                user_id, id
            )));
        }
        tracing::info!(task_id = id, user_id, "user unassigned");
        Ok(())
    }

    async fn find_user(&self, user_id: i64) -> Result<User> {
        self.users
            .find_one(user_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("User {} not found", user_id)))
    }

    async fn write(&self, mut task: Task) -> Result<Task> {
        task.updated_at = Utc::now();
        if self.tasks.update(&task).await? == 0 {
            return Err(task_not_found(task.id));
        }
        tracing::info!(task_id = task.id, status = %task.status, "task updated");
        Ok(task)
    }
}

fn task_not_found(id: i64) -> Error {
    Error::not_found(format!("Task {} not found", id))
}
