//! Category operations
//!
//! Anyone may read categories; creating, renaming and deleting them is a
//! manager operation.

use std::sync::Arc;

use super::model::{CategoryInput, TaskCategory};
use super::repository::CategoryRepository;
use crate::task::{Predicate, TaskRepository};
use crate::user::Capability;
use crate::{Error, Result};

#[derive(Clone)]
pub struct CategoryService {
    categories: Arc<dyn CategoryRepository>,
    tasks: Arc<dyn TaskRepository>,
}

impl CategoryService {
    pub fn new(categories: Arc<dyn CategoryRepository>, tasks: Arc<dyn TaskRepository>) -> Self {
        Self { categories, tasks }
    }

    pub async fn list(&self) -> Result<Vec<TaskCategory>> {
        self.categories.list().await
    }

    pub async fn get(&self, id: i64) -> Result<TaskCategory> {
        self.categories
            .find_one(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("Task category {} not found", id)))
    }

    pub async fn create(&self, input: CategoryInput, capability: Capability) -> Result<TaskCategory> {
        capability.require_manager("create task categories")?;
        let category = self.categories.insert(input.normalized()?).await?;
        tracing::info!(category_id = category.id, "task category created");
        Ok(category)
    }

    pub async fn rename(
        &self,
        id: i64,
        input: CategoryInput,
        capability: Capability,
    ) -> Result<TaskCategory> {
        capability.require_manager("rename task categories")?;
        let input = input.normalized()?;
        let category = TaskCategory {
            id,
            name: input.name,
        };
        if self.categories.update(&category).await? == 0 {
            return Err(Error::not_found(format!("Task category {} not found", id)));
        }
        tracing::info!(category_id = id, "task category renamed");
        Ok(category)
    }

    /// Categories still referenced by tasks cannot be deleted
    pub async fn delete(&self, id: i64, capability: Capability) -> Result<()> {
        capability.require_manager("delete task categories")?;
        let in_use = self
            .tasks
            .count(&[Predicate::TaskCategoryIdEq(id)])
            .await?;
        if in_use > 0 {
            return Err(Error::validation(format!(
                "Task category {} is still used by {} task(s)",
                id, in_use
            )));
        }
        if self.categories.delete(id).await? == 0 {
            return Err(Error::not_found(format!("Task category {} not found", id)));
        }
        tracing::info!(category_id = id, "task category deleted");
        Ok(())
    }
}
