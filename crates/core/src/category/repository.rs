//! Task category repository trait

use async_trait::async_trait;

use super::model::{CategoryInput, TaskCategory};
use crate::Result;

#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn insert(&self, category: CategoryInput) -> Result<TaskCategory>;

    async fn find_one(&self, id: i64) -> Result<Option<TaskCategory>>;

    /// All categories, ascending by ID
    async fn list(&self) -> Result<Vec<TaskCategory>>;

    /// Rename a category, returning rows affected
    async fn update(&self, category: &TaskCategory) -> Result<u64>;

    /// Delete a category by ID, returning rows affected
    async fn delete(&self, id: i64) -> Result<u64>;
}
