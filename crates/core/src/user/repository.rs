//! User repository trait

use async_trait::async_trait;

use super::model::{NewUser, Role, User};
use crate::Result;

/// Repository interface for user rows
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user; emails are unique
    async fn insert(&self, user: NewUser) -> Result<User>;

    async fn find_one(&self, id: i64) -> Result<Option<User>>;

    /// Look up by normalized email
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// All users, ascending by ID
    async fn list(&self) -> Result<Vec<User>>;

    /// Change a user's role, returning rows affected
    async fn set_role(&self, id: i64, role: Role) -> Result<u64>;

    /// Delete a user and their assignment links, returning rows affected
    async fn delete(&self, id: i64) -> Result<u64>;

    /// Whether a user with this normalized email holds the role
    async fn has_role(&self, email: &str, role: Role) -> Result<bool>;
}
