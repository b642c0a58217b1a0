//! User directory operations

use std::sync::Arc;

use super::gate::Capability;
use super::model::User;
use super::repository::UserRepository;
use crate::{Error, Result};

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    pub async fn list(&self) -> Result<Vec<User>> {
        self.users.list().await
    }

    pub async fn get(&self, id: i64) -> Result<User> {
        self.users
            .find_one(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("User {} not found", id)))
    }

    /// Remove a user together with their task assignments
    ///
    /// Tasks the user authored are kept.
    pub async fn delete(&self, id: i64, capability: Capability) -> Result<()> {
        capability.require_manager("delete users")?;

        if self.users.delete(id).await? == 0 {
            return Err(Error::not_found(format!("User {} not found", id)));
        }
        tracing::info!(user_id = id, "user deleted");
        Ok(())
    }
}
