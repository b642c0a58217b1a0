//! Manager capability gate
//!
//! Answers one question per request: does the resolved caller hold the manager
//! role. The gate never decodes tokens; it only sees the email an identity
//! resolver produced.

use std::sync::Arc;

use async_trait::async_trait;

use super::model::{normalize_email, Role};
use super::repository::UserRepository;
use crate::{Error, Result};

/// What the current caller may do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Manager,
    Member,
}

impl Capability {
    pub fn is_manager(self) -> bool {
        matches!(self, Self::Manager)
    }

    /// Fail with `Forbidden` unless this is manager capability
    pub fn require_manager(self, action: &str) -> Result<()> {
        if self.is_manager() {
            return Ok(());
        }
        tracing::warn!(action, "non-manager denied");
        Err(Error::forbidden(format!(
            "You are not a manager, cannot {}",
            action
        )))
    }
}

impl From<bool> for Capability {
    fn from(is_manager: bool) -> Self {
        if is_manager {
            Self::Manager
        } else {
            Self::Member
        }
    }
}

#[async_trait]
pub trait AuthorizationGate: Send + Sync {
    /// `Ok(false)` means the capability is absent; `Err` means it could not be
    /// determined. Missing or malformed identities are never managers.
    async fn is_manager(&self, identity: Option<&str>) -> Result<bool>;

    async fn capability(&self, identity: Option<&str>) -> Result<Capability> {
        self.is_manager(identity).await.map(Capability::from)
    }
}

/// Gate backed by the user directory
#[derive(Clone)]
pub struct UserDirectoryGate {
    users: Arc<dyn UserRepository>,
}

impl UserDirectoryGate {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl AuthorizationGate for UserDirectoryGate {
    async fn is_manager(&self, identity: Option<&str>) -> Result<bool> {
        let Some(email) = identity.and_then(normalize_email) else {
            return Ok(false);
        };
        self.users.has_role(&email, Role::Manager).await
    }
}
