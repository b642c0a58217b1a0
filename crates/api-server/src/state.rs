//! Application state

use std::sync::Arc;

use taskdesk_core::category::CategoryService;
use taskdesk_core::store::FileStore;
use taskdesk_core::task::TaskService;
use taskdesk_core::user::{
    AuthorizationGate, NewUser, Role, UserDirectoryGate, UserRepository, UserService,
};

use crate::auth::AuthConfig;
use crate::config::ServerConfig;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    tasks: TaskService,
    categories: CategoryService,
    users: UserService,
    gate: Arc<dyn AuthorizationGate>,
    auth: AuthConfig,
}

impl AppState {
    /// Open the record store and wire every service to it
    pub async fn new(config: &ServerConfig) -> taskdesk_core::Result<Self> {
        let store = Arc::new(FileStore::new(config.store_path()).await?);
        if let Some(email) = config.bootstrap_manager.as_deref() {
            ensure_manager(store.as_ref(), email).await?;
        }
        Ok(Self::with_store(store, AuthConfig::new(&config.jwt_secret)))
    }

    pub fn with_store(store: Arc<FileStore>, auth: AuthConfig) -> Self {
        let users: Arc<dyn UserRepository> = store.clone();
        Self {
            inner: Arc::new(AppStateInner {
                tasks: TaskService::new(store.clone(), store.clone(), users.clone()),
                categories: CategoryService::new(store.clone(), store),
                gate: Arc::new(UserDirectoryGate::new(users.clone())),
                users: UserService::new(users),
                auth,
            }),
        }
    }

    pub fn tasks(&self) -> &TaskService {
        &self.inner.tasks
    }

    pub fn categories(&self) -> &CategoryService {
        &self.inner.categories
    }

    pub fn users(&self) -> &UserService {
        &self.inner.users
    }

    pub fn gate(&self) -> &dyn AuthorizationGate {
        self.inner.gate.as_ref()
    }

    pub fn auth(&self) -> &AuthConfig {
        &self.inner.auth
    }
}

/// Create the manager account, or promote an existing user
async fn ensure_manager(users: &dyn UserRepository, email: &str) -> taskdesk_core::Result<()> {
    match users.find_by_email(email).await? {
        Some(user) if user.role == Role::Manager => {}
        Some(user) => {
            users.set_role(user.id, Role::Manager).await?;
            tracing::info!(user_id = user.id, "bootstrap manager promoted");
        }
        None => {
            let name = email.split('@').next().unwrap_or(email).to_string();
            let user = users.insert(NewUser::new(name, email, Role::Manager)).await?;
            tracing::info!(user_id = user.id, "bootstrap manager created");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use tempfile::TempDir;

    use super::*;

    fn config(data_dir: PathBuf, bootstrap_manager: Option<&str>) -> ServerConfig {
        ServerConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            data_dir,
            jwt_secret: "test-secret".to_string(),
            request_timeout: Duration::from_secs(5),
            bootstrap_manager: bootstrap_manager.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn bootstrap_manager_is_created_then_kept() {
        let temp = TempDir::new().unwrap();
        let config = config(temp.path().to_path_buf(), Some("Boss@Example.com"));

        let state = AppState::new(&config).await.unwrap();
        assert!(state.gate().is_manager(Some("boss@example.com")).await.unwrap());

        // A second start finds the account and leaves it alone.
        let state = AppState::new(&config).await.unwrap();
        let users = state.users().list().await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].name, "Boss");
    }
}
