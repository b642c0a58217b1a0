//! File-based record store
//!
//! Keeps every table in memory behind one lock and rewrites a single JSON
//! document on each write. A write is staged on a copy of the tables and only
//! becomes visible once the document is on disk, so a failed write leaves
//! nothing behind. IDs are assigned from per-table counters that survive
//! restarts.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::category::{CategoryInput, CategoryRepository, TaskCategory};
use crate::task::{AssignmentRepository, NewTask, Predicate, Task, TaskQuery, TaskRepository};
use crate::user::{normalize_email, NewUser, Role, User, UserRepository};
use crate::{Error, Result};

#[derive(Debug, Clone, Default)]
struct StoreState {
    tasks: BTreeMap<i64, Task>,
    users: BTreeMap<i64, User>,
    categories: BTreeMap<i64, TaskCategory>,
    assignments: BTreeSet<(i64, i64)>,
    next_task_id: i64,
    next_user_id: i64,
    next_category_id: i64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredState {
    #[serde(default)]
    tasks: Vec<Task>,
    #[serde(default)]
    users: Vec<User>,
    #[serde(default)]
    task_categories: Vec<TaskCategory>,
    #[serde(default)]
    user_task_details: Vec<Assignment>,
    #[serde(default)]
    next_task_id: i64,
    #[serde(default)]
    next_user_id: i64,
    #[serde(default)]
    next_category_id: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct Assignment {
    user_id: i64,
    task_id: i64,
}

impl From<StoredState> for StoreState {
    fn from(value: StoredState) -> Self {
        let tasks: BTreeMap<i64, Task> =
            value.tasks.into_iter().map(|item| (item.id, item)).collect();
        let users: BTreeMap<i64, User> =
            value.users.into_iter().map(|item| (item.id, item)).collect();
        let categories: BTreeMap<i64, TaskCategory> = value
            .task_categories
            .into_iter()
            .map(|item| (item.id, item))
            .collect();

        // Counters never go below the largest ID on disk.
        let next_task_id = value.next_task_id.max(next_after(tasks.keys()));
        let next_user_id = value.next_user_id.max(next_after(users.keys()));
        let next_category_id = value.next_category_id.max(next_after(categories.keys()));

        Self {
            tasks,
            users,
            categories,
            assignments: value
                .user_task_details
                .into_iter()
                .map(|item| (item.user_id, item.task_id))
                .collect(),
            next_task_id,
            next_user_id,
            next_category_id,
        }
    }
}

impl From<&StoreState> for StoredState {
    fn from(value: &StoreState) -> Self {
        Self {
            tasks: value.tasks.values().cloned().collect(),
            users: value.users.values().cloned().collect(),
            task_categories: value.categories.values().cloned().collect(),
            user_task_details: value
                .assignments
                .iter()
                .map(|(user_id, task_id)| Assignment {
                    user_id: *user_id,
                    task_id: *task_id,
                })
                .collect(),
            next_task_id: value.next_task_id,
            next_user_id: value.next_user_id,
            next_category_id: value.next_category_id,
        }
    }
}

fn next_after<'a>(ids: impl Iterator<Item = &'a i64>) -> i64 {
    ids.max().map(|id| id + 1).unwrap_or(1)
}

fn allocate(counter: &mut i64) -> i64 {
    let id = (*counter).max(1);
    *counter = id + 1;
    id
}

/// File-based store implementing every repository trait
#[derive(Clone)]
pub struct FileStore {
    state: Arc<RwLock<StoreState>>,
    file_path: PathBuf,
}

impl FileStore {
    /// Open the store at `file_path`
    ///
    /// If the file doesn't exist, it will be created on first write.
    pub async fn new(file_path: impl Into<PathBuf>) -> Result<Self> {
        let file_path = file_path.into();
        let state = load_state(&file_path).await?;
        tracing::debug!(
            path = %file_path.display(),
            tasks = state.tasks.len(),
            users = state.users.len(),
            "record store opened"
        );
        Ok(Self {
            state: Arc::new(RwLock::new(state)),
            file_path,
        })
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Apply `change` to a copy of the tables and publish it once persisted
    async fn commit<T, F>(&self, change: F) -> Result<T>
    where
        F: FnOnce(&mut StoreState) -> Result<Change<T>> + Send,
        T: Send,
    {
        let mut state = self.state.write().await;
        let mut staged = state.clone();
        match change(&mut staged)? {
            Change::Unchanged(value) => Ok(value),
            Change::Commit(value) => {
                persist_state(&self.file_path, &staged).await?;
                *state = staged;
                Ok(value)
            }
        }
    }
}

/// Result of a staged change
enum Change<T> {
    /// Rows changed; persist before returning
    Commit(T),
    /// Nothing to write
    Unchanged(T),
}

#[async_trait]
impl TaskRepository for FileStore {
    async fn find_one(&self, id: i64) -> Result<Option<Task>> {
        let state = self.state.read().await;
        Ok(state.tasks.get(&id).cloned())
    }

    async fn find_many(&self, query: &TaskQuery) -> Result<Vec<Task>> {
        let state = self.state.read().await;
        Ok(query.evaluate(state.tasks.values()))
    }

    async fn insert(&self, task: NewTask) -> Result<Task> {
        self.commit(move |state| {
            let id = allocate(&mut state.next_task_id);
            let task = task.into_task(id);
            state.assignments.insert((task.author_id, id));
            state.tasks.insert(id, task.clone());
            Ok(Change::Commit(task))
        })
        .await
    }

    async fn update(&self, task: &Task) -> Result<u64> {
        self.commit(|state| match state.tasks.get_mut(&task.id) {
            Some(row) => {
                *row = task.clone();
                Ok(Change::Commit(1))
            }
            None => Ok(Change::Unchanged(0)),
        })
        .await
    }

    async fn delete(&self, id: i64) -> Result<u64> {
        self.commit(|state| {
            if state.tasks.remove(&id).is_none() {
                return Ok(Change::Unchanged(0));
            }
            state.assignments.retain(|(_, task_id)| *task_id != id);
            Ok(Change::Commit(1))
        })
        .await
    }

    async fn count(&self, predicates: &[Predicate]) -> Result<u64> {
        let state = self.state.read().await;
        let count = state
            .tasks
            .values()
            .filter(|task| predicates.iter().all(|predicate| predicate.matches(task)))
            .count();
        Ok(count as u64)
    }
}

#[async_trait]
impl AssignmentRepository for FileStore {
    async fn assign(&self, user_id: i64, task_id: i64) -> Result<()> {
        self.commit(|state| {
            if state.assignments.insert((user_id, task_id)) {
                Ok(Change::Commit(()))
            } else {
                Ok(Change::Unchanged(()))
            }
        })
        .await
    }

    async fn unassign(&self, user_id: i64, task_id: i64) -> Result<u64> {
        self.commit(|state| {
            if state.assignments.remove(&(user_id, task_id)) {
                Ok(Change::Commit(1))
            } else {
                Ok(Change::Unchanged(0))
            }
        })
        .await
    }

    async fn users_for_task(&self, task_id: i64) -> Result<Vec<User>> {
        let state = self.state.read().await;
        // The set is ordered by (user, task), so users come out ascending.
        Ok(state
            .assignments
            .iter()
            .filter(|(_, assigned_task)| *assigned_task == task_id)
            .filter_map(|(user_id, _)| state.users.get(user_id).cloned())
            .collect())
    }

    async fn tasks_for_user(&self, user_id: i64) -> Result<Vec<Task>> {
        let state = self.state.read().await;
        Ok(state
            .assignments
            .range((user_id, i64::MIN)..=(user_id, i64::MAX))
            .filter_map(|(_, task_id)| state.tasks.get(task_id).cloned())
            .collect())
    }
}

#[async_trait]
impl UserRepository for FileStore {
    async fn insert(&self, user: NewUser) -> Result<User> {
        let user = user.normalized()?;
        self.commit(move |state| {
            if state.users.values().any(|existing| existing.email == user.email) {
                return Err(Error::validation(format!(
                    "User '{}' already exists",
                    user.email
                )));
            }
            let id = allocate(&mut state.next_user_id);
            let user = User {
                id,
                name: user.name,
                email: user.email,
                role: user.role,
            };
            state.users.insert(id, user.clone());
            Ok(Change::Commit(user))
        })
        .await
    }

    async fn find_one(&self, id: i64) -> Result<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let Some(email) = normalize_email(email) else {
            return Ok(None);
        };
        let state = self.state.read().await;
        Ok(state.users.values().find(|user| user.email == email).cloned())
    }

    async fn list(&self) -> Result<Vec<User>> {
        let state = self.state.read().await;
        Ok(state.users.values().cloned().collect())
    }

    async fn set_role(&self, id: i64, role: Role) -> Result<u64> {
        self.commit(|state| match state.users.get_mut(&id) {
            Some(user) => {
                user.role = role;
                Ok(Change::Commit(1))
            }
            None => Ok(Change::Unchanged(0)),
        })
        .await
    }

    async fn delete(&self, id: i64) -> Result<u64> {
        self.commit(|state| {
            if state.users.remove(&id).is_none() {
                return Ok(Change::Unchanged(0));
            }
            state.assignments.retain(|(user_id, _)| *user_id != id);
            Ok(Change::Commit(1))
        })
        .await
    }

    async fn has_role(&self, email: &str, role: Role) -> Result<bool> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .any(|user| user.email == email && user.role == role))
    }
}

#[async_trait]
impl CategoryRepository for FileStore {
    async fn insert(&self, category: CategoryInput) -> Result<TaskCategory> {
        self.commit(move |state| {
            let id = allocate(&mut state.next_category_id);
            let category = TaskCategory {
                id,
                name: category.name,
            };
            state.categories.insert(id, category.clone());
            Ok(Change::Commit(category))
        })
        .await
    }

    async fn find_one(&self, id: i64) -> Result<Option<TaskCategory>> {
        let state = self.state.read().await;
        Ok(state.categories.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<TaskCategory>> {
        let state = self.state.read().await;
        Ok(state.categories.values().cloned().collect())
    }

    async fn update(&self, category: &TaskCategory) -> Result<u64> {
        self.commit(|state| match state.categories.get_mut(&category.id) {
            Some(row) => {
                *row = category.clone();
                Ok(Change::Commit(1))
            }
            None => Ok(Change::Unchanged(0)),
        })
        .await
    }

    async fn delete(&self, id: i64) -> Result<u64> {
        self.commit(|state| {
            if state.categories.remove(&id).is_none() {
                return Ok(Change::Unchanged(0));
            }
            Ok(Change::Commit(1))
        })
        .await
    }
}

async fn load_state(path: &Path) -> Result<StoreState> {
    if !path.exists() {
        return Ok(StoreState::default());
    }
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|err| Error::Store(format!("Failed to read store file: {}", err)))?;
    if content.trim().is_empty() {
        return Ok(StoreState::default());
    }
    let stored: StoredState = serde_json::from_str(&content)
        .map_err(|err| Error::Store(format!("Failed to parse store file: {}", err)))?;
    Ok(stored.into())
}

async fn persist_state(path: &Path, state: &StoreState) -> Result<()> {
    let content = serde_json::to_string_pretty(&StoredState::from(state))?;
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, content).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{FilterSet, TaskInput, TaskStatus, KEY_PAGE, KEY_SIZE, KEY_STATUS};
    use tempfile::TempDir;

    async fn create_test_store() -> (FileStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data").join("store.json");
        let store = FileStore::new(&path).await.unwrap();
        (store, temp_dir)
    }

    async fn seed_tasks(store: &FileStore, statuses: &[TaskStatus]) -> Vec<Task> {
        let mut tasks = Vec::new();
        for (index, status) in statuses.iter().enumerate() {
            let input = TaskInput::new(format!("Task {}", index + 1), 1, 1).with_status(*status);
            tasks.push(TaskRepository::insert(store, NewTask::new(input)).await.unwrap());
        }
        tasks
    }

    #[tokio::test]
    async fn test_insert_assigns_sequential_ids() {
        let (store, _temp) = create_test_store().await;
        let tasks = seed_tasks(&store, &[TaskStatus::NotStarted, TaskStatus::Complete]).await;
        assert_eq!(tasks[0].id, 1);
        assert_eq!(tasks[1].id, 2);
        assert_eq!(
            TaskRepository::find_one(&store, 2).await.unwrap(),
            Some(tasks[1].clone())
        );
        assert_eq!(TaskRepository::find_one(&store, 3).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_find_many_filters_and_paginates() {
        let (store, _temp) = create_test_store().await;
        seed_tasks(
            &store,
            &[TaskStatus::InProgress, TaskStatus::Complete, TaskStatus::InProgress],
        )
        .await;

        let query = FilterSet::new()
            .with(KEY_STATUS, "Progress")
            .with(KEY_PAGE, 1)
            .with(KEY_SIZE, 10)
            .build()
            .unwrap();
        let ids: Vec<i64> = store
            .find_many(&query)
            .await
            .unwrap()
            .iter()
            .map(|task| task.id)
            .collect();
        assert_eq!(ids, vec![1, 3]);

        let query = FilterSet::new().with(KEY_PAGE, 2).with(KEY_SIZE, 1).build().unwrap();
        let page = store.find_many(&query).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, 2);
    }

    #[tokio::test]
    async fn test_repeated_reads_are_identical() {
        let (store, _temp) = create_test_store().await;
        seed_tasks(&store, &[TaskStatus::Complete, TaskStatus::Lock, TaskStatus::NotStarted]).await;

        let query = FilterSet::new().with("field", "status").build().unwrap();
        let first = store.find_many(&query).await.unwrap();
        let second = store.find_many(&query).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_no_matches_is_empty_not_error() {
        let (store, _temp) = create_test_store().await;
        seed_tasks(&store, &[TaskStatus::Complete]).await;
        let query = FilterSet::new().with(KEY_STATUS, "Lock").build().unwrap();
        assert!(store.find_many(&query).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_and_delete_report_rows_affected() {
        let (store, _temp) = create_test_store().await;
        let mut task = seed_tasks(&store, &[TaskStatus::NotStarted]).await.remove(0);

        task.name = "Renamed".to_string();
        assert_eq!(TaskRepository::update(&store, &task).await.unwrap(), 1);
        let mut ghost = task.clone();
        ghost.id = 99;
        assert_eq!(TaskRepository::update(&store, &ghost).await.unwrap(), 0);

        assert_eq!(TaskRepository::delete(&store, task.id).await.unwrap(), 1);
        assert_eq!(TaskRepository::delete(&store, task.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_count_uses_predicates() {
        let (store, _temp) = create_test_store().await;
        seed_tasks(&store, &[TaskStatus::InProgress, TaskStatus::Complete]).await;
        let predicates = FilterSet::new().with(KEY_STATUS, "Complete").predicates().unwrap();
        assert_eq!(store.count(&predicates).await.unwrap(), 1);
        assert_eq!(store.count(&[Predicate::Always]).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_state_survives_reopen() {
        let (store, _temp) = create_test_store().await;
        seed_tasks(&store, &[TaskStatus::NotStarted, TaskStatus::Complete]).await;
        TaskRepository::delete(&store, 2).await.unwrap();
        UserRepository::insert(&store, NewUser::new("Ann", "ann@example.com", Role::Manager))
            .await
            .unwrap();
        store.assign(1, 1).await.unwrap();

        let reopened = FileStore::new(store.file_path()).await.unwrap();
        assert!(TaskRepository::find_one(&reopened, 1).await.unwrap().is_some());
        assert!(reopened.has_role("ann@example.com", Role::Manager).await.unwrap());
        let assignees = reopened.users_for_task(1).await.unwrap();
        assert_eq!(assignees.len(), 1);
        assert_eq!(assignees[0].email, "ann@example.com");

        // Deleted IDs are not reused.
        let task = TaskRepository::insert(&reopened, NewTask::new(TaskInput::new("Next", 1, 1)))
            .await
            .unwrap();
        assert_eq!(task.id, 3);
    }

    fn ids<T>(rows: &[T], id: impl Fn(&T) -> i64) -> Vec<i64> {
        rows.iter().map(id).collect()
    }

    #[tokio::test]
    async fn test_insert_links_the_author() {
        let (store, _temp) = create_test_store().await;
        let ann = UserRepository::insert(&store, NewUser::new("Ann", "ann@example.com", Role::User))
            .await
            .unwrap();
        let task = TaskRepository::insert(&store, NewTask::new(TaskInput::new("Mine", ann.id, 1)))
            .await
            .unwrap();

        assert_eq!(store.users_for_task(task.id).await.unwrap(), vec![ann.clone()]);
        assert_eq!(store.tasks_for_user(ann.id).await.unwrap(), vec![task]);
    }

    #[tokio::test]
    async fn test_assignments_follow_task_and_user_deletes() {
        let (store, _temp) = create_test_store().await;
        let mut users = Vec::new();
        for (name, email) in [("Ann", "ann@example.com"), ("Bob", "bob@example.com")] {
            users.push(
                UserRepository::insert(&store, NewUser::new(name, email, Role::User))
                    .await
                    .unwrap(),
            );
        }
        let (ann, bob) = (users[0].id, users[1].id);
        // Author 99 has no user row, so only explicit links show up below.
        for name in ["First", "Second"] {
            TaskRepository::insert(&store, NewTask::new(TaskInput::new(name, 99, 1)))
                .await
                .unwrap();
        }
        store.assign(ann, 1).await.unwrap();
        store.assign(ann, 1).await.unwrap();
        store.assign(ann, 2).await.unwrap();
        store.assign(bob, 2).await.unwrap();

        let tasks = store.tasks_for_user(ann).await.unwrap();
        assert_eq!(ids(&tasks, |task| task.id), vec![1, 2]);
        let assignees = store.users_for_task(2).await.unwrap();
        assert_eq!(ids(&assignees, |user| user.id), vec![ann, bob]);

        TaskRepository::delete(&store, 2).await.unwrap();
        let tasks = store.tasks_for_user(ann).await.unwrap();
        assert_eq!(ids(&tasks, |task| task.id), vec![1]);
        assert!(store.users_for_task(2).await.unwrap().is_empty());

        assert_eq!(UserRepository::delete(&store, ann).await.unwrap(), 1);
        assert!(store.users_for_task(1).await.unwrap().is_empty());
        assert_eq!(UserRepository::delete(&store, ann).await.unwrap(), 0);
        // The cascade is persisted, not just applied in memory.
        let reopened = FileStore::new(store.file_path()).await.unwrap();
        assert!(reopened.tasks_for_user(ann).await.unwrap().is_empty());

        assert_eq!(store.unassign(ann, 1).await.unwrap(), 0);
        store.assign(bob, 1).await.unwrap();
        assert_eq!(store.unassign(bob, 1).await.unwrap(), 1);
        assert_eq!(store.unassign(bob, 1).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failed_write_leaves_no_trace() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("data");
        std::fs::write(&blocker, "not a directory").unwrap();
        let store = FileStore::new(blocker.join("store.json")).await.unwrap();

        let err = TaskRepository::insert(&store, NewTask::new(TaskInput::new("Lost", 1, 1)))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Store(_)));
        assert_eq!(TaskRepository::find_one(&store, 1).await.unwrap(), None);
        assert_eq!(store.count(&[Predicate::Always]).await.unwrap(), 0);
        assert!(store.tasks_for_user(1).await.unwrap().is_empty());

        let err = UserRepository::insert(&store, NewUser::new("Ann", "ann@example.com", Role::User))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Store(_)));
        assert!(UserRepository::list(&store).await.unwrap().is_empty());

        // Once the path is writable the counters pick up where they were.
        std::fs::remove_file(&blocker).unwrap();
        let task = TaskRepository::insert(&store, NewTask::new(TaskInput::new("Kept", 1, 1)))
            .await
            .unwrap();
        assert_eq!(task.id, 1);
    }

    #[tokio::test]
    async fn test_duplicate_user_email_is_rejected() {
        let (store, _temp) = create_test_store().await;
        UserRepository::insert(&store, NewUser::new("Ann", "ann@example.com", Role::User))
            .await
            .unwrap();
        let err = UserRepository::insert(&store, NewUser::new("Ann 2", "ANN@example.com", Role::User))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_set_role_reports_rows_affected() {
        let (store, _temp) = create_test_store().await;
        let user = UserRepository::insert(&store, NewUser::new("Ann", "ann@example.com", Role::User))
            .await
            .unwrap();
        assert_eq!(store.set_role(user.id, Role::Manager).await.unwrap(), 1);
        assert!(store.has_role("ann@example.com", Role::Manager).await.unwrap());
        assert_eq!(store.set_role(404, Role::Manager).await.unwrap(), 0);
    }
}
