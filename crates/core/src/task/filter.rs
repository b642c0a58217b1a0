//! Task listing filters
//!
//! A [`FilterSet`] is the typed parameter bag of one listing request. Building it
//! yields a [`TaskQuery`]: an AND-ed list of predicates plus an allow-listed sort
//! and limit/offset pagination. The record store evaluates the query; nothing here
//! ever turns caller input into query text.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::model::Task;
use crate::{Error, Result};

pub const KEY_ID: &str = "id";
pub const KEY_NAME: &str = "name";
pub const KEY_DESCRIPTION: &str = "description";
pub const KEY_STATUS: &str = "status";
pub const KEY_AUTHOR_ID: &str = "author_id";
pub const KEY_TASK_CATEGORY_ID: &str = "task_category_id";
pub const KEY_FIELD: &str = "field";
pub const KEY_ORDER: &str = "order";
pub const KEY_PAGE: &str = "page";
pub const KEY_SIZE: &str = "size";

const INTEGER_KEYS: [&str; 5] = [KEY_ID, KEY_AUTHOR_ID, KEY_TASK_CATEGORY_ID, KEY_PAGE, KEY_SIZE];
const TEXT_KEYS: [&str; 5] = [KEY_NAME, KEY_DESCRIPTION, KEY_STATUS, KEY_FIELD, KEY_ORDER];

/// A single typed filter value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Int(i64),
    Text(String),
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for FilterValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Named filter parameters for one task listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    values: HashMap<String, FilterValue>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter, replacing any previous value for the key
    pub fn with(mut self, key: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FilterValue>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&FilterValue> {
        self.values.get(key)
    }

    /// Convert raw request parameters into typed filters
    ///
    /// Integer keys must parse as integers; unknown keys are dropped. When a key
    /// repeats, the first occurrence wins.
    pub fn from_params<I, K, V>(params: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut filters = Self::new();
        for (key, value) in params {
            let key = key.as_ref();
            if filters.values.contains_key(key) {
                continue;
            }
            let value = value.as_ref().trim();
            if INTEGER_KEYS.contains(&key) {
                let parsed = value.parse::<i64>().map_err(|_| {
                    Error::validation(format!("filter '{}' must be an integer, got '{}'", key, value))
                })?;
                filters.insert(key, parsed);
            } else if TEXT_KEYS.contains(&key) {
                filters.insert(key, value);
            }
        }
        Ok(filters)
    }

    /// Predicates only, for counting
    pub fn predicates(&self) -> Result<Vec<Predicate>> {
        let mut predicates = vec![Predicate::Always];
        // Fixed key order keeps the plan identical however the set was filled.
        if let Some(id) = self.int(KEY_ID)? {
            predicates.push(Predicate::IdEq(id));
        }
        if let Some(name) = self.text(KEY_NAME)? {
            predicates.push(Predicate::NameContains(name.to_string()));
        }
        if let Some(description) = self.text(KEY_DESCRIPTION)? {
            predicates.push(Predicate::DescriptionContains(description.to_string()));
        }
        if let Some(status) = self.text(KEY_STATUS)? {
            predicates.push(Predicate::StatusContains(status.to_string()));
        }
        if let Some(author_id) = self.int(KEY_AUTHOR_ID)? {
            predicates.push(Predicate::AuthorIdEq(author_id));
        }
        if let Some(category_id) = self.int(KEY_TASK_CATEGORY_ID)? {
            predicates.push(Predicate::TaskCategoryIdEq(category_id));
        }
        Ok(predicates)
    }

    /// Build the full query: predicates, ordering and pagination
    pub fn build(&self) -> Result<TaskQuery> {
        let predicates = self.predicates()?;

        let field = match self.text(KEY_FIELD)? {
            Some(raw) => raw.parse()?,
            None => SortField::default(),
        };
        let order = match self.text(KEY_ORDER)? {
            Some(raw) => raw.parse()?,
            None => SortOrder::default(),
        };

        let (limit, offset) = match self.int(KEY_SIZE)? {
            Some(size) if size <= 0 => {
                return Err(Error::validation(format!(
                    "filter 'size' must be positive, got {}",
                    size
                )));
            }
            Some(size) => {
                let page = self.int(KEY_PAGE)?.unwrap_or(1).max(1);
                let size = usize::try_from(size).unwrap_or(usize::MAX);
                let page = usize::try_from(page).unwrap_or(usize::MAX);
                (Some(size), (page - 1).saturating_mul(size))
            }
            None => {
                // Type-check page even though it has no effect without a size.
                self.int(KEY_PAGE)?;
                (None, 0)
            }
        };

        Ok(TaskQuery {
            predicates,
            sort: Sort { field, order },
            limit,
            offset,
        })
    }

    fn int(&self, key: &str) -> Result<Option<i64>> {
        match self.values.get(key) {
            None => Ok(None),
            Some(FilterValue::Int(value)) => Ok(Some(*value)),
            Some(FilterValue::Text(_)) => Err(Error::validation(format!(
                "filter '{}' must be an integer",
                key
            ))),
        }
    }

    fn text(&self, key: &str) -> Result<Option<&str>> {
        match self.values.get(key) {
            None => Ok(None),
            Some(FilterValue::Text(value)) => Ok(Some(value.as_str())),
            Some(FilterValue::Int(_)) => Err(Error::validation(format!(
                "filter '{}' must be a string",
                key
            ))),
        }
    }
}

/// One condition a task must satisfy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    Always,
    IdEq(i64),
    NameContains(String),
    DescriptionContains(String),
    StatusContains(String),
    AuthorIdEq(i64),
    TaskCategoryIdEq(i64),
}

impl Predicate {
    /// Substring predicates are case-sensitive containment checks
    pub fn matches(&self, task: &Task) -> bool {
        match self {
            Self::Always => true,
            Self::IdEq(id) => task.id == *id,
            Self::NameContains(needle) => task.name.contains(needle.as_str()),
            Self::DescriptionContains(needle) => task.description.contains(needle.as_str()),
            Self::StatusContains(needle) => task.status.as_str().contains(needle.as_str()),
            Self::AuthorIdEq(id) => task.author_id == *id,
            Self::TaskCategoryIdEq(id) => task.task_category_id == *id,
        }
    }
}

/// Sortable task columns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortField {
    #[default]
    Id,
    Name,
    Description,
    Status,
    StartDate,
    EndDate,
    AuthorId,
    TaskCategoryId,
    CreatedAt,
    UpdatedAt,
}

impl SortField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Description => "description",
            Self::Status => "status",
            Self::StartDate => "start_date",
            Self::EndDate => "end_date",
            Self::AuthorId => "author_id",
            Self::TaskCategoryId => "task_category_id",
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
        }
    }

    fn compare(self, left: &Task, right: &Task) -> Ordering {
        match self {
            Self::Id => left.id.cmp(&right.id),
            Self::Name => left.name.cmp(&right.name),
            Self::Description => left.description.cmp(&right.description),
            Self::Status => left.status.as_str().cmp(right.status.as_str()),
            Self::StartDate => left.start_date.cmp(&right.start_date),
            Self::EndDate => left.end_date.cmp(&right.end_date),
            Self::AuthorId => left.author_id.cmp(&right.author_id),
            Self::TaskCategoryId => left.task_category_id.cmp(&right.task_category_id),
            Self::CreatedAt => left.created_at.cmp(&right.created_at),
            Self::UpdatedAt => left.updated_at.cmp(&right.updated_at),
        }
    }
}

impl FromStr for SortField {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim() {
            "id" => Ok(Self::Id),
            "name" => Ok(Self::Name),
            "description" => Ok(Self::Description),
            "status" => Ok(Self::Status),
            "start_date" => Ok(Self::StartDate),
            "end_date" => Ok(Self::EndDate),
            "author_id" => Ok(Self::AuthorId),
            "task_category_id" => Ok(Self::TaskCategoryId),
            "created_at" => Ok(Self::CreatedAt),
            "updated_at" => Ok(Self::UpdatedAt),
            other => Err(Error::validation(format!(
                "filter 'field' does not allow sorting by '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortOrder {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(Error::validation(format!(
                "filter 'order' must be 'asc' or 'desc', got '{}'",
                value
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sort {
    pub field: SortField,
    pub order: SortOrder,
}

impl Sort {
    /// Ties on the sort field fall back to ascending id
    pub fn compare(&self, left: &Task, right: &Task) -> Ordering {
        let primary = match self.order {
            SortOrder::Asc => self.field.compare(left, right),
            SortOrder::Desc => self.field.compare(right, left),
        };
        primary.then_with(|| left.id.cmp(&right.id))
    }
}

/// A built listing query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskQuery {
    pub predicates: Vec<Predicate>,
    pub sort: Sort,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl TaskQuery {
    pub fn matches(&self, task: &Task) -> bool {
        self.predicates.iter().all(|predicate| predicate.matches(task))
    }

    /// Filter, order and page a set of candidate rows
    pub fn evaluate<'a>(&self, rows: impl IntoIterator<Item = &'a Task>) -> Vec<Task> {
        let mut matched: Vec<&Task> = rows.into_iter().filter(|task| self.matches(task)).collect();
        matched.sort_by(|left, right| self.sort.compare(left, right));
        matched
            .into_iter()
            .skip(self.offset)
            .take(self.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }
}
