//! Task category model definitions

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCategory {
    pub id: i64,
    pub name: String,
}

/// Caller-supplied category fields
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CategoryInput {
    pub name: String,
}

impl CategoryInput {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Trim the name and reject it when empty
    pub fn normalized(self) -> Result<Self> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(Error::validation("name is a required field"));
        }
        Ok(Self {
            name: name.to_string(),
        })
    }
}
