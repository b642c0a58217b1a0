//! User model definitions

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// User role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Manager,
    User,
}

impl Default for Role {
    fn default() -> Self {
        Self::User
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// A user row ready for insertion
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
}

impl NewUser {
    pub fn new(name: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            role,
        }
    }

    /// Validate and normalize before the row is stored
    pub fn normalized(self) -> Result<Self> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(Error::validation("name is a required field"));
        }
        Ok(Self {
            name,
            email: normalize_email(&self.email)
                .ok_or_else(|| Error::validation(format!("Invalid email '{}'", self.email)))?,
            role: self.role,
        })
    }
}

/// Trim and lowercase an email, rejecting anything without an `@`
pub fn normalize_email(email: &str) -> Option<String> {
    let normalized = email.trim().to_lowercase();
    if normalized.is_empty() || !normalized.contains('@') {
        return None;
    }
    Some(normalized)
}
