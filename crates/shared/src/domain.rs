use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

id_newtype!(TodoId);
id_newtype!(UserId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    #[default]
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown priority '{0}' (expected low, medium or high)")]
pub struct UnknownPriority(pub String);

impl FromStr for Priority {
    type Err = UnknownPriority;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            _ => Err(UnknownPriority(s.to_string())),
        }
    }
}

/// A reference to a user as embedded in a todo: a mention or a note author.
///
/// The service sends these either as a bare identifier or as a populated
/// record. Both shapes are folded into this one struct while deserializing,
/// so nothing downstream has to inspect the wire shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "WireUserRef")]
pub struct UserRef {
    pub id: UserId,
    pub username: String,
    pub name: String,
}

pub type Mention = UserRef;

impl UserRef {
    /// A reference known only by its identifier.
    pub fn bare(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            id: UserId(id.clone()),
            username: id.clone(),
            name: id,
        }
    }

    /// Whether only the identifier is known, i.e. display fields were filled from it.
    pub fn is_bare(&self) -> bool {
        self.username == self.id.0 && self.name == self.id.0
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireUserRef {
    Id(String),
    Record {
        #[serde(alias = "_id")]
        id: String,
        #[serde(default)]
        username: Option<String>,
        #[serde(default)]
        name: Option<String>,
    },
}

impl From<WireUserRef> for UserRef {
    fn from(value: WireUserRef) -> Self {
        match value {
            WireUserRef::Id(id) => UserRef::bare(id),
            WireUserRef::Record { id, username, name } => {
                let username = username.unwrap_or_else(|| id.clone());
                let name = name.unwrap_or_else(|| username.clone());
                UserRef {
                    id: UserId(id),
                    username,
                    name,
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(alias = "_id")]
    pub id: UserId,
    pub username: String,
    pub name: String,
}

impl User {
    /// Whether `key` names this user, by identifier or by username.
    pub fn matches(&self, key: &str) -> bool {
        self.id.0 == key || self.username == key
    }
}

impl From<&User> for UserRef {
    fn from(user: &User) -> Self {
        UserRef {
            id: user.id.clone(),
            username: user.username.clone(),
            name: user.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<UserRef>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    #[serde(alias = "_id")]
    pub id: TodoId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub mentions: Vec<Mention>,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Vec<Note>,
}

/// Server-computed aggregate counts over the caller's todos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    #[serde(default)]
    pub total_todos: u64,
    #[serde(default)]
    pub completed_todos: u64,
    #[serde(default)]
    pub pending_todos: u64,
    #[serde(default)]
    pub high_priority: u64,
    #[serde(default)]
    pub medium_priority: u64,
    #[serde(default)]
    pub low_priority: u64,
}

impl StatsSnapshot {
    /// Share of completed todos as a whole percentage, rounded to nearest.
    pub fn completion_rate(&self) -> u8 {
        if self.total_todos == 0 {
            return 0;
        }
        let rate = (self.completed_todos as f64 / self.total_todos as f64 * 100.0).round();
        rate.clamp(0.0, 100.0) as u8
    }
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
