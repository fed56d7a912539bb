//! Working copies behind the creation form and the detail editor.

use shared::{
    domain::{Priority, Todo},
    protocol::{CreateTodoRequest, UpdateTodoRequest},
};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftError {
    #[error("title must not be empty")]
    EmptyTitle,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoDraft {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub tags: Vec<String>,
    /// Usernames of the mentioned users.
    pub mentions: Vec<String>,
}

impl TodoDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_todo(todo: &Todo) -> Self {
        Self {
            title: todo.title.clone(),
            description: todo.description.clone(),
            priority: todo.priority,
            tags: todo.tags.clone(),
            mentions: todo.mentions.iter().map(|m| m.username.clone()).collect(),
        }
    }

    /// Discards edits by reseeding from the stored todo.
    pub fn reset_from(&mut self, todo: &Todo) {
        *self = Self::from_todo(todo);
    }

    /// Adds a tag from raw input. Blank input and repeats are ignored.
    pub fn add_tag(&mut self, input: &str) -> bool {
        let tag = input.trim();
        if tag.is_empty() || self.tags.iter().any(|t| t == tag) {
            return false;
        }
        self.tags.push(tag.to_string());
        true
    }

    pub fn remove_tag(&mut self, tag: &str) -> bool {
        let before = self.tags.len();
        self.tags.retain(|t| t != tag);
        self.tags.len() != before
    }

    /// Adds the username if absent, removes it otherwise. Returns whether it is now mentioned.
    pub fn toggle_mention(&mut self, username: &str) -> bool {
        if let Some(pos) = self.mentions.iter().position(|m| m == username) {
            self.mentions.remove(pos);
            false
        } else {
            self.mentions.push(username.to_string());
            true
        }
    }

    pub fn validate(&self) -> Result<(), DraftError> {
        if self.title.trim().is_empty() {
            return Err(DraftError::EmptyTitle);
        }
        Ok(())
    }

    pub fn into_create_request(self) -> Result<CreateTodoRequest, DraftError> {
        self.validate()?;
        Ok(CreateTodoRequest {
            title: self.title.trim().to_string(),
            description: self.description,
            priority: self.priority,
            tags: self.tags,
            mentions: self.mentions,
        })
    }

    pub fn into_update_request(self) -> Result<UpdateTodoRequest, DraftError> {
        self.validate()?;
        Ok(UpdateTodoRequest {
            title: Some(self.title.trim().to_string()),
            description: Some(self.description),
            priority: Some(self.priority),
            tags: Some(self.tags),
            mentions: Some(self.mentions),
            completed: None,
        })
    }
}

/// Full field set of `todo` with the completion flag flipped.
pub fn completion_toggle(todo: &Todo) -> UpdateTodoRequest {
    let mut request = TodoDraft::from_todo(todo)
        .into_update_request()
        .unwrap_or_default();
    request.completed = Some(!todo.completed);
    request
}
