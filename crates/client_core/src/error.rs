//! Failures of remote calls and how the controller reports them.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("service responded {status}: {message}")]
    Status { status: u16, message: String },
    #[error("unexpected response body: {0}")]
    Decode(String),
    #[error("{0}")]
    Other(String),
}

impl ServiceError {
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

/// Whether a failure happened while loading or while changing data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Fetch,
    Mutation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorContext {
    ListTodos,
    Stats,
    History,
    Users,
    CreateTodo,
    UpdateTodo,
    DeleteTodo,
}

impl ErrorContext {
    pub fn kind(self) -> ErrorKind {
        match self {
            ErrorContext::ListTodos
            | ErrorContext::Stats
            | ErrorContext::History
            | ErrorContext::Users => ErrorKind::Fetch,
            ErrorContext::CreateTodo | ErrorContext::UpdateTodo | ErrorContext::DeleteTodo => {
                ErrorKind::Mutation
            }
        }
    }

    /// Message shown to the user for a failure in this context.
    pub fn user_message(self) -> &'static str {
        match self {
            ErrorContext::ListTodos => "Error fetching todos",
            ErrorContext::Stats => "Error fetching stats",
            ErrorContext::History => "Error fetching completed todos",
            ErrorContext::Users => "Error fetching users",
            ErrorContext::CreateTodo => "Error creating todo",
            ErrorContext::UpdateTodo => "Error updating todo",
            ErrorContext::DeleteTodo => "Error deleting todo",
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("{}: {detail}", context.user_message())]
pub struct ControllerError {
    context: ErrorContext,
    detail: String,
}

impl ControllerError {
    pub fn new(context: ErrorContext, detail: impl Into<String>) -> Self {
        Self {
            context,
            detail: detail.into(),
        }
    }

    pub fn from_service(context: ErrorContext, err: &ServiceError) -> Self {
        Self::new(context, err.to_string())
    }

    pub fn kind(&self) -> ErrorKind {
        self.context.kind()
    }

    pub fn context(&self) -> ErrorContext {
        self.context
    }

    pub fn user_message(&self) -> &'static str {
        self.context.user_message()
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }
}
