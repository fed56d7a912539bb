//! Client-side state and service plumbing for the todo list view.
//!
//! [`ListController`] is the entry point: it holds the visible page, the
//! filter/sort/pagination configuration, modal state and the completed
//! history, and talks to the backend through [`TodoService`] and
//! [`UserDirectory`].

pub mod config;
pub mod controller;
pub mod debounce;
pub mod editor;
pub mod error;
pub mod filters;
pub mod modal;
pub mod service;

pub use config::{load_settings, ConfigError, Settings};
pub use controller::{
    ConfirmPrompt, ControllerEvent, ControllerSnapshot, DeleteOutcome, ListController,
    LoadingFlags, MentionOption, DELETE_CONFIRMATION,
};
pub use editor::{DraftError, TodoDraft};
pub use error::{ControllerError, ErrorContext, ErrorKind, ServiceError};
pub use filters::{FilterConfig, FilterEdit, PageControls, Pagination, SortConfig};
pub use modal::{ScrollLock, ScrollLockGuard};
pub use service::{HttpTodoService, MissingUserDirectory, Page, TodoService, UserDirectory};
