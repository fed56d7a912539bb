//! The list controller: owns the visible page of todos and every piece of
//! view state around it, and reconciles that state with the todo service
//! after each fetch or mutation.
//!
//! State lives behind one async mutex, and is written only after a remote
//! call completes. Calls never hold the lock while awaiting the service.

use std::sync::Arc;

use shared::{
    domain::{StatsSnapshot, Todo, TodoId, User, UserRef},
    protocol::{CreateTodoRequest, ListTodosQuery, UpdateTodoRequest},
};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::{
    config::Settings,
    debounce::Debouncer,
    editor::completion_toggle,
    error::{ControllerError, ErrorContext, ServiceError},
    filters::{list_query, FilterConfig, FilterEdit, PageControls, Pagination, SortConfig},
    modal::{ScrollLock, ScrollLockGuard},
    service::{HttpTodoService, TodoService, UserDirectory},
};

pub const DELETE_CONFIRMATION: &str = "Are you sure you want to delete this todo?";

/// Asks the user to confirm a destructive action.
pub trait ConfirmPrompt {
    fn confirm(&self, message: &str) -> bool;
}

impl<F> ConfirmPrompt for F
where
    F: Fn(&str) -> bool,
{
    fn confirm(&self, message: &str) -> bool {
        self(message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Declined,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    ListUpdated,
    StatsUpdated,
    HistoryUpdated,
    UsersUpdated,
    SelectionChanged(Option<TodoId>),
    CreateDialogChanged(bool),
    Error(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadingFlags {
    pub list: bool,
    pub filter: bool,
    pub history: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentionOption {
    pub value: String,
    pub label: String,
}

/// Render-ready copy of the controller state.
#[derive(Debug, Clone)]
pub struct ControllerSnapshot {
    pub todos: Vec<Todo>,
    pub selected: Option<Todo>,
    pub stats: Option<StatsSnapshot>,
    pub loading: LoadingFlags,
    pub error: Option<String>,
    pub filters: FilterConfig,
    pub pagination: Pagination,
    pub page_controls: PageControls,
    pub sort: SortConfig,
    pub history: Vec<Todo>,
    pub history_visible: bool,
    pub create_dialog_open: bool,
    pub users: Vec<User>,
}

struct DetailSession {
    todo: Todo,
    _scroll: ScrollLockGuard,
}

struct ControllerState {
    todos: Vec<Todo>,
    detail: Option<DetailSession>,
    create_dialog: Option<ScrollLockGuard>,
    stats: Option<StatsSnapshot>,
    loading: LoadingFlags,
    error: Option<String>,
    filters: FilterConfig,
    pagination: Pagination,
    sort: SortConfig,
    history: Vec<Todo>,
    history_visible: bool,
    history_stale: bool,
    users: Vec<User>,
    list_generation: u64,
    /// Bumped by every history dispatch and every mutation.
    history_generation: u64,
    /// Generation of the newest history dispatch.
    history_dispatched: u64,
}

impl ControllerState {
    fn new(page_size: u32) -> Self {
        Self {
            todos: Vec::new(),
            detail: None,
            create_dialog: None,
            stats: None,
            loading: LoadingFlags::default(),
            error: None,
            filters: FilterConfig::default(),
            pagination: Pagination::new(page_size),
            sort: SortConfig::default(),
            history: Vec::new(),
            history_visible: false,
            history_stale: true,
            users: Vec::new(),
            list_generation: 0,
            history_generation: 0,
            history_dispatched: 0,
        }
    }

    fn cached_todo(&self, id: &TodoId) -> Option<&Todo> {
        self.todos
            .iter()
            .chain(self.history.iter())
            .find(|t| &t.id == id)
    }

    fn selected_id(&self) -> Option<&TodoId> {
        self.detail.as_ref().map(|d| &d.todo.id)
    }
}

pub struct ListController {
    service: Arc<dyn TodoService>,
    directory: Arc<dyn UserDirectory>,
    history_limit: u32,
    debouncer: Debouncer,
    scroll_lock: ScrollLock,
    inner: Mutex<ControllerState>,
    events: broadcast::Sender<ControllerEvent>,
}

impl ListController {
    pub fn new(
        service: Arc<dyn TodoService>,
        directory: Arc<dyn UserDirectory>,
        settings: &Settings,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        Arc::new(Self {
            service,
            directory,
            history_limit: settings.history_limit.max(1),
            debouncer: Debouncer::new(settings.debounce()),
            scroll_lock: ScrollLock::new(),
            inner: Mutex::new(ControllerState::new(settings.page_size)),
            events,
        })
    }

    /// Controller backed by the REST service for both todos and users.
    pub fn connect(settings: &Settings) -> Result<Arc<Self>, ServiceError> {
        let http = Arc::new(HttpTodoService::new(settings)?);
        Ok(Self::new(http.clone(), http, settings))
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    pub fn scroll_lock(&self) -> &ScrollLock {
        &self.scroll_lock
    }

    fn emit(&self, event: ControllerEvent) {
        let _ = self.events.send(event);
    }

    /// Initial load: list, stats and user directory side by side.
    pub async fn mount(&self) {
        let _ = futures::join!(self.refresh_list(), self.refresh_stats(), self.load_users());
    }

    /// Closes every modal and drops pending debounced work.
    pub async fn unmount(&self) {
        self.debouncer.cancel();
        let mut state = self.inner.lock().await;
        state.detail = None;
        state.create_dialog = None;
    }

    pub async fn snapshot(&self) -> ControllerSnapshot {
        let state = self.inner.lock().await;
        ControllerSnapshot {
            todos: state.todos.clone(),
            selected: state.detail.as_ref().map(|d| d.todo.clone()),
            stats: state.stats,
            loading: state.loading,
            error: state.error.clone(),
            filters: state.filters.clone(),
            pagination: state.pagination,
            page_controls: state.pagination.controls(),
            sort: state.sort,
            history: state.history.clone(),
            history_visible: state.history_visible,
            create_dialog_open: state.create_dialog.is_some(),
            users: state.users.clone(),
        }
    }

    /// Fetches the page for the current (pagination, sort, filter) tuple.
    ///
    /// Each dispatch takes a new generation; a response that resolves after a
    /// newer dispatch is dropped without touching state.
    pub async fn refresh_list(&self) -> Result<(), ControllerError> {
        let (generation, query) = {
            let mut state = self.inner.lock().await;
            state.list_generation += 1;
            state.loading.list = true;
            let query = list_query(&state.pagination, &state.sort, &state.filters);
            (state.list_generation, query)
        };
        debug!(generation, page = query.page, limit = query.limit, "fetching todo list");

        let result = self.service.list_todos(&query).await;

        let mut state = self.inner.lock().await;
        if generation != state.list_generation {
            debug!(
                generation,
                latest = state.list_generation,
                "discarding superseded todo list response"
            );
            return Ok(());
        }
        state.loading.list = false;

        match result {
            Ok(page) => {
                let mut todos = page.items;
                resolve_mentions(&mut todos, &state.users);
                state.todos = todos;
                state.pagination.apply_server(page.info);
                state.error = None;
                drop(state);
                self.emit(ControllerEvent::ListUpdated);
                Ok(())
            }
            Err(err) => {
                let err = ControllerError::from_service(ErrorContext::ListTodos, &err);
                warn!(error = %err, generation, "todo list fetch failed; keeping previous page");
                state.error = Some(err.user_message().to_string());
                drop(state);
                self.emit(ControllerEvent::Error(err.user_message().to_string()));
                Err(err)
            }
        }
    }

    /// Stats failures are logged only; the previous snapshot (if any) stays.
    pub async fn refresh_stats(&self) -> Result<(), ControllerError> {
        match self.service.stats().await {
            Ok(stats) => {
                self.inner.lock().await.stats = Some(stats);
                self.emit(ControllerEvent::StatsUpdated);
                Ok(())
            }
            Err(err) => {
                let err = ControllerError::from_service(ErrorContext::Stats, &err);
                warn!(error = %err, "stats fetch failed");
                Err(err)
            }
        }
    }

    pub async fn load_users(&self) -> Result<(), ControllerError> {
        match self.directory.list_users().await {
            Ok(users) => {
                let mut state = self.inner.lock().await;
                let ControllerState {
                    todos,
                    history,
                    users: cached,
                    ..
                } = &mut *state;
                *cached = users;
                resolve_mentions(todos, cached);
                resolve_mentions(history, cached);
                drop(state);
                self.emit(ControllerEvent::UsersUpdated);
                Ok(())
            }
            Err(err) => {
                let err = ControllerError::from_service(ErrorContext::Users, &err);
                warn!(error = %err, "user directory fetch failed");
                Err(err)
            }
        }
    }

    /// Fetches the completed history. A response is applied only when no
    /// newer dispatch or mutation happened while it was in flight.
    pub async fn refresh_history(&self) -> Result<(), ControllerError> {
        let generation = {
            let mut state = self.inner.lock().await;
            state.history_generation += 1;
            state.history_dispatched = state.history_generation;
            state.loading.history = true;
            state.history_generation
        };
        let query = ListTodosQuery::completed_history(self.history_limit);
        let result = self.service.list_todos(&query).await;

        let mut state = self.inner.lock().await;
        if generation == state.history_dispatched {
            state.loading.history = false;
        }
        if generation != state.history_generation {
            debug!(
                generation,
                latest = state.history_generation,
                "discarding outdated history response"
            );
            return Ok(());
        }
        match result {
            Ok(page) => {
                let mut history = page.items;
                resolve_mentions(&mut history, &state.users);
                state.history = history;
                state.history_stale = false;
                drop(state);
                self.emit(ControllerEvent::HistoryUpdated);
                Ok(())
            }
            Err(err) => {
                let err = ControllerError::from_service(ErrorContext::History, &err);
                warn!(error = %err, "completed history fetch failed");
                Err(err)
            }
        }
    }

    /// Shows or hides the completed-history panel; returns the new visibility.
    ///
    /// Opening fetches only when the cached history is stale.
    pub async fn toggle_history(&self) -> bool {
        let (visible, fetch) = {
            let mut state = self.inner.lock().await;
            state.history_visible = !state.history_visible;
            (
                state.history_visible,
                state.history_visible && state.history_stale,
            )
        };
        if fetch {
            let _ = self.refresh_history().await;
        }
        visible
    }

    /// Applies one filter edit and returns to the first page.
    ///
    /// Free-text fields go through the quiet window; the rest fetch at once.
    pub async fn set_filter(self: &Arc<Self>, edit: FilterEdit) {
        let text = edit.is_text();
        let field = edit.field();
        {
            let mut state = self.inner.lock().await;
            state.filters.apply(edit);
            state.pagination.reset_page();
        }
        debug!(field, debounced = text, "filter changed");

        if text {
            self.schedule_filter_fetch();
        } else {
            self.debouncer.cancel();
            let _ = self.refresh_list().await;
        }
    }

    /// Replaces every filter at once and fetches immediately.
    pub async fn replace_filters(&self, filters: FilterConfig) {
        {
            let mut state = self.inner.lock().await;
            state.filters = filters;
            state.pagination.reset_page();
        }
        self.debouncer.cancel();
        let _ = self.refresh_list().await;
    }

    fn schedule_filter_fetch(self: &Arc<Self>) {
        let ticket = self.debouncer.schedule();
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            if !controller.debouncer.settle(ticket).await {
                return;
            }
            controller.inner.lock().await.loading.filter = true;
            let _ = controller.refresh_list().await;
            controller.inner.lock().await.loading.filter = false;
        });
    }

    pub async fn set_sort(&self, sort: SortConfig) {
        self.inner.lock().await.sort = sort;
        self.debouncer.cancel();
        let _ = self.refresh_list().await;
    }

    pub async fn set_page(&self, page: u32) {
        self.inner.lock().await.pagination.set_page(page);
        self.debouncer.cancel();
        let _ = self.refresh_list().await;
    }

    /// Returns false, without fetching, when already on the last page.
    pub async fn next_page(&self) -> bool {
        if !self.inner.lock().await.pagination.next() {
            return false;
        }
        self.debouncer.cancel();
        let _ = self.refresh_list().await;
        true
    }

    pub async fn previous_page(&self) -> bool {
        if !self.inner.lock().await.pagination.previous() {
            return false;
        }
        self.debouncer.cancel();
        let _ = self.refresh_list().await;
        true
    }

    pub async fn set_page_size(&self, limit: u32) {
        self.inner.lock().await.pagination.set_limit(limit);
        self.debouncer.cancel();
        let _ = self.refresh_list().await;
    }

    /// Opens the detail view for a cached todo. Returns false if it is not cached.
    pub async fn select_todo(&self, id: &TodoId) -> bool {
        let mut state = self.inner.lock().await;
        let Some(todo) = state.cached_todo(id).cloned() else {
            return false;
        };
        // Replacing an open session drops its guard before the new one counts.
        state.detail = None;
        state.detail = Some(DetailSession {
            todo,
            _scroll: self.scroll_lock.acquire("detail"),
        });
        drop(state);
        self.emit(ControllerEvent::SelectionChanged(Some(id.clone())));
        true
    }

    pub async fn close_detail(&self) {
        let closed = self.inner.lock().await.detail.take().is_some();
        if closed {
            self.emit(ControllerEvent::SelectionChanged(None));
        }
    }

    pub async fn selected(&self) -> Option<Todo> {
        self.inner
            .lock()
            .await
            .detail
            .as_ref()
            .map(|d| d.todo.clone())
    }

    pub async fn open_create_dialog(&self) {
        let mut state = self.inner.lock().await;
        if state.create_dialog.is_none() {
            state.create_dialog = Some(self.scroll_lock.acquire("create"));
            drop(state);
            self.emit(ControllerEvent::CreateDialogChanged(true));
        }
    }

    pub async fn close_create_dialog(&self) {
        let closed = self.inner.lock().await.create_dialog.take().is_some();
        if closed {
            self.emit(ControllerEvent::CreateDialogChanged(false));
        }
    }

    pub async fn mention_options(&self) -> Vec<MentionOption> {
        self.inner
            .lock()
            .await
            .users
            .iter()
            .map(|u| MentionOption {
                value: u.username.clone(),
                label: u.name.clone(),
            })
            .collect()
    }

    /// Creates a todo; the server's copy arrives with the follow-up refresh.
    ///
    /// On failure the creation dialog stays open.
    pub async fn create_todo(&self, request: CreateTodoRequest) -> Result<Todo, ControllerError> {
        match self.service.create_todo(&request).await {
            Ok(todo) => {
                info!(todo = %todo.id, "todo created");
                self.close_create_dialog().await;
                self.refresh_after_mutation().await;
                Ok(todo)
            }
            Err(err) => Err(self
                .record_mutation_error(ErrorContext::CreateTodo, &err)
                .await),
        }
    }

    /// Saves an edit. A successful save of the open todo ends its edit session.
    pub async fn update_todo(
        &self,
        id: &TodoId,
        request: UpdateTodoRequest,
    ) -> Result<Todo, ControllerError> {
        match self.service.update_todo(id, &request).await {
            Ok(todo) => {
                info!(todo = %id, "todo updated");
                let closed = {
                    let mut state = self.inner.lock().await;
                    if state.selected_id() == Some(id) {
                        state.detail = None;
                        true
                    } else {
                        false
                    }
                };
                if closed {
                    self.emit(ControllerEvent::SelectionChanged(None));
                }
                self.refresh_after_mutation().await;
                Ok(todo)
            }
            Err(err) => Err(self
                .record_mutation_error(ErrorContext::UpdateTodo, &err)
                .await),
        }
    }

    /// The complete/reopen shortcut on a cached todo.
    pub async fn toggle_completed(&self, id: &TodoId) -> Result<Todo, ControllerError> {
        let request = {
            let state = self.inner.lock().await;
            state.cached_todo(id).map(completion_toggle)
        };
        let Some(request) = request else {
            return Err(ControllerError::new(
                ErrorContext::UpdateTodo,
                format!("todo {id} is not in the current view"),
            ));
        };
        self.update_todo(id, request).await
    }

    /// Deletes after confirmation. Declining makes no service call.
    pub async fn delete_todo(
        &self,
        id: &TodoId,
        prompt: &dyn ConfirmPrompt,
    ) -> Result<DeleteOutcome, ControllerError> {
        if !prompt.confirm(DELETE_CONFIRMATION) {
            debug!(todo = %id, "delete declined");
            return Ok(DeleteOutcome::Declined);
        }

        match self.service.delete_todo(id).await {
            Ok(()) => {
                info!(todo = %id, "todo deleted");
                let cleared = {
                    let mut state = self.inner.lock().await;
                    if state.selected_id() == Some(id) {
                        state.detail = None;
                        true
                    } else {
                        false
                    }
                };
                if cleared {
                    self.emit(ControllerEvent::SelectionChanged(None));
                }
                self.refresh_after_mutation().await;
                Ok(DeleteOutcome::Deleted)
            }
            Err(err) => Err(self
                .record_mutation_error(ErrorContext::DeleteTodo, &err)
                .await),
        }
    }

    async fn record_mutation_error(
        &self,
        context: ErrorContext,
        err: &ServiceError,
    ) -> ControllerError {
        let err = ControllerError::from_service(context, err);
        warn!(error = %err, "mutation failed");
        self.inner.lock().await.error = Some(err.user_message().to_string());
        self.emit(ControllerEvent::Error(err.user_message().to_string()));
        err
    }

    /// List and stats always; history only while its panel is open,
    /// otherwise it is marked stale for the next open.
    async fn refresh_after_mutation(&self) {
        let history_visible = {
            let mut state = self.inner.lock().await;
            state.history_generation += 1;
            if !state.history_visible {
                state.history_stale = true;
            }
            state.history_visible
        };
        if history_visible {
            let _ = futures::join!(
                self.refresh_list(),
                self.refresh_stats(),
                self.refresh_history()
            );
        } else {
            let _ = futures::join!(self.refresh_list(), self.refresh_stats());
        }
    }
}

/// Upgrades identifier-only mentions and note authors with directory entries.
fn resolve_mentions(todos: &mut [Todo], users: &[User]) {
    if users.is_empty() {
        return;
    }
    for todo in todos.iter_mut() {
        for mention in &mut todo.mentions {
            upgrade_user_ref(mention, users);
        }
        for note in &mut todo.notes {
            if let Some(author) = note.created_by.as_mut() {
                upgrade_user_ref(author, users);
            }
        }
    }
}

fn upgrade_user_ref(user_ref: &mut UserRef, users: &[User]) {
    if !user_ref.is_bare() {
        return;
    }
    let key = user_ref.id.as_str();
    if let Some(user) = users.iter().find(|u| u.matches(key)) {
        *user_ref = UserRef::from(user);
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
