//! Filter, sort and pagination configuration of the list view.

use std::fmt;

use shared::{
    domain::Priority,
    protocol::{ListTodosQuery, PageInfo, SortKey, SortOrder},
};

/// Numbered page buttons shown at most.
pub const MAX_PAGE_BUTTONS: u32 = 5;

/// Active list constraints. `None` means the field does not constrain the list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterConfig {
    pub priority: Option<Priority>,
    pub tag: Option<String>,
    pub mention: Option<String>,
    pub completed: Option<bool>,
    pub search: Option<String>,
}

impl FilterConfig {
    pub fn is_empty(&self) -> bool {
        *self == FilterConfig::default()
    }

    /// Applies one edit; returns whether the stored value changed.
    pub fn apply(&mut self, edit: FilterEdit) -> bool {
        match edit {
            FilterEdit::Priority(v) => replace(&mut self.priority, v),
            FilterEdit::Tag(v) => replace(&mut self.tag, v),
            FilterEdit::Mention(v) => replace(&mut self.mention, v),
            FilterEdit::Completed(v) => replace(&mut self.completed, v),
            FilterEdit::Search(v) => replace(&mut self.search, v),
        }
    }
}

fn replace<T: PartialEq>(slot: &mut Option<T>, value: Option<T>) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}

/// A change to a single filter field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterEdit {
    Priority(Option<Priority>),
    Tag(Option<String>),
    Mention(Option<String>),
    Completed(Option<bool>),
    Search(Option<String>),
}

impl FilterEdit {
    pub fn tag(input: &str) -> Self {
        FilterEdit::Tag(text_value(input))
    }

    pub fn mention(input: &str) -> Self {
        FilterEdit::Mention(text_value(input))
    }

    pub fn search(input: &str) -> Self {
        FilterEdit::Search(text_value(input))
    }

    /// Free-text fields are applied after the quiet window, the rest at once.
    pub fn is_text(&self) -> bool {
        matches!(
            self,
            FilterEdit::Tag(_) | FilterEdit::Mention(_) | FilterEdit::Search(_)
        )
    }

    pub fn field(&self) -> &'static str {
        match self {
            FilterEdit::Priority(_) => "priority",
            FilterEdit::Tag(_) => "tag",
            FilterEdit::Mention(_) => "mention",
            FilterEdit::Completed(_) => "completed",
            FilterEdit::Search(_) => "search",
        }
    }
}

/// Raw input box contents; blank input clears the field.
fn text_value(input: &str) -> Option<String> {
    if input.trim().is_empty() {
        None
    } else {
        Some(input.to_string())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortConfig {
    pub key: SortKey,
    pub order: SortOrder,
}

impl SortConfig {
    pub fn new(key: SortKey, order: SortOrder) -> Self {
        Self { key, order }
    }

    /// Parses the selector token form, e.g. `createdAt-desc`.
    pub fn parse_token(token: &str) -> Option<Self> {
        let (key, order) = token.split_once('-')?;
        Some(Self {
            key: key.parse().ok()?,
            order: order.parse().ok()?,
        })
    }
}

impl fmt::Display for SortConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.key, self.order)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

impl Pagination {
    pub fn new(limit: u32) -> Self {
        Self {
            page: 1,
            limit: limit.max(1),
            total_pages: 1,
        }
    }

    fn last_page(&self) -> u32 {
        self.total_pages.max(1)
    }

    pub fn reset_page(&mut self) {
        self.page = 1;
    }

    pub fn set_page(&mut self, page: u32) {
        self.page = page.clamp(1, self.last_page());
    }

    pub fn next(&mut self) -> bool {
        if self.page >= self.last_page() {
            return false;
        }
        self.page += 1;
        true
    }

    pub fn previous(&mut self) -> bool {
        if self.page <= 1 {
            return false;
        }
        self.page -= 1;
        true
    }

    pub fn set_limit(&mut self, limit: u32) {
        self.limit = limit.max(1);
        self.page = 1;
    }

    /// Adopts the totals reported with a completed fetch.
    pub fn apply_server(&mut self, info: PageInfo) {
        self.page = info.page.max(1);
        self.limit = info.limit.max(1);
        self.total_pages = info.total_pages;
    }

    pub fn controls(&self) -> PageControls {
        let last = self.last_page();
        PageControls {
            visible: last > 1,
            pages: (1..=last.min(MAX_PAGE_BUTTONS)).collect(),
            current: self.page,
            previous_enabled: self.page > 1,
            next_enabled: self.page < last,
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(10)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageControls {
    pub visible: bool,
    pub pages: Vec<u32>,
    pub current: u32,
    pub previous_enabled: bool,
    pub next_enabled: bool,
}

pub fn list_query(
    pagination: &Pagination,
    sort: &SortConfig,
    filters: &FilterConfig,
) -> ListTodosQuery {
    ListTodosQuery {
        page: pagination.page,
        limit: pagination.limit,
        sort_by: sort.key,
        sort_order: sort.order,
        priority: filters.priority,
        tag: filters.tag.clone(),
        mention: filters.mention.clone(),
        completed: filters.completed,
        search: filters.search.clone(),
    }
}

#[cfg(test)]
#[path = "tests/filters_tests.rs"]
mod tests;
