//! Public models for the resources module.
//!
//! These are transport-agnostic data structures shared by the store
//! implementations, the initializer, and their consumers.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Owning application assigned to rows that do not name one.
pub const DEFAULT_APP_NAME: &str = "ReportWriter";

/// A navigation/menu entry owned by one application.
///
/// Text columns that are NULL in storage read as empty strings, flags read
/// as their column defaults, and a NULL `step` reads as `0`. The two order
/// columns stay optional: a row with no display order cannot be moved.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: i32,
    pub alias: String,
    pub route: String,
    pub title: String,
    pub description: String,
    pub sysop_user_id: Option<String>,
    pub is_public: bool,
    pub group_name: Option<String>,
    pub group_order: Option<i32>,
    pub display_order: Option<i32>,
    /// Legacy notification flag, stored but never acted on.
    pub mail_enable: bool,
    pub show_list: bool,
    pub main_show_list: bool,
    pub header_html: Option<String>,
    pub footer_html: Option<String>,
    pub app_name: String,
    /// Hierarchy depth, `0` for root entries.
    pub step: i32,
    pub created_by: Option<String>,
    pub created: Option<DateTime<FixedOffset>>,
    pub modified_by: Option<String>,
    pub modified: Option<DateTime<FixedOffset>>,
}

/// Insert payload for [`ResourceStore::add`](crate::ResourceStore::add).
///
/// `Default` mirrors the column defaults of the `Resources` table.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewResource {
    pub alias: String,
    pub route: String,
    pub title: String,
    pub description: String,
    pub sysop_user_id: Option<String>,
    pub is_public: bool,
    pub group_name: Option<String>,
    pub group_order: i32,
    pub display_order: i32,
    pub mail_enable: bool,
    pub show_list: bool,
    pub main_show_list: bool,
    pub header_html: Option<String>,
    pub footer_html: Option<String>,
    pub app_name: String,
    pub step: i32,
    pub created_by: Option<String>,
}

impl Default for NewResource {
    fn default() -> Self {
        Self {
            alias: String::new(),
            route: String::new(),
            title: String::new(),
            description: String::new(),
            sysop_user_id: None,
            is_public: true,
            group_name: None,
            group_order: 0,
            display_order: 0,
            mail_enable: false,
            show_list: true,
            main_show_list: true,
            header_html: None,
            footer_html: None,
            app_name: DEFAULT_APP_NAME.to_owned(),
            step: 0,
            created_by: None,
        }
    }
}

/// Search and paging parameters.
///
/// # Example
///
/// ```
/// use resources_sdk::ResourceQuery;
///
/// // Second page of ten, every application, newest first
/// let query = ResourceQuery::new(1, 10);
///
/// // First five rows of one application mentioning "admin"
/// let query = ResourceQuery::new(0, 5)
///     .in_app("VisualAcademy")
///     .with_search("admin");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceQuery {
    /// Restricts the result to one owning application and switches the
    /// ordering to group order, alias, id.
    pub app_name: Option<String>,

    /// Case-insensitive substring matched against title and description.
    /// Blank text means no filter.
    pub search: Option<String>,

    /// Zero-based page number.
    pub page_index: u64,

    /// Rows per page. `0` yields an empty page that still carries the total.
    pub page_size: u64,
}

impl ResourceQuery {
    /// Creates an unfiltered query for one page.
    #[must_use]
    pub const fn new(page_index: u64, page_size: u64) -> Self {
        Self {
            app_name: None,
            search: None,
            page_index,
            page_size,
        }
    }

    /// Sets the free-text filter.
    #[must_use]
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    /// Scopes the query to one owning application.
    #[must_use]
    pub fn in_app(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = Some(app_name.into());
        self
    }

    /// Number of rows skipped before the page starts.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.page_index.saturating_mul(self.page_size)
    }
}

impl Default for ResourceQuery {
    fn default() -> Self {
        Self::new(0, 10)
    }
}

/// One page of search results plus the filtered total.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResourcePage {
    pub items: Vec<Resource>,
    pub total_count: u64,
}

/// Direction of a single reorder step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveDirection {
    /// Towards smaller display order.
    Up,
    /// Towards larger display order.
    Down,
}
