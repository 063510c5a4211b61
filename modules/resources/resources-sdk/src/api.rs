//! `ResourceStore` trait definition.

use async_trait::async_trait;

use crate::error::ResourceError;
use crate::models::{MoveDirection, NewResource, Resource, ResourcePage, ResourceQuery};

/// Behavioral contract shared by every resource store.
///
/// Implementations differ only in how they reach the database; given the same
/// starting data they return the same rows, in the same order, with the same
/// totals.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Insert a new row and return it as stored, with its assigned id and
    /// creation timestamp.
    ///
    /// # Errors
    ///
    /// * `Database` - If the insert or the read-back fails
    async fn add(&self, resource: NewResource) -> Result<Resource, ResourceError>;

    /// Fetch one row by id.
    ///
    /// # Errors
    ///
    /// * `Database` - If the query fails
    async fn get(&self, id: i32) -> Result<Option<Resource>, ResourceError>;

    /// All rows of every application, newest id first.
    ///
    /// # Errors
    ///
    /// * `Database` - If the query fails
    async fn list_all(&self) -> Result<Vec<Resource>, ResourceError>;

    /// Rows of one application ordered by group order, alias, then id.
    ///
    /// # Errors
    ///
    /// * `Database` - If the query fails
    async fn list_by_app(&self, app_name: &str) -> Result<Vec<Resource>, ResourceError>;

    /// Replace every mutable field of the row with `resource.id`.
    ///
    /// Creation audit fields are kept; the modification timestamp is set to
    /// the current time. Returns `false` when no such row exists.
    ///
    /// # Errors
    ///
    /// * `Database` - If the update fails
    async fn update(&self, resource: &Resource) -> Result<bool, ResourceError>;

    /// Remove the row. Returns `false` when no such row exists.
    ///
    /// # Errors
    ///
    /// * `Database` - If the delete fails
    async fn delete(&self, id: i32) -> Result<bool, ResourceError>;

    /// One page of rows matching `query`, plus the total number of matches.
    ///
    /// # Errors
    ///
    /// * `Database` - If either the count or the page query fails
    async fn search(&self, query: &ResourceQuery) -> Result<ResourcePage, ResourceError>;

    /// Swap the display order of a row with its nearest neighbor in the
    /// same application.
    ///
    /// Returns `false` without changing anything when the row does not exist,
    /// has no display order, or is already first (`Up`) or last (`Down`).
    ///
    /// # Errors
    ///
    /// * `ReorderConflict` - If a concurrent reorder touched either row
    /// * `Database` - If a statement fails
    async fn reorder(&self, id: i32, direction: MoveDirection) -> Result<bool, ResourceError>;

    /// Shorthand for [`reorder`](Self::reorder) with [`MoveDirection::Up`].
    ///
    /// # Errors
    ///
    /// Same as [`reorder`](Self::reorder).
    async fn move_up(&self, id: i32) -> Result<bool, ResourceError> {
        self.reorder(id, MoveDirection::Up).await
    }

    /// Shorthand for [`reorder`](Self::reorder) with [`MoveDirection::Down`].
    ///
    /// # Errors
    ///
    /// Same as [`reorder`](Self::reorder).
    async fn move_down(&self, id: i32) -> Result<bool, ResourceError> {
        self.reorder(id, MoveDirection::Down).await
    }
}
