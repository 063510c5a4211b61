//! Resources SDK
//!
//! This crate provides the public contract of the `resources` module:
//! - `ResourceStore` trait implemented by every storage strategy
//! - `Resource`, `NewResource` and the search/paging types
//! - `ResourceError` for error handling
//!
//! ## Usage
//!
//! ```ignore
//! use resources_sdk::{ResourceQuery, ResourceStore};
//!
//! let page = store
//!     .search(&ResourceQuery::new(0, 10).in_app("VisualAcademy").with_search("admin"))
//!     .await?;
//! println!("{} of {}", page.items.len(), page.total_count);
//!
//! if !store.move_up(page.items[0].id).await? {
//!     println!("already first");
//! }
//! ```

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

pub mod api;
pub mod error;
pub mod models;

pub use api::ResourceStore;
pub use error::ResourceError;
pub use models::{
    DEFAULT_APP_NAME, MoveDirection, NewResource, Resource, ResourcePage, ResourceQuery,
};
