//! Navigation resources for multi-tenant applications.
//!
//! The crate keeps a `Resources` table in shape on every database an
//! application owns and serves the rows through interchangeable stores:
//! - [`init`] reconciles schema and seed data across master and tenants
//! - [`infra::storage`] implements [`resources_sdk::ResourceStore`] three ways
//! - [`infra::db`] opens pooled connections from a DSN
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod infra;
pub mod init;

pub use config::ResourcesConfig;
pub use error::InitError;
pub use infra::db::{ConnectOpts, connect, redact_dsn};
pub use infra::storage::{StoreKind, build_store};
pub use init::{SchemaReconciler, SeedCatalog, SeedPlan, SeedReconciler, TenantDriver};
