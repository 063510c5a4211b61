//! Database preparation: schema and seed reconciliation, and the driver
//! that applies them to the master and tenant databases.

pub mod catalog;
pub mod schema;
pub mod seed;
pub mod tenants;

pub use catalog::{SeedApplication, SeedCatalog, SeedEntry};
pub use schema::{ReconcileReport, SchemaReconciler};
pub use seed::{SeedPlan, SeedReconciler, SeedReport};
pub use tenants::{DriverReport, TargetOutcome, TargetReport, TenantDriver};
