//! Errors raised while preparing databases: configuration, connection,
//! schema reconciliation, seeding, and tenant enumeration.

use sea_orm::DbErr;
use thiserror::Error;

use crate::infra::db::DbError;

/// Errors that can occur while initializing a target database.
#[derive(Debug, Error)]
pub enum InitError {
    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// The target could not be reached.
    #[error("connection failed: {0}")]
    Connect(#[from] DbError),

    /// A schema reconciliation step failed.
    #[error("schema reconciliation failed at '{step}': {source}")]
    Schema { step: &'static str, source: DbErr },

    /// Applying the seed catalog failed; the transaction was rolled back.
    #[error("seeding '{app}' failed: {source}")]
    Seed { app: String, source: DbErr },

    /// The tenant list could not be read from the master database.
    #[error("failed to enumerate tenants from '{table}': {source}")]
    Tenants { table: String, source: DbErr },

    /// The seed catalog could not be read or is malformed.
    #[error("invalid seed catalog: {0}")]
    Catalog(String),
}

impl InitError {
    pub(crate) fn schema(step: &'static str) -> impl FnOnce(DbErr) -> Self {
        move |source| Self::Schema { step, source }
    }
}
