//! Configuration for the resources module.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::InitError;
use crate::infra::storage::StoreKind;

/// Configuration for the resources module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ResourcesConfig {
    /// Data-access strategy backing the store.
    pub store: StoreKind,
    pub initializer: InitializerConfig,
    pub seeder: SeederConfig,
    pub tenants: TenantSourceConfig,
}

/// Which targets the initializer reconciles on startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct InitializerConfig {
    /// Master switch; when `false` nothing is reconciled.
    pub enable: bool,
    /// Reconcile the master database.
    pub master: bool,
    /// Reconcile every tenant database listed in the master.
    pub tenants: bool,
}

impl Default for InitializerConfig {
    fn default() -> Self {
        Self {
            enable: true,
            master: true,
            tenants: false,
        }
    }
}

/// Seed catalog options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct SeederConfig {
    pub enable: bool,
    /// Applications to seed. Empty means every application in the catalog.
    pub app_names: Vec<String>,
    /// Replaces the built-in catalog with a YAML file.
    pub catalog_path: Option<PathBuf>,
}

impl Default for SeederConfig {
    fn default() -> Self {
        Self {
            enable: true,
            app_names: Vec::new(),
            catalog_path: None,
        }
    }
}

/// Where the master database lists tenant connection strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct TenantSourceConfig {
    pub table: String,
    pub column: String,
}

impl Default for TenantSourceConfig {
    fn default() -> Self {
        Self {
            table: "Tenants".to_owned(),
            column: "ConnectionString".to_owned(),
        }
    }
}

impl ResourcesConfig {
    /// Checks values serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns `InitError::Config` when the tenant table or column name is not
    /// a plain identifier.
    pub fn validate(&self) -> Result<(), InitError> {
        validate_identifier("tenants.table", &self.tenants.table)?;
        validate_identifier("tenants.column", &self.tenants.column)
    }
}

fn validate_identifier(field: &str, value: &str) -> Result<(), InitError> {
    let valid = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(InitError::Config(format!(
            "{field} must match [A-Za-z0-9_]+, got '{value}'"
        )))
    }
}
