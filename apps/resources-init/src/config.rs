//! Layered application configuration.
//!
//! Sources, later ones winning:
//! 1) built-in defaults -> 2) YAML file (if provided) -> 3) env (`APP__*`)

use std::path::Path;

use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use resources::{ConnectOpts, ResourcesConfig, redact_dsn};
use serde::{Deserialize, Serialize};

/// Prefix of environment overrides; `__` separates nested keys.
pub const ENV_PREFIX: &str = "APP__";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub resources: ResourcesConfig,
    pub logging: LoggingConfig,
}

/// Master database connection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct DatabaseConfig {
    /// Master DSN; tenants are listed in this database.
    pub dsn: Option<String>,
    /// Pool options applied to master and tenant connections alike.
    pub pool: ConnectOpts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` and `-v` are absent.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl AppConfig {
    /// Load defaults, then the optional YAML file, then `APP__*` variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be parsed or the result fails
    /// validation.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::from_figment(&Self::figment(path))
    }

    fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    fn from_figment(figment: &Figment) -> Result<Self> {
        let config: Self = figment
            .extract()
            .context("failed to load configuration")?;
        config.resources.validate()?;
        Ok(config)
    }

    /// The master DSN, required by every command that touches a database.
    ///
    /// # Errors
    ///
    /// Returns an error when `database.dsn` is missing or blank.
    pub fn master_dsn(&self) -> Result<&str> {
        self.database
            .dsn
            .as_deref()
            .map(str::trim)
            .filter(|dsn| !dsn.is_empty())
            .context("database.dsn is required (set it in the config file or APP__DATABASE__DSN)")
    }

    /// Pretty JSON with credentials masked.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_redacted_json(&self) -> Result<String> {
        let mut shown = self.clone();
        shown.database.dsn = shown.database.dsn.as_deref().map(redact_dsn);
        Ok(serde_json::to_string_pretty(&shown)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resources::StoreKind;

    fn from_yaml(yaml: &str) -> Result<AppConfig> {
        AppConfig::from_figment(
            &Figment::new()
                .merge(Serialized::defaults(AppConfig::default()))
                .merge(Yaml::string(yaml)),
        )
    }

    #[test]
    fn test_defaults_without_sources() {
        let config = temp_env::with_var_unset("APP__DATABASE__DSN", || AppConfig::load(None))
            .unwrap();

        assert_eq!(config, AppConfig::default());
        assert!(config.master_dsn().is_err());
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.database.pool.max_conns, Some(10));
    }

    #[test]
    fn test_yaml_sections() {
        let config = from_yaml(
            r"
database:
  dsn: sqlite://data/master.db
  pool: { max_conns: 4, acquire_timeout: 5s }
resources:
  store: query_builder
  initializer: { tenants: true }
  seeder: { app_names: [VisualAcademy] }
logging:
  level: debug
  format: json
",
        )
        .unwrap();

        assert_eq!(config.master_dsn().unwrap(), "sqlite://data/master.db");
        assert_eq!(config.database.pool.max_conns, Some(4));
        assert_eq!(
            config.database.pool.acquire_timeout,
            Some(std::time::Duration::from_secs(5))
        );
        assert_eq!(config.resources.store, StoreKind::QueryBuilder);
        assert!(config.resources.initializer.master);
        assert!(config.resources.initializer.tenants);
        assert_eq!(config.resources.seeder.app_names, ["VisualAcademy"]);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_env_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "database:\n  dsn: sqlite://from-file.db\nresources:\n  store: raw_sql\n",
        )
        .unwrap();

        let config = temp_env::with_var("APP__DATABASE__DSN", Some("sqlite://from-env.db"), || {
            AppConfig::load(Some(&path))
        })
        .unwrap();

        assert_eq!(config.master_dsn().unwrap(), "sqlite://from-env.db");
        assert_eq!(config.resources.store, StoreKind::RawSql);
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(from_yaml("databse:\n  dsn: x\n").is_err());
    }

    #[test]
    fn test_invalid_tenant_table_rejected() {
        let err = from_yaml("resources:\n  tenants: { table: \"Tenants; DROP\" }\n").unwrap_err();
        assert!(err.to_string().contains("tenants.table"), "{err}");
    }

    #[test]
    fn test_blank_dsn_is_missing() {
        let config = from_yaml("database:\n  dsn: \"  \"\n").unwrap();
        assert!(config.master_dsn().is_err());
    }

    #[test]
    fn test_redacted_json_masks_password() {
        let config = from_yaml("database:\n  dsn: postgres://app:hunter2@db/master\n").unwrap();
        let json = config.to_redacted_json().unwrap();

        assert!(!json.contains("hunter2"));
        assert!(json.contains("postgres://app:***@db/master"));
    }
}
