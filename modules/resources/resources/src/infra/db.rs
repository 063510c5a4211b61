//! Connection layer: engine detection by DSN, pooled connections for every
//! enabled backend, and DSN redaction for logs.

use std::time::Duration;

use sea_orm::DatabaseConnection;
#[cfg(feature = "db-mysql")]
use sea_orm::SqlxMySqlConnector;
#[cfg(feature = "db-pg")]
use sea_orm::SqlxPostgresConnector;
#[cfg(feature = "db-sqlite")]
use sea_orm::SqlxSqliteConnector;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(feature = "db-mysql")]
use sqlx::mysql::MySqlPoolOptions;
#[cfg(feature = "db-pg")]
use sqlx::postgres::PgPoolOptions;
#[cfg(feature = "db-sqlite")]
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

#[cfg(feature = "db-sqlite")]
const DEFAULT_SQLITE_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Typed error for connection setup.
#[derive(Debug, Error)]
pub enum DbError {
    /// The DSN scheme is not one of `sqlite:`, `postgres://`, `mysql://`.
    /// Carries the redacted DSN.
    #[error("unknown DSN: {0}")]
    UnknownDsn(String),

    #[error("feature not enabled: {0}")]
    FeatureDisabled(&'static str),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Supported engines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DbEngine {
    Postgres,
    MySql,
    Sqlite,
}

impl DbEngine {
    /// Detect engine by DSN scheme.
    ///
    /// Only the scheme prefix is inspected; the rest of the DSN is opaque.
    ///
    /// # Errors
    /// Returns `DbError::UnknownDsn` if the scheme is not recognized.
    pub fn detect(dsn: &str) -> Result<Self, DbError> {
        let s = dsn.trim_start();
        if s.starts_with("postgres://") || s.starts_with("postgresql://") {
            Ok(Self::Postgres)
        } else if s.starts_with("mysql://") {
            Ok(Self::MySql)
        } else if s.starts_with("sqlite:") {
            Ok(Self::Sqlite)
        } else {
            Err(DbError::UnknownDsn(redact_dsn(dsn)))
        }
    }
}

/// Pool options, applied to whichever backend the DSN selects.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ConnectOpts {
    /// Maximum number of connections in the pool.
    pub max_conns: Option<u32>,
    /// Minimum number of connections in the pool.
    pub min_conns: Option<u32>,
    /// Timeout to acquire a connection from the pool.
    #[serde(with = "humantime_serde")]
    pub acquire_timeout: Option<Duration>,
    /// Idle timeout before a connection is closed.
    #[serde(with = "humantime_serde")]
    pub idle_timeout: Option<Duration>,
    /// Maximum lifetime for a connection.
    #[serde(with = "humantime_serde")]
    pub max_lifetime: Option<Duration>,
    /// Test connection health before acquire.
    pub test_before_acquire: bool,
}

impl Default for ConnectOpts {
    fn default() -> Self {
        Self {
            max_conns: Some(10),
            min_conns: None,
            acquire_timeout: Some(Duration::from_secs(30)),
            idle_timeout: None,
            max_lifetime: None,
            test_before_acquire: false,
        }
    }
}

/// Applies [`ConnectOpts`] to a backend-specific pool builder.
trait ApplyPoolOpts {
    fn apply(self, opts: &ConnectOpts) -> Self;
}

macro_rules! impl_apply_pool_opts {
    ($feature:literal, $builder:ty) => {
        #[cfg(feature = $feature)]
        impl ApplyPoolOpts for $builder {
            fn apply(mut self, opts: &ConnectOpts) -> Self {
                if let Some(n) = opts.max_conns {
                    self = self.max_connections(n);
                }
                if let Some(n) = opts.min_conns {
                    self = self.min_connections(n);
                }
                if let Some(t) = opts.acquire_timeout {
                    self = self.acquire_timeout(t);
                }
                if let Some(t) = opts.idle_timeout {
                    self = self.idle_timeout(t);
                }
                if let Some(t) = opts.max_lifetime {
                    self = self.max_lifetime(t);
                }
                if opts.test_before_acquire {
                    self = self.test_before_acquire(true);
                }
                self
            }
        }
    };
}

impl_apply_pool_opts!("db-pg", PgPoolOptions);
impl_apply_pool_opts!("db-mysql", MySqlPoolOptions);
impl_apply_pool_opts!("db-sqlite", SqlitePoolOptions);

/// Open a pooled connection for `dsn`.
///
/// `SQLite` files are created when missing and run in WAL mode with a busy
/// timeout. In-memory `SQLite` databases live only as long as their
/// connections, so they get a single connection that is never recycled.
///
/// # Errors
/// Returns an error if the DSN is unknown, its backend feature is disabled,
/// or the first connection cannot be established.
pub async fn connect(dsn: &str, opts: &ConnectOpts) -> Result<DatabaseConnection, DbError> {
    match DbEngine::detect(dsn)? {
        #[cfg(feature = "db-pg")]
        DbEngine::Postgres => {
            let pool = PgPoolOptions::new().apply(opts).connect(dsn).await?;
            Ok(SqlxPostgresConnector::from_sqlx_postgres_pool(pool))
        }
        #[cfg(not(feature = "db-pg"))]
        DbEngine::Postgres => Err(DbError::FeatureDisabled("db-pg")),
        #[cfg(feature = "db-mysql")]
        DbEngine::MySql => {
            let pool = MySqlPoolOptions::new().apply(opts).connect(dsn).await?;
            Ok(SqlxMySqlConnector::from_sqlx_mysql_pool(pool))
        }
        #[cfg(not(feature = "db-mysql"))]
        DbEngine::MySql => Err(DbError::FeatureDisabled("db-mysql")),
        #[cfg(feature = "db-sqlite")]
        DbEngine::Sqlite => connect_sqlite(dsn, opts).await,
        #[cfg(not(feature = "db-sqlite"))]
        DbEngine::Sqlite => Err(DbError::FeatureDisabled("db-sqlite")),
    }
}

#[cfg(feature = "db-sqlite")]
async fn connect_sqlite(dsn: &str, opts: &ConnectOpts) -> Result<DatabaseConnection, DbError> {
    use std::str::FromStr;

    let memory = is_memory_dsn(dsn);
    let mut options = SqliteConnectOptions::from_str(dsn.trim())?.create_if_missing(true);
    if !memory {
        options = options
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(DEFAULT_SQLITE_BUSY_TIMEOUT);
    }

    let mut pool = SqlitePoolOptions::new().apply(opts);
    if memory {
        pool = pool
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    }

    let pool = pool.connect_with(options).await?;
    Ok(SqlxSqliteConnector::from_sqlx_sqlite_pool(pool))
}

fn is_memory_dsn(dsn: &str) -> bool {
    dsn.contains(":memory:") || dsn.contains("mode=memory")
}

/// Replace the password of a URL-style DSN with `***`.
///
/// DSNs that carry credentials but do not parse as URLs are masked entirely.
#[must_use]
pub fn redact_dsn(dsn: &str) -> String {
    let Ok(mut parsed) = url::Url::parse(dsn) else {
        return if dsn.contains('@') {
            "***".to_owned()
        } else {
            dsn.to_owned()
        };
    };
    if parsed.password().is_none() {
        return dsn.to_owned();
    }
    match parsed.set_password(Some("***")) {
        Ok(()) => parsed.to_string(),
        Err(()) => "***".to_owned(),
    }
}
