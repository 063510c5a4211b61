//! Resource store implementations.
//!
//! Three strategies satisfy the same [`ResourceStore`] contract and differ
//! only in how statements reach the database:
//! - [`RawSqlResourceStore`]: hand-written SQL, rows read column by column
//! - [`QueryBuilderResourceStore`]: `sea-query` statements mapped through `FromQueryResult`
//! - [`SeaOrmResourceStore`]: entity finders and `ActiveModel` change tracking

use std::fmt;
use std::sync::Arc;

use resources_sdk::{ResourceError, ResourceQuery, ResourceStore};
use sea_orm::sea_query::{Cond, Expr, Func, LikeExpr};
use sea_orm::{
    DatabaseBackend, DatabaseConnection, DatabaseTransaction, DbErr, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod entity;
mod query_builder_repo;
mod raw_sql_repo;
mod sea_orm_repo;

#[cfg(test)]
mod mapper_test;

pub use query_builder_repo::QueryBuilderResourceStore;
pub use raw_sql_repo::RawSqlResourceStore;
pub use sea_orm_repo::SeaOrmResourceStore;

/// Escape character used in every `LIKE` pattern built by the stores.
const LIKE_ESCAPE: char = '!';

/// Largest `LIMIT`/`OFFSET` value; every backend binds them as signed 64-bit.
const MAX_BIND: u64 = i64::MAX.unsigned_abs();

/// Data-access strategy selected by configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    RawSql,
    QueryBuilder,
    #[default]
    Orm,
}

impl StoreKind {
    pub const ALL: [Self; 3] = [Self::RawSql, Self::QueryBuilder, Self::Orm];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RawSql => "raw_sql",
            Self::QueryBuilder => "query_builder",
            Self::Orm => "orm",
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build the store selected by `kind` over an open connection.
#[must_use]
pub fn build_store(kind: StoreKind, conn: DatabaseConnection) -> Arc<dyn ResourceStore> {
    match kind {
        StoreKind::RawSql => Arc::new(RawSqlResourceStore::new(conn)),
        StoreKind::QueryBuilder => Arc::new(QueryBuilderResourceStore::new(conn)),
        StoreKind::Orm => Arc::new(SeaOrmResourceStore::new(conn)),
    }
}

/// Internal store failure, converted to [`ResourceError`] at the trait boundary.
#[derive(Debug, Error)]
pub(crate) enum StoreError {
    #[error(transparent)]
    Db(#[from] DbErr),

    /// A guarded display-order update matched no row.
    #[error("display order of resource {id} changed concurrently")]
    Conflict { id: i32 },
}

impl From<StoreError> for ResourceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Db(e) => Self::database(e.to_string()),
            StoreError::Conflict { id } => Self::ReorderConflict { id },
        }
    }
}

pub(crate) type StoreResult<T> = Result<T, StoreError>;

/// Current time as stored in `Created` and `Modified`.
pub(crate) fn now() -> chrono::DateTime<chrono::FixedOffset> {
    chrono::Utc::now().fixed_offset()
}

/// Lower-cased `LIKE` pattern for a free-text search, or `None` when the
/// text is absent or blank.
///
/// The pattern is folded the way the backend's `LOWER()` folds the column:
/// ASCII letters only on `SQLite`, full Unicode on `PostgreSQL` and `MySQL`.
/// Wildcards typed by the user match literally.
pub(crate) fn search_pattern(backend: DatabaseBackend, text: Option<&str>) -> Option<String> {
    let needle = text.map(str::trim).filter(|t| !t.is_empty())?;
    let folded = if backend == DatabaseBackend::Sqlite {
        needle.to_ascii_lowercase()
    } else {
        needle.to_lowercase()
    };
    let mut pattern = String::with_capacity(folded.len() + 2);
    pattern.push('%');
    for c in folded.chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            pattern.push(LIKE_ESCAPE);
        }
        pattern.push(c);
    }
    pattern.push('%');
    Some(pattern)
}

/// `WHERE` condition for a search query, shared by the builder-based stores.
pub(crate) fn search_condition(backend: DatabaseBackend, query: &ResourceQuery) -> Cond {
    let mut cond = Cond::all();
    if let Some(app) = &query.app_name {
        cond = cond.add(Expr::col(entity::Column::AppName).eq(app.as_str()));
    }
    if let Some(pattern) = search_pattern(backend, query.search.as_deref()) {
        cond = cond.add(
            Cond::any()
                .add(lower_like(entity::Column::Title, &pattern))
                .add(lower_like(entity::Column::Description, &pattern)),
        );
    }
    cond
}

fn lower_like(column: entity::Column, pattern: &str) -> sea_orm::sea_query::SimpleExpr {
    Expr::expr(Func::lower(Expr::col(column)))
        .like(LikeExpr::new(pattern).escape(LIKE_ESCAPE))
}

/// Saturating conversion for `LIMIT`/`OFFSET` binds.
pub(crate) fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// `LIMIT`/`OFFSET` value for statements built with `sea-query`, which binds
/// unsigned values as `BigUnsigned`.
pub(crate) fn clamp_bind(value: u64) -> u64 {
    value.min(MAX_BIND)
}

/// Commit a reorder that swapped rows, roll back everything else.
pub(crate) async fn finish_reorder(
    txn: DatabaseTransaction,
    result: StoreResult<bool>,
) -> StoreResult<bool> {
    match result {
        Ok(true) => {
            txn.commit().await?;
            Ok(true)
        }
        Ok(false) => {
            txn.rollback().await?;
            Ok(false)
        }
        Err(err) => {
            if let StoreError::Conflict { id } = &err {
                tracing::warn!(id, "Reorder conflict, rolling back");
            }
            if let Err(e) = txn.rollback().await {
                tracing::warn!(error = %e, "Rollback after failed reorder failed");
            }
            Err(err)
        }
    }
}

/// Open the transaction a reorder runs in.
pub(crate) async fn begin_reorder(conn: &DatabaseConnection) -> StoreResult<DatabaseTransaction> {
    Ok(conn.begin().await?)
}
