//! Schema reconciliation for the `Resources` table.
//!
//! [`SchemaReconciler::reconcile`] converges a single database towards the expected table
//! shape and is safe to run on every start:
//! 1. create the table when it is missing;
//! 2. add each missing column with its default;
//! 3. replace legacy NULLs in text columns and `Step`;
//! 4. backfill `DisplayOrder` and `GroupOrder` from each other.
//!
//! Every step is idempotent on its own, so a run that fails part-way is
//! completed by the next one.

use sea_orm::sea_query::{
    Alias, ColumnDef, Cond, Expr, Query, SimpleExpr, Table, TableCreateStatement,
    UpdateStatement,
};
use sea_orm::{ConnectionTrait, DatabaseBackend, DatabaseConnection};
use sea_orm_migration::SchemaManager;
use tracing::{debug, info};

use crate::error::InitError;

/// Name of the managed table.
pub const TABLE: &str = "Resources";

const ID: &str = "Id";
const DISPLAY_ORDER: &str = "DisplayOrder";
const GROUP_ORDER: &str = "GroupOrder";
const STEP: &str = "Step";

/// Text columns whose NULLs are replaced by `''`.
pub const NORMALIZED_TEXT_COLUMNS: [&str; 9] = [
    "Alias",
    "Route",
    "Title",
    "Description",
    "SysopUserId",
    "GroupName",
    "HeaderHtml",
    "FooterHtml",
    "AppName",
];

/// RFC 3339 UTC timestamp, so defaulted values decode like bound ones.
const SQLITE_NOW: &str = "(strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))";

#[derive(Clone, Copy, Debug)]
enum ColumnKind {
    String(u32),
    Text,
    Integer,
    Boolean,
    TimestampTz,
}

#[derive(Clone, Copy, Debug)]
enum ColumnDefault {
    Null,
    Bool(bool),
    Int(i32),
    Str(&'static str),
    Now,
}

#[derive(Clone, Copy, Debug)]
struct ExpectedColumn {
    name: &'static str,
    kind: ColumnKind,
    default: ColumnDefault,
}

const fn column(name: &'static str, kind: ColumnKind, default: ColumnDefault) -> ExpectedColumn {
    ExpectedColumn {
        name,
        kind,
        default,
    }
}

/// Every column except the key, in creation order.
const EXPECTED_COLUMNS: [ExpectedColumn; 20] = [
    column("Alias", ColumnKind::String(50), ColumnDefault::Null),
    column("Route", ColumnKind::String(255), ColumnDefault::Null),
    column("Title", ColumnKind::String(50), ColumnDefault::Null),
    column("Description", ColumnKind::String(200), ColumnDefault::Null),
    column("SysopUserId", ColumnKind::String(50), ColumnDefault::Null),
    column("IsPublic", ColumnKind::Boolean, ColumnDefault::Bool(true)),
    column("GroupName", ColumnKind::String(50), ColumnDefault::Null),
    column(GROUP_ORDER, ColumnKind::Integer, ColumnDefault::Int(0)),
    column(DISPLAY_ORDER, ColumnKind::Integer, ColumnDefault::Int(0)),
    column("MailEnable", ColumnKind::Boolean, ColumnDefault::Bool(false)),
    column("ShowList", ColumnKind::Boolean, ColumnDefault::Bool(true)),
    column("MainShowList", ColumnKind::Boolean, ColumnDefault::Bool(true)),
    column("HeaderHtml", ColumnKind::Text, ColumnDefault::Null),
    column("FooterHtml", ColumnKind::Text, ColumnDefault::Null),
    column(
        "AppName",
        ColumnKind::String(100),
        ColumnDefault::Str(resources_sdk::DEFAULT_APP_NAME),
    ),
    column(STEP, ColumnKind::Integer, ColumnDefault::Int(0)),
    column("CreatedBy", ColumnKind::String(255), ColumnDefault::Null),
    column("Created", ColumnKind::TimestampTz, ColumnDefault::Now),
    column("ModifiedBy", ColumnKind::String(255), ColumnDefault::Null),
    column("Modified", ColumnKind::TimestampTz, ColumnDefault::Null),
];

/// What one reconciliation run changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub table_created: bool,
    pub columns_added: Vec<&'static str>,
    pub nulls_normalized: u64,
    pub display_orders_backfilled: u64,
    pub group_orders_backfilled: u64,
}

impl ReconcileReport {
    /// `true` when the run found the database already converged.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        !self.table_created
            && self.columns_added.is_empty()
            && self.nulls_normalized == 0
            && self.display_orders_backfilled == 0
            && self.group_orders_backfilled == 0
    }
}

/// Names of every column the reconciled table carries, key first.
#[must_use]
pub fn expected_columns() -> Vec<&'static str> {
    std::iter::once(ID)
        .chain(EXPECTED_COLUMNS.iter().map(|c| c.name))
        .collect()
}

/// Brings the `Resources` table of one database to the expected shape.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaReconciler;

impl SchemaReconciler {
    /// Reconcile the `Resources` table of one database.
    ///
    /// # Errors
    ///
    /// Returns `InitError::Schema` naming the step that failed. Steps completed
    /// before the failure stay applied.
    pub async fn reconcile(conn: &DatabaseConnection) -> Result<ReconcileReport, InitError> {
        reconcile(conn).await
    }
}

async fn reconcile(conn: &DatabaseConnection) -> Result<ReconcileReport, InitError> {
    let backend = conn.get_database_backend();
    let manager = SchemaManager::new(conn);
    let mut report = ReconcileReport::default();

    let exists = manager
        .has_table(TABLE)
        .await
        .map_err(InitError::schema("table lookup"))?;

    if exists {
        for expected in &EXPECTED_COLUMNS {
            let present = manager
                .has_column(TABLE, expected.name)
                .await
                .map_err(InitError::schema("column lookup"))?;
            if present {
                continue;
            }
            manager
                .alter_table(
                    Table::alter()
                        .table(Alias::new(TABLE))
                        .add_column(column_def(expected, backend, false))
                        .to_owned(),
                )
                .await
                .map_err(InitError::schema("add column"))?;
            info!(table = TABLE, column = expected.name, "Added missing column");
            report.columns_added.push(expected.name);
        }
    } else {
        manager
            .create_table(create_table_statement(backend))
            .await
            .map_err(InitError::schema("create table"))?;
        info!(table = TABLE, "Created table");
        report.table_created = true;
    }

    report.nulls_normalized = normalize_nulls(conn).await?;

    report.display_orders_backfilled = execute_update(
        conn,
        &backfill_statement(DISPLAY_ORDER, GROUP_ORDER),
        "backfill display order",
    )
    .await?;
    report.group_orders_backfilled = execute_update(
        conn,
        &backfill_statement(GROUP_ORDER, DISPLAY_ORDER),
        "backfill group order",
    )
    .await?;

    if report.display_orders_backfilled > 0 || report.group_orders_backfilled > 0 {
        info!(
            table = TABLE,
            display_orders = report.display_orders_backfilled,
            group_orders = report.group_orders_backfilled,
            "Backfilled order columns"
        );
    }
    debug!(table = TABLE, noop = report.is_noop(), "Schema reconciled");

    Ok(report)
}

fn create_table_statement(backend: DatabaseBackend) -> TableCreateStatement {
    let mut table = Table::create();
    table.table(Alias::new(TABLE)).if_not_exists().col(
        ColumnDef::new(Alias::new(ID))
            .integer()
            .not_null()
            .auto_increment()
            .primary_key(),
    );
    for expected in &EXPECTED_COLUMNS {
        table.col(column_def(expected, backend, true));
    }
    table.to_owned()
}

fn column_def(expected: &ExpectedColumn, backend: DatabaseBackend, creating: bool) -> ColumnDef {
    let mut def = ColumnDef::new(Alias::new(expected.name));
    match expected.kind {
        ColumnKind::String(len) => {
            def.string_len(len);
        }
        ColumnKind::Text => {
            def.text();
        }
        ColumnKind::Integer => {
            def.integer();
        }
        ColumnKind::Boolean => {
            def.boolean();
        }
        ColumnKind::TimestampTz => {
            def.timestamp_with_time_zone();
        }
    }
    match expected.default {
        ColumnDefault::Null => {}
        ColumnDefault::Bool(value) => {
            def.default(value);
        }
        ColumnDefault::Int(value) => {
            def.default(value);
        }
        ColumnDefault::Str(value) => {
            def.default(value);
        }
        ColumnDefault::Now => {
            if let Some(now) = now_default(backend, creating) {
                def.default(now);
            }
        }
    }
    def
}

/// Insert-time default for `Created`.
///
/// `SQLite` rejects non-constant defaults in `ALTER TABLE ADD COLUMN`, so a
/// column added to an existing table there has none.
fn now_default(backend: DatabaseBackend, creating: bool) -> Option<SimpleExpr> {
    match backend {
        DatabaseBackend::Sqlite if creating => Some(Expr::cust(SQLITE_NOW)),
        DatabaseBackend::Sqlite => None,
        DatabaseBackend::Postgres | DatabaseBackend::MySql => {
            Some(Expr::current_timestamp().into())
        }
    }
}

async fn normalize_nulls(conn: &DatabaseConnection) -> Result<u64, InitError> {
    let mut total = 0;
    for name in NORMALIZED_TEXT_COLUMNS {
        let rows = execute_update(conn, &fill_nulls(name, ""), "normalize nulls").await?;
        if rows > 0 {
            debug!(table = TABLE, column = name, rows, "Replaced NULL text");
        }
        total += rows;
    }

    let rows = execute_update(conn, &fill_nulls(STEP, 0), "normalize nulls").await?;
    if rows > 0 {
        debug!(table = TABLE, column = STEP, rows, "Replaced NULL step");
    }
    total += rows;

    if total > 0 {
        info!(table = TABLE, rows = total, "Normalized NULL values");
    }
    Ok(total)
}

fn fill_nulls(name: &str, value: impl Into<SimpleExpr>) -> UpdateStatement {
    Query::update()
        .table(Alias::new(TABLE))
        .value(Alias::new(name), value)
        .and_where(Expr::col(Alias::new(name)).is_null())
        .to_owned()
}

/// Copy `source` into `target` where `target` is NULL or 0.
///
/// Rows where the copy would change nothing (both 0) or would replace a 0
/// with NULL are skipped, so a second run touches no rows.
fn backfill_statement(target: &str, source: &str) -> UpdateStatement {
    let target_col = || Expr::col(Alias::new(target));
    let source_col = || Expr::col(Alias::new(source));
    Query::update()
        .table(Alias::new(TABLE))
        .value(Alias::new(target), source_col())
        .cond_where(
            Cond::all()
                .add(
                    Cond::any()
                        .add(target_col().is_null())
                        .add(target_col().eq(0)),
                )
                .add(source_col().is_not_null())
                .add(
                    Cond::any()
                        .add(target_col().is_null())
                        .add(source_col().ne(0)),
                ),
        )
        .to_owned()
}

async fn execute_update(
    conn: &DatabaseConnection,
    stmt: &UpdateStatement,
    step: &'static str,
) -> Result<u64, InitError> {
    let res = conn
        .execute(conn.get_database_backend().build(stmt))
        .await
        .map_err(InitError::schema(step))?;
    Ok(res.rows_affected())
}
