//! Drives reconciliation across the master database and every tenant it
//! lists.
//!
//! Targets are processed one after another. A target that cannot be
//! reached or fails to reconcile is logged and reported; the remaining
//! targets still run.

use sea_orm::sea_query::{Alias, Query, SelectStatement};
use sea_orm::{ConnectionTrait, DatabaseConnection};
use tracing::{debug, error, info, warn};

use super::schema::{ReconcileReport, SchemaReconciler};
use super::seed::{SeedPlan, SeedReport};
use crate::config::TenantSourceConfig;
use crate::error::InitError;
use crate::infra::db::{self, ConnectOpts, redact_dsn};

/// Label of the master target in reports and logs.
pub const MASTER_LABEL: &str = "master";

/// How one target ended.
#[derive(Debug)]
pub enum TargetOutcome {
    Reconciled {
        schema: ReconcileReport,
        /// `None` when seeding is disabled.
        seed: Option<SeedReport>,
    },
    Failed { error: InitError },
}

/// Result for a single database.
#[derive(Debug)]
pub struct TargetReport {
    /// `master` or `tenant[<index>]`.
    pub label: String,
    /// Connection string with credentials masked.
    pub dsn: String,
    pub outcome: TargetOutcome,
}

impl TargetReport {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, TargetOutcome::Reconciled { .. })
    }
}

/// Results of a whole driver run, in processing order.
#[derive(Debug, Default)]
pub struct DriverReport {
    pub targets: Vec<TargetReport>,
}

impl DriverReport {
    pub fn failed(&self) -> impl Iterator<Item = &TargetReport> {
        self.targets.iter().filter(|t| !t.is_success())
    }

    #[must_use]
    pub fn succeeded_count(&self) -> usize {
        self.targets.iter().filter(|t| t.is_success()).count()
    }
}

/// Runs the schema reconciler, and optionally a seed plan, on each target.
#[derive(Debug, Clone)]
pub struct TenantDriver {
    source: TenantSourceConfig,
    connect_opts: ConnectOpts,
    seed: Option<SeedPlan>,
}

impl TenantDriver {
    #[must_use]
    pub fn new(source: TenantSourceConfig, connect_opts: ConnectOpts) -> Self {
        Self {
            source,
            connect_opts,
            seed: None,
        }
    }

    /// Seed every reconciled target with `plan`.
    #[must_use]
    pub fn with_seed(mut self, plan: SeedPlan) -> Self {
        self.seed = Some(plan);
        self
    }

    /// Reconcile the master and/or its tenants.
    ///
    /// # Errors
    ///
    /// Fails only when tenants are requested and their list cannot be read
    /// from the master. Per-target failures are part of the report.
    pub async fn run(
        &self,
        master_dsn: &str,
        include_master: bool,
        include_tenants: bool,
    ) -> Result<DriverReport, InitError> {
        let mut report = DriverReport::default();
        if include_master {
            report.targets.push(self.run_master(master_dsn).await);
        }
        if include_tenants {
            report.targets.extend(self.run_tenants(master_dsn).await?);
        }

        let failed = report.failed().count();
        if failed > 0 {
            warn!(
                succeeded = report.succeeded_count(),
                failed, "Reconciliation finished with failed targets"
            );
        } else {
            info!(
                succeeded = report.succeeded_count(),
                "Reconciliation finished"
            );
        }
        Ok(report)
    }

    /// Reconcile the master database.
    pub async fn run_master(&self, dsn: &str) -> TargetReport {
        self.run_target(MASTER_LABEL.to_owned(), dsn).await
    }

    /// Reconcile every tenant listed in the master database.
    ///
    /// # Errors
    ///
    /// Returns an error if the master cannot be reached or the tenant table
    /// cannot be read.
    pub async fn run_tenants(&self, master_dsn: &str) -> Result<Vec<TargetReport>, InitError> {
        let master = db::connect(master_dsn, &self.connect_opts).await?;
        let listed = self.tenant_dsns(&master).await;
        close(master, MASTER_LABEL).await;
        let dsns = listed?;

        info!(tenants = dsns.len(), "Enumerated tenant databases");
        let mut reports = Vec::with_capacity(dsns.len());
        for (index, dsn) in dsns.iter().enumerate() {
            reports.push(self.run_target(format!("tenant[{index}]"), dsn).await);
        }
        Ok(reports)
    }

    /// Tenant connection strings listed in the master, blanks skipped.
    ///
    /// # Errors
    ///
    /// Returns `InitError::Tenants` if the query fails.
    pub async fn tenant_dsns(&self, master: &DatabaseConnection) -> Result<Vec<String>, InitError> {
        let fail = |source| InitError::Tenants {
            table: self.source.table.clone(),
            source,
        };
        let stmt = master
            .get_database_backend()
            .build(&tenant_query(&self.source));
        let rows = master.query_all(stmt).await.map_err(fail)?;

        let mut dsns = Vec::with_capacity(rows.len());
        for row in rows {
            let value: Option<String> = row.try_get("", &self.source.column).map_err(fail)?;
            let dsn = value.as_deref().map(str::trim).unwrap_or_default();
            if dsn.is_empty() {
                debug!(table = %self.source.table, "Skipping empty tenant connection string");
            } else {
                dsns.push(dsn.to_owned());
            }
        }
        Ok(dsns)
    }

    async fn run_target(&self, label: String, dsn: &str) -> TargetReport {
        let redacted = redact_dsn(dsn);
        let outcome = match self.reconcile(&label, dsn).await {
            Ok((schema, seed)) => {
                info!(
                    db = %label,
                    dsn = %redacted,
                    table_created = schema.table_created,
                    columns_added = schema.columns_added.len(),
                    seeded = seed.is_some(),
                    "Target reconciled"
                );
                TargetOutcome::Reconciled { schema, seed }
            }
            Err(e) => {
                error!(db = %label, dsn = %redacted, error = %e, "Target reconciliation failed");
                TargetOutcome::Failed { error: e }
            }
        };
        TargetReport {
            label,
            dsn: redacted,
            outcome,
        }
    }

    async fn reconcile(
        &self,
        label: &str,
        dsn: &str,
    ) -> Result<(ReconcileReport, Option<SeedReport>), InitError> {
        let conn = db::connect(dsn, &self.connect_opts).await?;
        let result = self.reconcile_conn(&conn).await;
        close(conn, label).await;
        result
    }

    async fn reconcile_conn(
        &self,
        conn: &DatabaseConnection,
    ) -> Result<(ReconcileReport, Option<SeedReport>), InitError> {
        let schema = SchemaReconciler::reconcile(conn).await?;
        let seed = match &self.seed {
            Some(plan) => Some(plan.apply(conn).await?),
            None => None,
        };
        Ok((schema, seed))
    }
}

fn tenant_query(source: &TenantSourceConfig) -> SelectStatement {
    Query::select()
        .column(Alias::new(source.column.as_str()))
        .from(Alias::new(source.table.as_str()))
        .to_owned()
}

async fn close(conn: DatabaseConnection, label: &str) {
    if let Err(e) = conn.close().await {
        debug!(db = label, error = %e, "Closing connection failed");
    }
}
