//! Seed reconciliation: make sure every catalog entry exists as a row.

use std::sync::Arc;

use resources_sdk::NewResource;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, TransactionTrait,
};
use tracing::{debug, info, warn};

use super::catalog::{SeedCatalog, SeedEntry};
use crate::error::InitError;
use crate::infra::storage::entity::{self, Column, Entity as ResourceEntity};
use crate::infra::storage::now;

/// Rows touched by one seeding call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub inserted: u64,
    /// Catalog entries applied to rows that already existed.
    pub refreshed: u64,
}

impl std::ops::AddAssign for SeedReport {
    fn add_assign(&mut self, rhs: Self) {
        self.inserted += rhs.inserted;
        self.refreshed += rhs.refreshed;
    }
}

/// Applies a [`SeedCatalog`] to one database.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeedReconciler;

impl SeedReconciler {
    /// Insert missing catalog entries and refresh existing ones.
    ///
    /// Rows are matched on exact `(Alias, AppName)`. A new row gets the
    /// visibility defaults, `GroupName = AppName` and
    /// `DisplayOrder = GroupOrder`. An existing row only has `GroupOrder`,
    /// `DisplayOrder`, `Title`, `Route` and `Description` refreshed, so
    /// operator edits to other columns survive.
    ///
    /// `app_filter` restricts seeding to applications whose name matches it
    /// ignoring case. The whole call runs in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `InitError::Seed` if any statement fails; nothing from this
    /// call is kept in that case.
    pub async fn seed(
        conn: &DatabaseConnection,
        catalog: &SeedCatalog,
        app_filter: Option<&str>,
    ) -> Result<SeedReport, InitError> {
        let label = app_filter.unwrap_or("*");
        let fail = |source: DbErr| InitError::Seed {
            app: label.to_owned(),
            source,
        };

        let txn = conn.begin().await.map_err(fail)?;
        match apply(&txn, catalog, app_filter).await {
            Ok(report) => {
                txn.commit().await.map_err(fail)?;
                if report == SeedReport::default() {
                    warn!(app = label, "No catalog entries matched the application filter");
                } else {
                    info!(
                        app = label,
                        inserted = report.inserted,
                        refreshed = report.refreshed,
                        "Seeded resources"
                    );
                }
                Ok(report)
            }
            Err(source) => {
                if let Err(e) = txn.rollback().await {
                    warn!(app = label, error = %e, "Rollback after failed seeding failed");
                }
                Err(fail(source))
            }
        }
    }
}

async fn apply<C: ConnectionTrait>(
    conn: &C,
    catalog: &SeedCatalog,
    app_filter: Option<&str>,
) -> Result<SeedReport, DbErr> {
    let created = now();
    let mut report = SeedReport::default();

    for (app, entry) in catalog.entries(app_filter) {
        let matching = ResourceEntity::find()
            .filter(Column::Alias.eq(entry.alias.as_str()))
            .filter(Column::AppName.eq(app))
            .count(conn)
            .await?;

        if matching == 0 {
            ResourceEntity::insert(entity::insert_model(new_resource(app, entry), created))
                .exec(conn)
                .await?;
            debug!(app, alias = %entry.alias, "Inserted resource");
            report.inserted += 1;
        } else {
            ResourceEntity::update_many()
                .col_expr(Column::GroupOrder, Expr::value(entry.group_order))
                .col_expr(Column::DisplayOrder, Expr::value(entry.group_order))
                .col_expr(Column::Title, Expr::value(entry.title.as_str()))
                .col_expr(Column::Route, Expr::value(entry.route.as_str()))
                .col_expr(Column::Description, Expr::value(entry.description.as_str()))
                .filter(Column::Alias.eq(entry.alias.as_str()))
                .filter(Column::AppName.eq(app))
                .exec(conn)
                .await?;
            report.refreshed += 1;
        }
    }

    Ok(report)
}

fn new_resource(app: &str, entry: &SeedEntry) -> NewResource {
    NewResource {
        alias: entry.alias.clone(),
        route: entry.route.clone(),
        title: entry.title.clone(),
        description: entry.description.clone(),
        is_public: true,
        group_name: Some(app.to_owned()),
        group_order: entry.group_order,
        display_order: entry.group_order,
        show_list: true,
        main_show_list: true,
        app_name: app.to_owned(),
        step: entry.step,
        ..NewResource::default()
    }
}

/// A catalog bound to the configured application allow-list.
#[derive(Debug, Clone)]
pub struct SeedPlan {
    pub catalog: Arc<SeedCatalog>,
    /// Empty seeds every application in one call.
    pub app_names: Vec<String>,
}

impl SeedPlan {
    #[must_use]
    pub fn new(catalog: SeedCatalog, app_names: Vec<String>) -> Self {
        Self {
            catalog: Arc::new(catalog),
            app_names,
        }
    }

    /// Seed one database according to the plan.
    ///
    /// # Errors
    ///
    /// Returns the first `InitError::Seed`; applications seeded before it
    /// stay committed.
    pub async fn apply(&self, conn: &DatabaseConnection) -> Result<SeedReport, InitError> {
        if self.app_names.is_empty() {
            return SeedReconciler::seed(conn, &self.catalog, None).await;
        }
        let mut total = SeedReport::default();
        for app in &self.app_names {
            total += SeedReconciler::seed(conn, &self.catalog, Some(app)).await?;
        }
        Ok(total)
    }
}
