#![allow(clippy::unwrap_used, clippy::expect_used)]
#![allow(dead_code)]

//! Shared fixtures for the resources integration tests.

use std::path::Path;

use resources::{ConnectOpts, SchemaReconciler, SeedCatalog, SeedReconciler, connect};
use resources_sdk::{NewResource, ResourceStore};
use sea_orm::{ConnectionTrait, DatabaseConnection};

pub const MEMORY_DSN: &str = "sqlite::memory:";

/// A private in-memory database.
pub async fn memory_db() -> DatabaseConnection {
    connect(MEMORY_DSN, &ConnectOpts::default()).await.unwrap()
}

/// A private in-memory database with the `Resources` table in place.
pub async fn reconciled_db() -> DatabaseConnection {
    let conn = memory_db().await;
    SchemaReconciler::reconcile(&conn).await.unwrap();
    conn
}

/// A reconciled database seeded with the built-in catalog.
pub async fn seeded_db() -> DatabaseConnection {
    let conn = reconciled_db().await;
    let catalog = SeedCatalog::builtin().unwrap();
    SeedReconciler::seed(&conn, &catalog, None).await.unwrap();
    conn
}

/// DSN of a `SQLite` file under `dir`, created on first connect.
pub fn sqlite_file_dsn(dir: &Path, name: &str) -> String {
    format!("sqlite://{}", dir.join(name).display())
}

pub async fn exec(conn: &DatabaseConnection, sql: &str) {
    conn.execute_unprepared(sql).await.unwrap();
}

pub fn resource(app: &str, alias: &str, display_order: i32) -> NewResource {
    NewResource {
        alias: alias.to_owned(),
        title: alias.to_owned(),
        route: format!("/{alias}"),
        description: format!("{alias} page"),
        group_order: display_order,
        display_order,
        app_name: app.to_owned(),
        ..NewResource::default()
    }
}

/// Display orders of one application, sorted.
pub async fn display_orders(store: &dyn ResourceStore, app: &str) -> Vec<Option<i32>> {
    let mut orders: Vec<Option<i32>> = store
        .list_by_app(app)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.display_order)
        .collect();
    orders.sort_unstable();
    orders
}
