use async_trait::async_trait;
use resources_sdk::{
    MoveDirection, NewResource, Resource, ResourceError, ResourcePage, ResourceQuery,
    ResourceStore,
};
use sea_orm::{
    ConnectionTrait, DatabaseBackend, DatabaseConnection, DbErr, QueryResult, Statement, Value,
};

use super::{
    StoreError, StoreResult, begin_reorder, entity, finish_reorder, now, search_pattern, to_i64,
};

const COLUMNS: &str = r#""Id", "Alias", "Route", "Title", "Description", "SysopUserId", "IsPublic", "GroupName", "GroupOrder", "DisplayOrder", "MailEnable", "ShowList", "MainShowList", "HeaderHtml", "FooterHtml", "AppName", "Step", "CreatedBy", "Created", "ModifiedBy", "Modified""#;

const INSERT: &str = r#"INSERT INTO "Resources" ("Alias", "Route", "Title", "Description", "SysopUserId", "IsPublic", "GroupName", "GroupOrder", "DisplayOrder", "MailEnable", "ShowList", "MainShowList", "HeaderHtml", "FooterHtml", "AppName", "Step", "CreatedBy", "Created") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)"#;

const UPDATE: &str = r#"UPDATE "Resources" SET "Alias" = $1, "Route" = $2, "Title" = $3, "Description" = $4, "SysopUserId" = $5, "IsPublic" = $6, "GroupName" = $7, "GroupOrder" = $8, "DisplayOrder" = $9, "MailEnable" = $10, "ShowList" = $11, "MainShowList" = $12, "HeaderHtml" = $13, "FooterHtml" = $14, "AppName" = $15, "Step" = $16, "ModifiedBy" = $17, "Modified" = $18 WHERE "Id" = $19"#;

const SET_DISPLAY_ORDER: &str =
    r#"UPDATE "Resources" SET "DisplayOrder" = $1 WHERE "Id" = $2 AND "DisplayOrder" = $3"#;

/// Store that executes hand-written SQL.
///
/// Statements are written once with double-quoted identifiers and `$n`
/// placeholders and rewritten for `MySQL`.
pub struct RawSqlResourceStore {
    conn: DatabaseConnection,
}

impl RawSqlResourceStore {
    #[must_use]
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn stmt(&self, sql: &str, values: Vec<Value>) -> Statement {
        stmt_for(self.conn.get_database_backend(), sql, values)
    }

    async fn insert(&self, new: NewResource) -> StoreResult<i32> {
        let backend = self.conn.get_database_backend();
        let values: Vec<Value> = vec![
            new.alias.into(),
            new.route.into(),
            new.title.into(),
            new.description.into(),
            new.sysop_user_id.into(),
            new.is_public.into(),
            new.group_name.into(),
            new.group_order.into(),
            new.display_order.into(),
            new.mail_enable.into(),
            new.show_list.into(),
            new.main_show_list.into(),
            new.header_html.into(),
            new.footer_html.into(),
            new.app_name.into(),
            new.step.into(),
            new.created_by.into(),
            now().into(),
        ];

        if backend == DatabaseBackend::MySql {
            let res = self.conn.execute(self.stmt(INSERT, values)).await?;
            return i32::try_from(res.last_insert_id())
                .map_err(|e| DbErr::Custom(format!("inserted id out of range: {e}")).into());
        }

        let sql = format!(r#"{INSERT} RETURNING "Id""#);
        let row = self
            .conn
            .query_one(self.stmt(&sql, values))
            .await?
            .ok_or(DbErr::RecordNotInserted)?;
        Ok(row.try_get("", "Id")?)
    }

    async fn find(&self, id: i32) -> StoreResult<Option<entity::Model>> {
        let sql = format!(r#"SELECT {COLUMNS} FROM "Resources" WHERE "Id" = $1"#);
        self.conn
            .query_one(self.stmt(&sql, vec![id.into()]))
            .await?
            .map(|row| read_row(&row))
            .transpose()
            .map_err(Into::into)
    }

    async fn fetch_all(&self, sql: &str, values: Vec<Value>) -> StoreResult<Vec<Resource>> {
        let rows = self.conn.query_all(self.stmt(sql, values)).await?;
        rows.iter()
            .map(|row| read_row(row).map(Resource::from))
            .collect::<Result<_, _>>()
            .map_err(Into::into)
    }

    async fn page(&self, query: &ResourceQuery) -> StoreResult<ResourcePage> {
        let backend = self.conn.get_database_backend();
        let mut clauses = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(app) = &query.app_name {
            values.push(app.as_str().into());
            clauses.push(format!(r#""AppName" = ${}"#, values.len()));
        }
        if let Some(pattern) = search_pattern(backend, query.search.as_deref()) {
            values.push(pattern.as_str().into());
            let title = values.len();
            values.push(pattern.into());
            let description = values.len();
            clauses.push(format!(
                r#"(LOWER("Title") LIKE ${title} ESCAPE '!' OR LOWER("Description") LIKE ${description} ESCAPE '!')"#
            ));
        }
        let filter = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };

        let count_sql = format!(r#"SELECT COUNT(*) AS "Total" FROM "Resources"{filter}"#);
        let total: i64 = self
            .conn
            .query_one(self.stmt(&count_sql, values.clone()))
            .await?
            .map_or(Ok(0), |row| row.try_get("", "Total"))?;
        let total_count = u64::try_from(total).unwrap_or_default();

        if query.page_size == 0 {
            return Ok(ResourcePage {
                items: Vec::new(),
                total_count,
            });
        }

        let order = if query.app_name.is_some() {
            r#""GroupOrder", "Alias", "Id""#
        } else {
            r#""Id" DESC"#
        };
        values.push(to_i64(query.page_size).into());
        let limit = values.len();
        values.push(to_i64(query.offset()).into());
        let offset = values.len();
        let sql = format!(
            r#"SELECT {COLUMNS} FROM "Resources"{filter} ORDER BY {order} LIMIT ${limit} OFFSET ${offset}"#
        );

        Ok(ResourcePage {
            items: self.fetch_all(&sql, values).await?,
            total_count,
        })
    }
}

#[async_trait]
impl ResourceStore for RawSqlResourceStore {
    async fn add(&self, resource: NewResource) -> Result<Resource, ResourceError> {
        let id = self.insert(resource).await?;
        let model = self
            .find(id)
            .await?
            .ok_or_else(|| StoreError::Db(DbErr::RecordNotFound(format!("Resources.Id = {id}"))))?;
        Ok(model.into())
    }

    async fn get(&self, id: i32) -> Result<Option<Resource>, ResourceError> {
        Ok(self.find(id).await?.map(Into::into))
    }

    async fn list_all(&self) -> Result<Vec<Resource>, ResourceError> {
        let sql = format!(r#"SELECT {COLUMNS} FROM "Resources" ORDER BY "Id" DESC"#);
        Ok(self.fetch_all(&sql, Vec::new()).await?)
    }

    async fn list_by_app(&self, app_name: &str) -> Result<Vec<Resource>, ResourceError> {
        let sql = format!(
            r#"SELECT {COLUMNS} FROM "Resources" WHERE "AppName" = $1 ORDER BY "GroupOrder", "Alias", "Id""#
        );
        Ok(self.fetch_all(&sql, vec![app_name.into()]).await?)
    }

    async fn update(&self, resource: &Resource) -> Result<bool, ResourceError> {
        let r = resource.clone();
        let values: Vec<Value> = vec![
            r.alias.into(),
            r.route.into(),
            r.title.into(),
            r.description.into(),
            r.sysop_user_id.into(),
            r.is_public.into(),
            r.group_name.into(),
            r.group_order.into(),
            r.display_order.into(),
            r.mail_enable.into(),
            r.show_list.into(),
            r.main_show_list.into(),
            r.header_html.into(),
            r.footer_html.into(),
            r.app_name.into(),
            r.step.into(),
            r.modified_by.into(),
            now().into(),
            r.id.into(),
        ];
        let res = self
            .conn
            .execute(self.stmt(UPDATE, values))
            .await
            .map_err(StoreError::from)?;
        Ok(res.rows_affected() > 0)
    }

    async fn delete(&self, id: i32) -> Result<bool, ResourceError> {
        let res = self
            .conn
            .execute(self.stmt(r#"DELETE FROM "Resources" WHERE "Id" = $1"#, vec![id.into()]))
            .await
            .map_err(StoreError::from)?;
        Ok(res.rows_affected() > 0)
    }

    async fn search(&self, query: &ResourceQuery) -> Result<ResourcePage, ResourceError> {
        Ok(self.page(query).await?)
    }

    async fn reorder(&self, id: i32, direction: MoveDirection) -> Result<bool, ResourceError> {
        let txn = begin_reorder(&self.conn).await?;
        let result = swap_with_neighbor(&txn, id, direction).await;
        Ok(finish_reorder(txn, result).await?)
    }
}

async fn swap_with_neighbor<C: ConnectionTrait>(
    conn: &C,
    id: i32,
    direction: MoveDirection,
) -> StoreResult<bool> {
    let backend = conn.get_database_backend();
    let current = conn
        .query_one(stmt_for(
            backend,
            r#"SELECT "AppName", "DisplayOrder" FROM "Resources" WHERE "Id" = $1"#,
            vec![id.into()],
        ))
        .await?;
    let Some(current) = current else {
        return Ok(false);
    };
    let Some(order): Option<i32> = current.try_get("", "DisplayOrder")? else {
        return Ok(false);
    };
    let app: Option<String> = current.try_get("", "AppName")?;

    let (partition, mut values): (&str, Vec<Value>) = match app {
        Some(app) => (r#""AppName" = $1"#, vec![app.into()]),
        None => (r#""AppName" IS NULL"#, Vec::new()),
    };
    values.push(order.into());
    let (cmp, sort) = match direction {
        MoveDirection::Up => ("<", "DESC"),
        MoveDirection::Down => (">", "ASC"),
    };
    let sql = format!(
        r#"SELECT "Id", "DisplayOrder" FROM "Resources" WHERE {partition} AND "DisplayOrder" {cmp} ${n} ORDER BY "DisplayOrder" {sort}, "Id" LIMIT 1"#,
        n = values.len()
    );
    let Some(neighbor) = conn.query_one(stmt_for(backend, &sql, values)).await? else {
        return Ok(false);
    };
    let neighbor_id: i32 = neighbor.try_get("", "Id")?;
    let neighbor_order: i32 = neighbor.try_get("", "DisplayOrder")?;

    set_display_order(conn, id, order, neighbor_order).await?;
    set_display_order(conn, neighbor_id, neighbor_order, order).await?;
    Ok(true)
}

pub(super) async fn set_display_order<C: ConnectionTrait>(
    conn: &C,
    id: i32,
    expected: i32,
    value: i32,
) -> StoreResult<()> {
    let res = conn
        .execute(stmt_for(
            conn.get_database_backend(),
            SET_DISPLAY_ORDER,
            vec![value.into(), id.into(), expected.into()],
        ))
        .await?;
    if res.rows_affected() == 1 {
        Ok(())
    } else {
        Err(StoreError::Conflict { id })
    }
}

fn stmt_for(backend: DatabaseBackend, sql: &str, values: Vec<Value>) -> Statement {
    Statement::from_sql_and_values(backend, to_dialect(backend, sql), values)
}

/// Rewrite `"ident"` quoting and `$n` placeholders for `MySQL`.
///
/// Placeholders must appear in ascending order, each exactly once.
fn to_dialect(backend: DatabaseBackend, sql: &str) -> String {
    if backend != DatabaseBackend::MySql {
        return sql.to_owned();
    }
    let mut out = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => out.push('`'),
            '$' => {
                out.push('?');
                while chars.next_if(char::is_ascii_digit).is_some() {}
            }
            _ => out.push(c),
        }
    }
    out
}

fn read_row(row: &QueryResult) -> Result<entity::Model, DbErr> {
    Ok(entity::Model {
        id: row.try_get("", "Id")?,
        alias: row.try_get("", "Alias")?,
        route: row.try_get("", "Route")?,
        title: row.try_get("", "Title")?,
        description: row.try_get("", "Description")?,
        sysop_user_id: row.try_get("", "SysopUserId")?,
        is_public: row.try_get("", "IsPublic")?,
        group_name: row.try_get("", "GroupName")?,
        group_order: row.try_get("", "GroupOrder")?,
        display_order: row.try_get("", "DisplayOrder")?,
        mail_enable: row.try_get("", "MailEnable")?,
        show_list: row.try_get("", "ShowList")?,
        main_show_list: row.try_get("", "MainShowList")?,
        header_html: row.try_get("", "HeaderHtml")?,
        footer_html: row.try_get("", "FooterHtml")?,
        app_name: row.try_get("", "AppName")?,
        step: row.try_get("", "Step")?,
        created_by: row.try_get("", "CreatedBy")?,
        created: row.try_get("", "Created")?,
        modified_by: row.try_get("", "ModifiedBy")?,
        modified: row.try_get("", "Modified")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_untouched_for_postgres_and_sqlite() {
        let sql = r#"SELECT "Id" FROM "Resources" WHERE "Id" = $1"#;
        assert_eq!(to_dialect(DatabaseBackend::Postgres, sql), sql);
        assert_eq!(to_dialect(DatabaseBackend::Sqlite, sql), sql);
    }

    #[test]
    fn test_dialect_rewrites_for_mysql() {
        let sql = r#"UPDATE "Resources" SET "DisplayOrder" = $1 WHERE "Id" = $2 AND "Step" = $10"#;
        assert_eq!(
            to_dialect(DatabaseBackend::MySql, sql),
            "UPDATE `Resources` SET `DisplayOrder` = ? WHERE `Id` = ? AND `Step` = ?"
        );
    }

    #[test]
    fn test_statement_placeholders_match_values() {
        assert_eq!(INSERT.matches('$').count(), 18);
        assert_eq!(UPDATE.matches('$').count(), 19);
    }
}
