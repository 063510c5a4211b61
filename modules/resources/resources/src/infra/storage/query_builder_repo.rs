use async_trait::async_trait;
use resources_sdk::{
    MoveDirection, NewResource, Resource, ResourceError, ResourcePage, ResourceQuery,
    ResourceStore,
};
use sea_orm::sea_query::{
    Alias, Asterisk, Cond, Expr, Func, Order, Query, SelectStatement, SimpleExpr,
};
use sea_orm::{
    ConnectionTrait, DatabaseBackend, DatabaseConnection, DbErr, FromQueryResult, Iterable,
};

use super::entity::{self, Column, Entity as ResourceEntity};
use super::{
    StoreError, StoreResult, begin_reorder, clamp_bind, finish_reorder, now, search_condition,
};

/// Store that builds statements with `sea-query` and maps rows through
/// `FromQueryResult`.
pub struct QueryBuilderResourceStore {
    conn: DatabaseConnection,
}

impl QueryBuilderResourceStore {
    #[must_use]
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn backend(&self) -> DatabaseBackend {
        self.conn.get_database_backend()
    }

    async fn fetch_one<C: ConnectionTrait>(
        conn: &C,
        select: &SelectStatement,
    ) -> StoreResult<Option<entity::Model>> {
        let stmt = conn.get_database_backend().build(select);
        Ok(entity::Model::find_by_statement(stmt).one(conn).await?)
    }

    async fn fetch_all(&self, select: &SelectStatement) -> StoreResult<Vec<Resource>> {
        let stmt = self.backend().build(select);
        let models = entity::Model::find_by_statement(stmt)
            .all(&self.conn)
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn insert(&self, new: NewResource) -> StoreResult<i32> {
        let backend = self.backend();
        let values: Vec<SimpleExpr> = vec![
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

        let mut insert = Query::insert();
        insert
            .into_table(ResourceEntity)
            .columns([
                Column::Alias,
                Column::Route,
                Column::Title,
                Column::Description,
                Column::SysopUserId,
                Column::IsPublic,
                Column::GroupName,
                Column::GroupOrder,
                Column::DisplayOrder,
                Column::MailEnable,
                Column::ShowList,
                Column::MainShowList,
                Column::HeaderHtml,
                Column::FooterHtml,
                Column::AppName,
                Column::Step,
                Column::CreatedBy,
                Column::Created,
            ])
            .values(values)
            .map_err(|e| DbErr::Custom(e.to_string()))?;

        if backend == DatabaseBackend::MySql {
            let res = self.conn.execute(backend.build(&insert)).await?;
            return i32::try_from(res.last_insert_id())
                .map_err(|e| DbErr::Custom(format!("inserted id out of range: {e}")).into());
        }

        insert.returning_col(Column::Id);
        let row = self
            .conn
            .query_one(backend.build(&insert))
            .await?
            .ok_or(DbErr::RecordNotInserted)?;
        Ok(row.try_get("", "Id")?)
    }

    async fn page(&self, query: &ResourceQuery) -> StoreResult<ResourcePage> {
        let cond = search_condition(self.backend(), query);

        let count = Query::select()
            .expr_as(Func::count(Expr::col(Asterisk)), Alias::new("total"))
            .from(ResourceEntity)
            .cond_where(cond.clone())
            .to_owned();
        let total: i64 = self
            .conn
            .query_one(self.backend().build(&count))
            .await?
            .map_or(Ok(0), |row| row.try_get("", "total"))?;
        let total_count = u64::try_from(total).unwrap_or_default();

        if query.page_size == 0 {
            return Ok(ResourcePage {
                items: Vec::new(),
                total_count,
            });
        }

        let mut select = select_columns();
        select.cond_where(cond);
        if query.app_name.is_some() {
            select
                .order_by(Column::GroupOrder, Order::Asc)
                .order_by(Column::Alias, Order::Asc)
                .order_by(Column::Id, Order::Asc);
        } else {
            select.order_by(Column::Id, Order::Desc);
        }
        select
            .limit(clamp_bind(query.page_size))
            .offset(clamp_bind(query.offset()));

        Ok(ResourcePage {
            items: self.fetch_all(&select).await?,
            total_count,
        })
    }
}

#[async_trait]
impl ResourceStore for QueryBuilderResourceStore {
    async fn add(&self, resource: NewResource) -> Result<Resource, ResourceError> {
        let id = self.insert(resource).await?;
        let model = Self::fetch_one(&self.conn, select_columns().and_where(by_id(id)))
            .await?
            .ok_or_else(|| StoreError::Db(DbErr::RecordNotFound(format!("Resources.Id = {id}"))))?;
        Ok(model.into())
    }

    async fn get(&self, id: i32) -> Result<Option<Resource>, ResourceError> {
        let model = Self::fetch_one(&self.conn, select_columns().and_where(by_id(id))).await?;
        Ok(model.map(Into::into))
    }

    async fn list_all(&self) -> Result<Vec<Resource>, ResourceError> {
        let select = select_columns().order_by(Column::Id, Order::Desc).to_owned();
        Ok(self.fetch_all(&select).await?)
    }

    async fn list_by_app(&self, app_name: &str) -> Result<Vec<Resource>, ResourceError> {
        let select = select_columns()
            .and_where(Expr::col(Column::AppName).eq(app_name))
            .order_by(Column::GroupOrder, Order::Asc)
            .order_by(Column::Alias, Order::Asc)
            .order_by(Column::Id, Order::Asc)
            .to_owned();
        Ok(self.fetch_all(&select).await?)
    }

    async fn update(&self, resource: &Resource) -> Result<bool, ResourceError> {
        let r = resource.clone();
        let update = Query::update()
            .table(ResourceEntity)
            .values([
                (Column::Alias, r.alias.into()),
                (Column::Route, r.route.into()),
                (Column::Title, r.title.into()),
                (Column::Description, r.description.into()),
                (Column::SysopUserId, r.sysop_user_id.into()),
                (Column::IsPublic, r.is_public.into()),
                (Column::GroupName, r.group_name.into()),
                (Column::GroupOrder, r.group_order.into()),
                (Column::DisplayOrder, r.display_order.into()),
                (Column::MailEnable, r.mail_enable.into()),
                (Column::ShowList, r.show_list.into()),
                (Column::MainShowList, r.main_show_list.into()),
                (Column::HeaderHtml, r.header_html.into()),
                (Column::FooterHtml, r.footer_html.into()),
                (Column::AppName, r.app_name.into()),
                (Column::Step, r.step.into()),
                (Column::ModifiedBy, r.modified_by.into()),
                (Column::Modified, now().into()),
            ])
            .and_where(by_id(r.id))
            .to_owned();
        let res = self
            .conn
            .execute(self.backend().build(&update))
            .await
            .map_err(StoreError::from)?;
        Ok(res.rows_affected() > 0)
    }

    async fn delete(&self, id: i32) -> Result<bool, ResourceError> {
        let delete = Query::delete()
            .from_table(ResourceEntity)
            .and_where(by_id(id))
            .to_owned();
        let res = self
            .conn
            .execute(self.backend().build(&delete))
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
    let current = QueryBuilderResourceStore::fetch_one(conn, select_columns().and_where(by_id(id)))
        .await?;
    let Some(current) = current else {
        return Ok(false);
    };
    let Some(order) = current.display_order else {
        return Ok(false);
    };

    let partition = match &current.app_name {
        Some(app) => Expr::col(Column::AppName).eq(app.as_str()),
        None => Expr::col(Column::AppName).is_null(),
    };
    let (beyond, sort) = match direction {
        MoveDirection::Up => (Expr::col(Column::DisplayOrder).lt(order), Order::Desc),
        MoveDirection::Down => (Expr::col(Column::DisplayOrder).gt(order), Order::Asc),
    };
    let select = select_columns()
        .cond_where(Cond::all().add(partition).add(beyond))
        .order_by(Column::DisplayOrder, sort)
        .order_by(Column::Id, Order::Asc)
        .limit(1)
        .to_owned();
    let Some(neighbor) = QueryBuilderResourceStore::fetch_one(conn, &select).await? else {
        return Ok(false);
    };
    let Some(neighbor_order) = neighbor.display_order else {
        return Ok(false);
    };

    set_display_order(conn, id, order, neighbor_order).await?;
    set_display_order(conn, neighbor.id, neighbor_order, order).await?;
    Ok(true)
}

pub(super) async fn set_display_order<C: ConnectionTrait>(
    conn: &C,
    id: i32,
    expected: i32,
    value: i32,
) -> StoreResult<()> {
    let update = Query::update()
        .table(ResourceEntity)
        .value(Column::DisplayOrder, value)
        .and_where(by_id(id))
        .and_where(Expr::col(Column::DisplayOrder).eq(expected))
        .to_owned();
    let res = conn
        .execute(conn.get_database_backend().build(&update))
        .await?;
    if res.rows_affected() == 1 {
        Ok(())
    } else {
        Err(StoreError::Conflict { id })
    }
}

fn select_columns() -> SelectStatement {
    Query::select()
        .columns(Column::iter())
        .from(ResourceEntity)
        .to_owned()
}

fn by_id(id: i32) -> SimpleExpr {
    Expr::col(Column::Id).eq(id)
}
