use async_trait::async_trait;
use resources_sdk::{
    MoveDirection, NewResource, Resource, ResourceError, ResourcePage, ResourceQuery,
    ResourceStore,
};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};

use super::entity::{self, Column, Entity as ResourceEntity};
use super::{
    StoreError, StoreResult, begin_reorder, clamp_bind, finish_reorder, now, search_condition,
};

/// Store built on entity finders and `ActiveModel` change tracking.
pub struct SeaOrmResourceStore {
    conn: DatabaseConnection,
}

impl SeaOrmResourceStore {
    #[must_use]
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    async fn replace(&self, resource: &Resource) -> StoreResult<bool> {
        let Some(existing) = ResourceEntity::find_by_id(resource.id)
            .one(&self.conn)
            .await?
        else {
            return Ok(false);
        };
        write_back(&self.conn, existing, resource).await
    }

    async fn page(&self, query: &ResourceQuery) -> StoreResult<ResourcePage> {
        let filtered = ResourceEntity::find()
            .filter(search_condition(self.conn.get_database_backend(), query));
        let total_count = filtered.clone().count(&self.conn).await?;

        if query.page_size == 0 {
            return Ok(ResourcePage {
                items: Vec::new(),
                total_count,
            });
        }

        let ordered = if query.app_name.is_some() {
            filtered
                .order_by_asc(Column::GroupOrder)
                .order_by_asc(Column::Alias)
                .order_by_asc(Column::Id)
        } else {
            filtered.order_by_desc(Column::Id)
        };
        let items = ordered
            .offset(clamp_bind(query.offset()))
            .limit(clamp_bind(query.page_size))
            .all(&self.conn)
            .await?;

        Ok(ResourcePage {
            items: items.into_iter().map(Into::into).collect(),
            total_count,
        })
    }
}

#[async_trait]
impl ResourceStore for SeaOrmResourceStore {
    async fn add(&self, resource: NewResource) -> Result<Resource, ResourceError> {
        let model = entity::insert_model(resource, now())
            .insert(&self.conn)
            .await
            .map_err(StoreError::from)?;
        Ok(model.into())
    }

    async fn get(&self, id: i32) -> Result<Option<Resource>, ResourceError> {
        let model = ResourceEntity::find_by_id(id)
            .one(&self.conn)
            .await
            .map_err(StoreError::from)?;
        Ok(model.map(Into::into))
    }

    async fn list_all(&self) -> Result<Vec<Resource>, ResourceError> {
        let models = ResourceEntity::find()
            .order_by_desc(Column::Id)
            .all(&self.conn)
            .await
            .map_err(StoreError::from)?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn list_by_app(&self, app_name: &str) -> Result<Vec<Resource>, ResourceError> {
        let models = ResourceEntity::find()
            .filter(Column::AppName.eq(app_name))
            .order_by_asc(Column::GroupOrder)
            .order_by_asc(Column::Alias)
            .order_by_asc(Column::Id)
            .all(&self.conn)
            .await
            .map_err(StoreError::from)?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn update(&self, resource: &Resource) -> Result<bool, ResourceError> {
        Ok(self.replace(resource).await?)
    }

    async fn delete(&self, id: i32) -> Result<bool, ResourceError> {
        let res = ResourceEntity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .map_err(StoreError::from)?;
        Ok(res.rows_affected > 0)
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

/// Apply `resource` on top of the previously read `existing` row.
///
/// A row deleted since it was read is reported as `false`.
pub(super) async fn write_back<C: ConnectionTrait>(
    conn: &C,
    existing: entity::Model,
    resource: &Resource,
) -> StoreResult<bool> {
    let r = resource.clone();
    let mut active = existing.into_active_model();
    active.alias = ActiveValue::Set(Some(r.alias));
    active.route = ActiveValue::Set(Some(r.route));
    active.title = ActiveValue::Set(Some(r.title));
    active.description = ActiveValue::Set(Some(r.description));
    active.sysop_user_id = ActiveValue::Set(r.sysop_user_id);
    active.is_public = ActiveValue::Set(Some(r.is_public));
    active.group_name = ActiveValue::Set(r.group_name);
    active.group_order = ActiveValue::Set(r.group_order);
    active.display_order = ActiveValue::Set(r.display_order);
    active.mail_enable = ActiveValue::Set(Some(r.mail_enable));
    active.show_list = ActiveValue::Set(Some(r.show_list));
    active.main_show_list = ActiveValue::Set(Some(r.main_show_list));
    active.header_html = ActiveValue::Set(r.header_html);
    active.footer_html = ActiveValue::Set(r.footer_html);
    active.app_name = ActiveValue::Set(Some(r.app_name));
    active.step = ActiveValue::Set(Some(r.step));
    active.modified_by = ActiveValue::Set(r.modified_by);
    active.modified = ActiveValue::Set(Some(now()));
    match active.update(conn).await {
        Ok(_) => Ok(true),
        Err(DbErr::RecordNotUpdated) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

async fn swap_with_neighbor<C: ConnectionTrait>(
    conn: &C,
    id: i32,
    direction: MoveDirection,
) -> StoreResult<bool> {
    let Some(current) = ResourceEntity::find_by_id(id).one(conn).await? else {
        return Ok(false);
    };
    let Some(order) = current.display_order else {
        return Ok(false);
    };

    let partition = match &current.app_name {
        Some(app) => Column::AppName.eq(app.as_str()),
        None => Column::AppName.is_null(),
    };
    let neighbors = ResourceEntity::find().filter(partition);
    let neighbor = match direction {
        MoveDirection::Up => neighbors
            .filter(Column::DisplayOrder.lt(order))
            .order_by_desc(Column::DisplayOrder),
        MoveDirection::Down => neighbors
            .filter(Column::DisplayOrder.gt(order))
            .order_by_asc(Column::DisplayOrder),
    }
    .order_by_asc(Column::Id)
    .one(conn)
    .await?;
    let Some(neighbor) = neighbor else {
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
    let res = ResourceEntity::update_many()
        .col_expr(Column::DisplayOrder, Expr::value(value))
        .filter(Column::Id.eq(id))
        .filter(Column::DisplayOrder.eq(expected))
        .exec(conn)
        .await?;
    if res.rows_affected == 1 {
        Ok(())
    } else {
        Err(StoreError::Conflict { id })
    }
}
