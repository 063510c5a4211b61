use resources_sdk::{NewResource, Resource};
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::entity::prelude::*;

/// Row of the `Resources` table.
///
/// Every column except the key is nullable: tables created by older schema
/// versions may hold NULLs until the reconciler has normalized them.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "Resources")]
pub struct Model {
    #[sea_orm(primary_key, column_name = "Id")]
    pub id: i32,
    #[sea_orm(column_name = "Alias")]
    pub alias: Option<String>,
    #[sea_orm(column_name = "Route")]
    pub route: Option<String>,
    #[sea_orm(column_name = "Title")]
    pub title: Option<String>,
    #[sea_orm(column_name = "Description")]
    pub description: Option<String>,
    #[sea_orm(column_name = "SysopUserId")]
    pub sysop_user_id: Option<String>,
    #[sea_orm(column_name = "IsPublic")]
    pub is_public: Option<bool>,
    #[sea_orm(column_name = "GroupName")]
    pub group_name: Option<String>,
    #[sea_orm(column_name = "GroupOrder")]
    pub group_order: Option<i32>,
    #[sea_orm(column_name = "DisplayOrder")]
    pub display_order: Option<i32>,
    #[sea_orm(column_name = "MailEnable")]
    pub mail_enable: Option<bool>,
    #[sea_orm(column_name = "ShowList")]
    pub show_list: Option<bool>,
    #[sea_orm(column_name = "MainShowList")]
    pub main_show_list: Option<bool>,
    #[sea_orm(column_name = "HeaderHtml", column_type = "Text")]
    pub header_html: Option<String>,
    #[sea_orm(column_name = "FooterHtml", column_type = "Text")]
    pub footer_html: Option<String>,
    #[sea_orm(column_name = "AppName")]
    pub app_name: Option<String>,
    #[sea_orm(column_name = "Step")]
    pub step: Option<i32>,
    #[sea_orm(column_name = "CreatedBy")]
    pub created_by: Option<String>,
    #[sea_orm(column_name = "Created")]
    pub created: Option<DateTimeWithTimeZone>,
    #[sea_orm(column_name = "ModifiedBy")]
    pub modified_by: Option<String>,
    #[sea_orm(column_name = "Modified")]
    pub modified: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Resource {
    fn from(m: Model) -> Self {
        Self {
            id: m.id,
            alias: m.alias.unwrap_or_default(),
            route: m.route.unwrap_or_default(),
            title: m.title.unwrap_or_default(),
            description: m.description.unwrap_or_default(),
            sysop_user_id: m.sysop_user_id,
            is_public: m.is_public.unwrap_or(true),
            group_name: m.group_name,
            group_order: m.group_order,
            display_order: m.display_order,
            mail_enable: m.mail_enable.unwrap_or(false),
            show_list: m.show_list.unwrap_or(true),
            main_show_list: m.main_show_list.unwrap_or(true),
            header_html: m.header_html,
            footer_html: m.footer_html,
            app_name: m.app_name.unwrap_or_default(),
            step: m.step.unwrap_or(0),
            created_by: m.created_by,
            created: m.created,
            modified_by: m.modified_by,
            modified: m.modified,
        }
    }
}

/// Insert model for a new row; the key is left to the database.
pub fn insert_model(new: NewResource, created: DateTimeWithTimeZone) -> ActiveModel {
    ActiveModel {
        id: NotSet,
        alias: Set(Some(new.alias)),
        route: Set(Some(new.route)),
        title: Set(Some(new.title)),
        description: Set(Some(new.description)),
        sysop_user_id: Set(new.sysop_user_id),
        is_public: Set(Some(new.is_public)),
        group_name: Set(new.group_name),
        group_order: Set(Some(new.group_order)),
        display_order: Set(Some(new.display_order)),
        mail_enable: Set(Some(new.mail_enable)),
        show_list: Set(Some(new.show_list)),
        main_show_list: Set(Some(new.main_show_list)),
        header_html: Set(new.header_html),
        footer_html: Set(new.footer_html),
        app_name: Set(Some(new.app_name)),
        step: Set(Some(new.step)),
        created_by: Set(new.created_by),
        created: Set(Some(created)),
        modified_by: NotSet,
        modified: NotSet,
    }
}
