use chrono::{FixedOffset, TimeZone};
use resources_sdk::{Resource, ResourceError, ResourceQuery};
use sea_orm::{DbBackend, DbErr, EntityTrait, QueryFilter, QueryTrait};

use super::{StoreError, StoreKind, entity, search_condition, search_pattern};

fn null_row(id: i32) -> entity::Model {
    entity::Model {
        id,
        alias: None,
        route: None,
        title: None,
        description: None,
        sysop_user_id: None,
        is_public: None,
        group_name: None,
        group_order: None,
        display_order: None,
        mail_enable: None,
        show_list: None,
        main_show_list: None,
        header_html: None,
        footer_html: None,
        app_name: None,
        step: None,
        created_by: None,
        created: None,
        modified_by: None,
        modified: None,
    }
}

#[test]
fn test_null_columns_read_as_defaults() {
    let resource: Resource = null_row(3).into();

    assert_eq!(resource.id, 3);
    assert_eq!(resource.alias, "");
    assert_eq!(resource.title, "");
    assert_eq!(resource.app_name, "");
    assert!(resource.is_public);
    assert!(!resource.mail_enable);
    assert!(resource.show_list);
    assert!(resource.main_show_list);
    assert_eq!(resource.step, 0);
    assert_eq!(resource.display_order, None);
    assert_eq!(resource.group_order, None);
}

#[test]
fn test_entity_to_resource_conversion() {
    let created = FixedOffset::east_opt(9 * 3600)
        .unwrap()
        .with_ymd_and_hms(2024, 3, 1, 10, 30, 0)
        .unwrap();
    let model = entity::Model {
        alias: Some("Home".to_owned()),
        route: Some("/".to_owned()),
        title: Some("Home".to_owned()),
        description: Some("Main landing page".to_owned()),
        is_public: Some(false),
        group_name: Some("VisualAcademy".to_owned()),
        group_order: Some(1),
        display_order: Some(4),
        app_name: Some("VisualAcademy".to_owned()),
        step: Some(2),
        created: Some(created),
        ..null_row(11)
    };

    let resource: Resource = model.into();

    assert_eq!(resource.alias, "Home");
    assert_eq!(resource.route, "/");
    assert!(!resource.is_public);
    assert_eq!(resource.group_name.as_deref(), Some("VisualAcademy"));
    assert_eq!(resource.group_order, Some(1));
    assert_eq!(resource.display_order, Some(4));
    assert_eq!(resource.step, 2);
    assert_eq!(resource.created, Some(created));
}

#[test]
fn test_search_pattern() {
    let sqlite = DbBackend::Sqlite;
    assert_eq!(search_pattern(sqlite, None), None);
    assert_eq!(search_pattern(sqlite, Some("")), None);
    assert_eq!(search_pattern(sqlite, Some("   \t")), None);
    assert_eq!(
        search_pattern(sqlite, Some(" Admin ")),
        Some("%admin%".to_owned())
    );
    assert_eq!(
        search_pattern(sqlite, Some("50%_off!")),
        Some("%50!%!_off!!%".to_owned())
    );
}

#[test]
fn test_search_pattern_folds_like_backend_lower() {
    // "\u{c9}COLE" is "ÉCOLE"; SQLite's LOWER() leaves the accented capital alone.
    assert_eq!(
        search_pattern(DbBackend::Sqlite, Some("\u{c9}COLE")),
        Some("%\u{c9}cole%".to_owned())
    );
    assert_eq!(
        search_pattern(DbBackend::Postgres, Some("\u{c9}COLE")),
        Some("%\u{e9}cole%".to_owned())
    );
    assert_eq!(
        search_pattern(DbBackend::MySql, Some("\u{c9}COLE")),
        Some("%\u{e9}cole%".to_owned())
    );
}

#[test]
fn test_search_condition_sql() {
    let query = ResourceQuery::new(0, 5)
        .in_app("VisualAcademy")
        .with_search("Admin");
    let sql = entity::Entity::find()
        .filter(search_condition(DbBackend::Sqlite, &query))
        .build(DbBackend::Sqlite)
        .to_string();

    assert!(sql.contains(r#""AppName" = 'VisualAcademy'"#), "{sql}");
    assert!(sql.contains(r#"LOWER("Title") LIKE '%admin%' ESCAPE '!'"#), "{sql}");
    assert!(sql.contains(r#"LOWER("Description") LIKE '%admin%' ESCAPE '!'"#), "{sql}");
}

#[test]
fn test_blank_search_adds_no_condition() {
    let query = ResourceQuery::new(0, 5).with_search("  ");
    let sql = entity::Entity::find()
        .filter(search_condition(DbBackend::Postgres, &query))
        .build(DbBackend::Postgres)
        .to_string();

    assert!(!sql.contains("WHERE"), "{sql}");
}

#[test]
fn test_store_error_conversion() {
    let err: ResourceError = StoreError::Conflict { id: 5 }.into();
    assert_eq!(err, ResourceError::ReorderConflict { id: 5 });

    let err: ResourceError = StoreError::Db(DbErr::Custom("boom".to_owned())).into();
    assert!(matches!(err, ResourceError::Database { ref message } if message.contains("boom")));
}

#[test]
fn test_store_kind_names() {
    let names: Vec<String> = StoreKind::ALL.iter().map(ToString::to_string).collect();
    assert_eq!(names, ["raw_sql", "query_builder", "orm"]);
    assert_eq!(StoreKind::default(), StoreKind::Orm);
}
