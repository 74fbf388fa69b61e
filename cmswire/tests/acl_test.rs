//! Integration tests for building permission snapshots

mod common;

use serde_json::json;

use cmswire::application::AccessControlBuilder;
use cmswire::domain::{Permission, TableNames};
use cmswire::infrastructure::memory::{MemoryDatabase, MemorySession};

use common::row;

fn seeded_db() -> MemoryDatabase {
    MemoryDatabase::from_json(
        &json!({
            "tables": {
                "directus_tables": [
                    {"table_name": "articles", "user_create_column": "author"},
                    {"table_name": "pages", "user_create_column": ""},
                    {"table_name": "tags"}
                ],
                "directus_users": [
                    {"id": 1, "email": "admin@example.com", "group": 1},
                    {"id": 2, "email": "orphan@example.com"}
                ],
                "directus_privileges": [
                    {"table_name": "articles", "group_id": 1, "allow_view": 1, "allow_add": 1,
                     "allow_edit": "1", "allow_delete": 0, "allow_alter": false,
                     "read_field_blacklist": "secret, internal", "write_field_blacklist": "author"},
                    {"table_name": "pages", "group_id": 2, "allow_view": 1}
                ]
            }
        })
        .to_string(),
    )
    .unwrap()
}

#[test]
fn given_logged_in_user_when_building_then_loads_group_privileges() {
    // Arrange
    let db = seeded_db();
    let session = MemorySession::logged_in_as(1);
    let builder = AccessControlBuilder::new(TableNames::default());

    // Act
    let acl = builder.build(&db, &session).unwrap();

    // Assert
    assert_eq!(acl.user_id(), Some(1));
    assert_eq!(acl.group_id(), Some(1));
    assert!(acl.can("articles", Permission::View));
    assert!(acl.can("articles", Permission::Edit));
    assert!(!acl.can("articles", Permission::Delete));
    assert!(!acl.can("pages", Permission::View), "other group's rows ignored");
    assert_eq!(
        acl.privileges("articles").unwrap().read_field_blacklist,
        vec!["secret", "internal"]
    );
}

#[test]
fn given_table_definitions_when_building_then_records_non_empty_owner_columns() {
    let db = seeded_db();
    let builder = AccessControlBuilder::new(TableNames::default());

    let acl = builder.build(&db, &MemorySession::new()).unwrap();

    assert_eq!(acl.owner_column("articles"), Some("author"));
    assert_eq!(acl.owner_column("pages"), None);
    assert_eq!(acl.owner_columns().len(), 1);
}

#[test]
fn given_anonymous_session_when_building_then_default_deny() {
    let db = seeded_db();
    let builder = AccessControlBuilder::new(TableNames::default());

    let acl = builder.build(&db, &MemorySession::new()).unwrap();

    assert!(acl.group_privileges().is_none());
    assert!(!acl.can("articles", Permission::View));
}

#[test]
fn given_session_user_without_row_when_building_then_no_privileges() {
    let db = seeded_db();
    let builder = AccessControlBuilder::new(TableNames::default());

    let acl = builder
        .build(&db, &MemorySession::logged_in_as(404))
        .unwrap();

    assert_eq!(acl.user_id(), None);
    assert!(acl.group_privileges().is_none());
    assert!(!acl.can("articles", Permission::View));
}

#[test]
fn given_deleted_user_with_authored_rows_when_checking_ownership_then_not_owner() {
    // Arrange
    let db = seeded_db();
    let acl = AccessControlBuilder::new(TableNames::default())
        .build(&db, &MemorySession::logged_in_as(9))
        .unwrap();
    let authored = row(json!({"id": 7, "author": 9, "title": "left behind"}));

    // Act
    let owns = acl.owns("articles", &authored);

    // Assert
    assert!(!owns);
    assert_eq!(acl.user_id(), None);
    assert!(!acl.can("articles", Permission::Edit));
}

#[test]
fn given_user_without_group_when_building_then_default_deny() {
    let db = seeded_db();
    let builder = AccessControlBuilder::new(TableNames::default());

    let acl = builder.build(&db, &MemorySession::logged_in_as(2)).unwrap();

    assert_eq!(acl.group_id(), None);
    assert!(!acl.can("articles", Permission::View));
}

#[test]
fn given_snapshot_when_checking_rows_then_applies_ownership_and_blacklists() {
    // Arrange
    let db = seeded_db();
    let acl = AccessControlBuilder::new(TableNames::default())
        .build(&db, &MemorySession::logged_in_as(1))
        .unwrap();
    let own = row(json!({"id": 5, "author": 1, "title": "t", "secret": "s"}));
    let foreign = row(json!({"id": 6, "author": 2}));

    // Act
    let visible = acl.readable("articles", own.clone());

    // Assert
    assert!(acl.owns("articles", &own));
    assert!(!acl.owns("articles", &foreign));
    assert!(!visible.contains_key("secret"));
    assert!(visible.contains_key("title"));
    assert_eq!(acl.blocked_write_fields("articles", &own), vec!["author"]);
    assert!(acl.readable("tags", own).is_empty());
}
