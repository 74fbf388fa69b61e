//! Integration tests for message attachment splicing

mod common;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::json;

use cmswire::application::services::{FileFilters, MessageFilters};
use cmswire::application::{HookEmitter, TableGateway};
use cmswire::config::FilesystemConfig;
use cmswire::domain::{Row, TableNames};
use cmswire::infrastructure::embed::EmbedManager;
use cmswire::infrastructure::memory::MemoryDatabase;
use cmswire::infrastructure::traits::{RealFileSystem, Select};

use common::{emitter, row};

fn database() -> Arc<MemoryDatabase> {
    let mut tables: BTreeMap<String, Vec<Row>> = BTreeMap::new();
    tables.insert(
        "directus_files".into(),
        vec![
            row(json!({"id": 1, "name": "one.png"})),
            row(json!({"id": 2, "name": "two.png"})),
            row(json!({"id": 3, "name": "three.png"})),
        ],
    );
    tables.insert(
        "directus_messages".into(),
        vec![
            row(json!({"id": 10, "subject": "hi", "attachment": "3,1"})),
            row(json!({"id": 11, "subject": "plain"})),
            row(json!({"id": 12, "subject": "gone", "attachment": "2, 99"})),
        ],
    );
    Arc::new(MemoryDatabase::with_tables(tables))
}

fn wire(db: &Arc<MemoryDatabase>) -> Arc<HookEmitter> {
    let (hooks, _) = emitter();
    let tables = TableNames::default();
    Arc::new(FileFilters::new(
        Arc::new(RealFileSystem),
        FilesystemConfig::default(),
        Arc::new(EmbedManager::new()),
        tables.clone(),
    ))
    .register(&hooks);
    Arc::new(MessageFilters::new(
        db.clone(),
        Arc::downgrade(&hooks),
        tables,
    ))
    .register(&hooks);
    hooks
}

#[test]
fn given_message_with_attachments_when_selecting_then_file_rows_spliced_in_id_order() {
    // Arrange
    let db = database();
    let hooks = wire(&db);
    let gateway = TableGateway::new("directus_messages", db, hooks, Some(1));

    // Act
    let rows = gateway
        .select(Select::from("directus_messages").eq("id", 10))
        .unwrap();

    // Assert
    let attachments = rows[0].get("attachment").unwrap().as_array().unwrap();
    let ids: Vec<_> = attachments.iter().map(|a| a["id"].clone()).collect();
    assert_eq!(ids, vec![json!(3), json!(1)]);
    assert_eq!(attachments[0]["data"]["name"], json!("three.png"));
}

#[test]
fn given_attachments_loaded_when_selecting_then_file_enrichment_applied() {
    let db = database();
    let hooks = wire(&db);
    let gateway = TableGateway::new("directus_messages", db, hooks, None);

    let rows = gateway
        .select(Select::from("directus_messages").eq("id", 10))
        .unwrap();

    let attachment = &rows[0]["attachment"][1];
    assert_eq!(attachment["data"]["url"], json!("/storage/uploads/one.png"));
}

#[test]
fn given_message_without_attachment_when_selecting_then_row_unchanged() {
    let db = database();
    let hooks = wire(&db);
    let gateway = TableGateway::new("directus_messages", db, hooks, None);

    let rows = gateway
        .select(Select::from("directus_messages").eq("id", 11))
        .unwrap();

    assert_eq!(rows[0], row(json!({"id": 11, "subject": "plain"})));
}

#[test]
fn given_dangling_attachment_id_when_selecting_then_only_existing_files_spliced() {
    let db = database();
    let hooks = wire(&db);
    let gateway = TableGateway::new("directus_messages", db, hooks, None);

    let rows = gateway
        .select(Select::from("directus_messages").eq("id", 12))
        .unwrap();

    let attachments = rows[0]["attachment"].as_array().unwrap();
    assert_eq!(attachments.len(), 1);
    assert_eq!(attachments[0]["id"], json!(2));
}
