#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use chrono::DateTime;
use crudlink::config::ApiConfig;
use crudlink::routes::{ApiState, resource_routes};
use crudlink::routing::RouteTable;
use sea_orm::{ActiveValue, Database, DatabaseConnection, DbErr, EntityTrait, Schema};
use sea_orm_migration::prelude::*;
use serde_json::Value;
use tower::ServiceExt;

pub mod item_entity;
pub mod owner_entity;

use item_entity::Item;

pub const BASE_URL: &str = "http://api.test";
pub const ITEMS_PATH: &str = "/api/v1/items";
pub const OWNERS_PATH: &str = "/api/v1/owners";
pub const OWNER_NAMES: [&str; 3] = ["alice", "bob", "carol"];

/// Route library logs to the test output; safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    init_tracing();
    let db = Database::connect("sqlite::memory:").await?;

    // Run migrations
    Migrator::up(&db, None).await?;

    Ok(db)
}

/// Database with the three owners and `count` items.
///
/// Item `i` (1-based) is named `foo item i` up to 560 and `other item i`
/// after, has priority 3 or 4 up to 580 and 1 after, status `done` when `i`
/// is a multiple of 3, owner `i % 3 + 1` and `updated_at` of
/// `1_000_000_000 + i * 1000` seconds.
pub async fn setup_seeded_db(count: i32) -> Result<DatabaseConnection, DbErr> {
    let db = setup_test_db().await?;

    let owners = OWNER_NAMES.iter().map(|name| owner_entity::ActiveModel {
        id: ActiveValue::NotSet,
        name: ActiveValue::Set((*name).to_string()),
    });
    owner_entity::Entity::insert_many(owners).exec(&db).await?;

    let items: Vec<item_entity::ActiveModel> = (1..=count).map(seed_item).collect();
    for chunk in items.chunks(100) {
        item_entity::Entity::insert_many(chunk.to_vec()).exec(&db).await?;
    }

    Ok(db)
}

fn seed_item(i: i32) -> item_entity::ActiveModel {
    let name = if i <= 560 {
        format!("foo item {i}")
    } else {
        format!("other item {i}")
    };
    let priority = if i <= 580 { 3 + i % 2 } else { 1 };
    let status = if i % 3 == 0 { "done" } else { "open" };

    item_entity::ActiveModel {
        id: ActiveValue::NotSet,
        name: ActiveValue::Set(name),
        status: ActiveValue::Set(status.to_string()),
        priority: ActiveValue::Set(priority),
        owner_id: ActiveValue::Set(i % 3 + 1),
        updated_at: ActiveValue::Set(
            DateTime::from_timestamp(1_000_000_000 + i64::from(i) * 1000, 0).unwrap(),
        ),
    }
}

pub fn setup_route_table(config: &ApiConfig) -> RouteTable {
    RouteTable::from_config(config)
        .unwrap()
        .register_resource("Item", ITEMS_PATH)
        .register_resource("Owner", OWNERS_PATH)
}

pub fn setup_test_app(db: DatabaseConnection) -> Router {
    setup_test_app_with_config(db, ApiConfig::default().with_base_url(BASE_URL))
}

pub fn setup_test_app_with_config(db: DatabaseConnection, config: ApiConfig) -> Router {
    let routes = setup_route_table(&config);
    let state = ApiState::new(db, routes, config);
    resource_routes::<Item>(ITEMS_PATH).with_state(state)
}

/// Send a request and decode the JSON body.
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

pub async fn post(app: &Router, uri: &str, body: impl Into<Body>) -> (StatusCode, Value) {
    send_json(app, "POST", uri, body).await
}

/// Send a JSON body with any method.
pub async fn send_json(app: &Router, method: &str, uri: &str, body: impl Into<Body>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap();
    send(app, request).await
}

pub async fn delete(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// Ids of the records in a list response.
pub fn record_ids(body: &Value) -> Vec<i64> {
    body["records"]
        .as_array()
        .unwrap()
        .iter()
        .map(|record| record["id"].as_i64().unwrap())
        .collect()
}

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(CreateTables)]
    }
}

pub struct CreateTables;

impl MigrationName for CreateTables {
    fn name(&self) -> &'static str {
        "m20240101_000001_create_owners_and_items"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for CreateTables {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let schema = Schema::new(manager.get_database_backend());
        manager
            .create_table(schema.create_table_from_entity(owner_entity::Entity))
            .await?;
        manager
            .create_table(schema.create_table_from_entity(item_entity::Entity))
            .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(item_entity::Entity).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(owner_entity::Entity).to_owned())
            .await?;
        Ok(())
    }
}
