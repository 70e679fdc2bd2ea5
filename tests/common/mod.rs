#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use rest_shortcuts::{
    ApiModel, ApiRouter, InjectionTarget, Principal, Serializer, SerializerBuilder,
    ShortcutsConfig, build_model_viewset, register_endpoint,
};
use sea_orm::{Database, DatabaseConnection, DbErr, Schema};
use sea_orm_migration::{MigrationName, MigrationTrait, MigratorTrait, SchemaManager};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

pub mod blog_post;
pub mod comment;

pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect("sqlite::memory:").await?;

    Migrator::up(&db, None).await?;

    Ok(db)
}

/// Blog posts fill `author_id` on create and `editor_id` on update;
/// comments use the standard viewset.
pub fn setup_test_app(db: DatabaseConnection, config: &ShortcutsConfig) -> Router {
    let mut router = ApiRouter::new(config.clone());
    let viewset =
        build_model_viewset::<blog_post::Entity>(Some(blog_post_serializer(config)), config)
            .unwrap();
    register_endpoint::<blog_post::Entity>(&mut router, Some(viewset)).unwrap();
    register_endpoint::<comment::Entity>(&mut router, None).unwrap();
    router.into_router(db)
}

pub async fn setup_default_app() -> Router {
    let db = setup_test_db().await.unwrap();
    setup_test_app(db, &ShortcutsConfig::default())
}

pub fn blog_post_serializer(config: &ShortcutsConfig) -> Serializer {
    SerializerBuilder::standard(&blog_post::Entity::descriptor(), config)
        .inject_author(InjectionTarget::field("author_id"))
        .unwrap()
        .inject_editor(InjectionTarget::field("editor_id"))
        .unwrap()
        .build()
}

pub fn alice() -> Principal {
    Principal::new(
        Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap(),
        "alice",
    )
}

pub fn bob() -> Principal {
    Principal::new(
        Uuid::parse_str("6ba7b810-9dad-11d1-80b4-00c04fd430c8").unwrap(),
        "bob",
    )
}

pub fn request(method: &str, uri: &str, body: Option<&Value>, user: Option<Principal>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::HOST, "localhost");
    let mut request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    if let Some(user) = user {
        request.extensions_mut().insert(user);
    }
    request
}

/// Sends the request and returns the status with the JSON body
/// (`Value::Null` for an empty body).
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

pub async fn create_post(app: &Router, title: &str, user: Option<Principal>) -> Value {
    let payload = serde_json::json!({ "title": title, "body": format!("About {title}") });
    let (status, body) = send(app, request("POST", "/blog-post/", Some(&payload), user)).await;
    assert_eq!(status, StatusCode::CREATED, "unexpected response: {body}");
    body
}

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(CreateBlogTables)]
    }
}

pub struct CreateBlogTables;

impl MigrationName for CreateBlogTables {
    fn name(&self) -> &'static str {
        "m20240101_000001_create_blog_tables"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for CreateBlogTables {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let schema = Schema::new(manager.get_database_backend());
        manager
            .create_table(schema.create_table_from_entity(blog_post::Entity))
            .await?;
        manager
            .create_table(schema.create_table_from_entity(comment::Entity))
            .await?;
        Ok(())
    }
}
