//! axum handlers behind the routes built by
//! [`ApiRouter::into_router`](crate::router::ApiRouter::into_router).
//!
//! Every handler works on the viewset carried in its state; bodies are JSON.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::context::{RequestContext, SerializerContext};
use crate::errors::ApiError;
use crate::models::ListParams;
use crate::pagination::Page;
use crate::router::UrlResolver;
use crate::serializer::NormalizationState;
use crate::viewset::ViewSet;

const JSON_MEDIA_TYPE: &str = "application/json";

/// State of the routes of one registered viewset.
#[derive(Debug, Clone)]
pub struct EndpointState {
    pub db: DatabaseConnection,
    pub viewset: Arc<ViewSet>,
    pub urls: Arc<UrlResolver>,
}

impl EndpointState {
    fn context(&self, request: RequestContext) -> SerializerContext {
        SerializerContext::new()
            .with_request(request)
            .with_urls(self.urls.clone())
    }

    /// Record behind `key`, or 404 when the key is rejected by the lookup
    /// pattern or nothing matches.
    async fn existing(&self, key: &str) -> Result<Value, ApiError> {
        let not_found = || ApiError::not_found(&self.viewset.model().name, Some(key.to_string()));
        if !self.viewset.accepts_lookup(key) {
            return Err(not_found());
        }
        self.viewset
            .store()
            .fetch(&self.db, key)
            .await?
            .ok_or_else(not_found)
    }
}

#[derive(Debug, Clone)]
pub struct RootState {
    pub urls: Arc<UrlResolver>,
}

/// Response to `OPTIONS` on an endpoint.
#[derive(Debug, Serialize)]
pub struct EndpointMetadata {
    pub name: String,
    pub description: String,
    pub renders: Vec<&'static str>,
    pub parses: Vec<&'static str>,
}

/// Links to the list endpoint of every registered viewset.
pub async fn api_root(
    State(state): State<RootState>,
    request: RequestContext,
) -> Json<Map<String, Value>> {
    let links = state
        .urls
        .list_urls(request.origin.as_deref())
        .into_iter()
        .map(|(prefix, url)| (prefix, Value::String(url)))
        .collect();
    Json(links)
}

/// Usage description of the viewset.
pub async fn metadata(State(state): State<EndpointState>) -> Json<EndpointMetadata> {
    Json(EndpointMetadata {
        name: state.viewset.name().to_string(),
        description: state.viewset.doc().to_string(),
        renders: vec![JSON_MEDIA_TYPE],
        parses: vec![JSON_MEDIA_TYPE],
    })
}

/// One page of records, filtered by `?search=` and ordered by `?ordering=`.
pub async fn list(
    State(state): State<EndpointState>,
    request: RequestContext,
    Query(params): Query<ListParams>,
) -> Result<Json<Page>, ApiError> {
    let query = state.viewset.list_query(&params);
    let page = state.viewset.store().list(&state.db, &query).await?;

    let ctx = state.context(request.clone());
    let serializer = state.viewset.serializer().instance(&ctx)?;
    let results = page
        .records
        .iter()
        .map(|record| serializer.to_representation(record))
        .collect();

    Ok(Json(Page::new(results, page.count, query.page, &request)))
}

pub async fn retrieve(
    State(state): State<EndpointState>,
    request: RequestContext,
    Path(lookup): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let record = state.existing(&lookup).await?;
    let ctx = state
        .context(request)
        .with_view_kwarg("pk", lookup)
        .with_instance(record.clone());
    let serializer = state.viewset.serializer().instance(&ctx)?;
    Ok(Json(serializer.to_representation(&record)))
}

pub async fn create(
    State(state): State<EndpointState>,
    request: RequestContext,
    Json(payload): Json<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let ctx = state.context(request);
    let serializer = state.viewset.serializer().instance(&ctx)?;
    let data = serializer.to_internal_value(&payload, &mut NormalizationState::new())?;

    let created = state.viewset.store().insert(&state.db, data).await?;
    Ok((StatusCode::CREATED, Json(serializer.to_representation(&created))))
}

/// Serves both `PUT` and `PATCH`; only the submitted fields are written.
pub async fn update(
    State(state): State<EndpointState>,
    request: RequestContext,
    Path(lookup): Path<String>,
    Json(payload): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let existing = state.existing(&lookup).await?;
    let ctx = state
        .context(request)
        .with_view_kwarg("pk", lookup.clone())
        .with_instance(existing);
    let serializer = state.viewset.serializer().instance(&ctx)?;
    let data = serializer.to_internal_value(&payload, &mut NormalizationState::new())?;

    let updated = state
        .viewset
        .store()
        .update(&state.db, &lookup, data)
        .await?;
    Ok(Json(serializer.to_representation(&updated)))
}

pub async fn destroy(
    State(state): State<EndpointState>,
    Path(lookup): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.existing(&lookup).await?;
    state.viewset.store().delete(&state.db, &lookup).await?;
    Ok(StatusCode::NO_CONTENT)
}
