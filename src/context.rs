//! Request-scoped values the serializers read from.

use axum::{
    extract::{FromRequestParts, Query},
    http::{Method, header, request::Parts},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{collections::HashMap, convert::Infallible, sync::Arc};
use uuid::Uuid;

use crate::router::UrlResolver;

/// Query parameter overriding hyperlink suppression.
pub const FORCE_URLS_PARAM: &str = "forceUrls";

/// The authenticated user of a request.
///
/// Authentication is not handled here: an application middleware inserts a
/// `Principal` into the request extensions and the [`RequestContext`]
/// extractor picks it up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: Uuid,
    pub username: String,
}

impl Principal {
    pub fn new(id: Uuid, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
        }
    }

    /// Value stored in author/editor fields.
    #[must_use]
    pub fn identity(&self) -> Value {
        Value::String(self.id.to_string())
    }
}

/// Response renderer picked by content negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Renderer {
    #[default]
    Json,
    /// Interactive HTML API browser.
    BrowsableApi,
}

impl Renderer {
    /// `?format=api` or an `Accept` header preferring HTML selects the
    /// browsable renderer, anything else gets JSON.
    #[must_use]
    pub fn negotiate(accept: Option<&str>, format: Option<&str>) -> Self {
        match format {
            Some("api") => return Self::BrowsableApi,
            Some("json") => return Self::Json,
            _ => {}
        }
        match accept {
            Some(accept) if accept.contains("text/html") => Self::BrowsableApi,
            _ => Self::Json,
        }
    }
}

/// What the helpers know about the current request.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub method: Method,
    pub path: String,
    pub query: HashMap<String, String>,
    pub user: Option<Principal>,
    pub renderer: Renderer,
    /// Scheme and authority, e.g. `http://localhost:3000`.
    pub origin: Option<String>,
}

impl RequestContext {
    #[must_use]
    pub fn new(method: Method) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_user(mut self, user: Principal) -> Self {
        self.user = Some(user);
        self
    }

    #[must_use]
    pub fn with_renderer(mut self, renderer: Renderer) -> Self {
        self.renderer = renderer;
        self
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn is_update(&self) -> bool {
        self.method == Method::PUT || self.method == Method::PATCH
    }

    #[must_use]
    pub fn is_create(&self) -> bool {
        self.method == Method::POST
    }
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let query = Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
            .map(|Query(query)| query)
            .unwrap_or_default();

        let accept = parts
            .headers
            .get(header::ACCEPT)
            .and_then(|value| value.to_str().ok());
        let renderer = Renderer::negotiate(accept, query.get("format").map(String::as_str));

        let origin = parts
            .headers
            .get(header::HOST)
            .and_then(|value| value.to_str().ok())
            .map(|host| {
                let scheme = parts
                    .headers
                    .get("x-forwarded-proto")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("http");
                format!("{scheme}://{host}")
            });

        Ok(Self {
            method: parts.method.clone(),
            path: parts.uri.path().to_string(),
            query,
            user: parts.extensions.get::<Principal>().cloned(),
            renderer,
            origin,
        })
    }
}

/// Everything a serializer instance may consult: the request, the view
/// keyword arguments (`pk`), the record being updated, and the URL resolver
/// used for hyperlink fields.
#[derive(Debug, Clone, Default)]
pub struct SerializerContext {
    pub request: Option<RequestContext>,
    pub view_kwargs: HashMap<String, String>,
    pub instance: Option<Value>,
    pub urls: Option<Arc<UrlResolver>>,
}

impl SerializerContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_request(mut self, request: RequestContext) -> Self {
        self.request = Some(request);
        self
    }

    #[must_use]
    pub fn with_view_kwarg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.view_kwargs.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_instance(mut self, instance: Value) -> Self {
        self.instance = Some(instance);
        self
    }

    #[must_use]
    pub fn with_urls(mut self, urls: Arc<UrlResolver>) -> Self {
        self.urls = Some(urls);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[test]
    fn test_renderer_negotiation() {
        assert_eq!(Renderer::negotiate(None, None), Renderer::Json);
        assert_eq!(
            Renderer::negotiate(Some("text/html,application/xhtml+xml"), None),
            Renderer::BrowsableApi
        );
        assert_eq!(Renderer::negotiate(Some("application/json"), None), Renderer::Json);
        assert_eq!(
            Renderer::negotiate(Some("application/json"), Some("api")),
            Renderer::BrowsableApi
        );
        assert_eq!(Renderer::negotiate(Some("text/html"), Some("json")), Renderer::Json);
    }

    #[test]
    fn test_method_predicates() {
        assert!(RequestContext::new(Method::POST).is_create());
        assert!(RequestContext::new(Method::PUT).is_update());
        assert!(RequestContext::new(Method::PATCH).is_update());
        assert!(!RequestContext::new(Method::GET).is_update());
        assert!(!RequestContext::new(Method::GET).is_create());
    }

    #[tokio::test]
    async fn test_extractor_reads_parts() {
        let user = Principal::new(Uuid::new_v4(), "ada");
        let mut request = Request::builder()
            .method(Method::GET)
            .uri("/blog-post/?forceUrls=true&page=2")
            .header(header::HOST, "example.org")
            .header(header::ACCEPT, "text/html")
            .body(())
            .unwrap();
        request.extensions_mut().insert(user.clone());
        let (mut parts, ()) = request.into_parts();

        let ctx = RequestContext::from_request_parts(&mut parts, &()).await.unwrap();

        assert_eq!(ctx.method, Method::GET);
        assert_eq!(ctx.path, "/blog-post/");
        assert_eq!(ctx.query_param(FORCE_URLS_PARAM), Some("true"));
        assert_eq!(ctx.query_param("page"), Some("2"));
        assert_eq!(ctx.renderer, Renderer::BrowsableApi);
        assert_eq!(ctx.origin.as_deref(), Some("http://example.org"));
        assert_eq!(ctx.user, Some(user));
    }
}
