//! # rest-shortcuts
//!
//! Shortcuts for exposing sea-orm entities as REST endpoints with axum.
//!
//! One call generates a serializer, a viewset and the routes for a model:
//!
//! ```rust,ignore
//! use rest_shortcuts::{ApiModel, ApiRouter, ShortcutsConfig, register_endpoint};
//!
//! impl ApiModel for blog_post::Entity {
//!     const MODEL_NAME: &'static str = "BlogPost";
//! }
//!
//! let mut router = ApiRouter::new(ShortcutsConfig::load()?);
//! register_endpoint::<blog_post::Entity>(&mut router, None)?;
//! let app = router.into_router(db);
//! ```
//!
//! The generated serializer renames fields to camelCase (`author_id` is
//! served as `authorId`), drops hyperlink fields unless `?forceUrls=true` is
//! given or the browsable renderer is negotiated, and can fill author and
//! editor fields from the authenticated [`Principal`]. Listings support
//! `?search=`, `?ordering=` and `?page=`.
//!
//! Pieces can be customised individually: build a serializer with
//! [`SerializerBuilder`], wrap it with [`build_model_viewset`] and register
//! the viewset yourself.

pub mod config;
pub mod context;
pub mod errors;
pub mod fields;
pub mod models;
pub mod naming;
pub mod pagination;
pub mod router;
pub mod routes;
pub mod serializer;
pub mod store;
pub mod viewset;

pub use config::ShortcutsConfig;
pub use context::{Principal, Renderer, RequestContext, SerializerContext};
pub use errors::{ApiError, ShortcutError};
pub use fields::{FieldDescriptor, FieldKind, FieldMap, rename_field};
pub use models::{ApiModel, FieldType, ListParams, ModelDescriptor, ModelField};
pub use router::{ApiRouter, UrlResolver, register_endpoint};
pub use serializer::{
    InjectionTarget, NormalizationState, Serializer, SerializerBuilder, SerializerInstance,
    build_model_serializer,
};
pub use store::{EntityStore, RecordStore};
pub use viewset::{ViewSet, build_model_viewset, fields_for_ordering, fields_for_search};
