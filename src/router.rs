//! Registration of viewsets and assembly of the axum router.
//!
//! ```rust,ignore
//! let config = ShortcutsConfig::load()?;
//! let mut router = ApiRouter::new(config);
//! register_endpoint::<blog_post::Entity>(&mut router, None)?;
//! register_endpoint::<author::Entity>(&mut router, None)?;
//!
//! let app = router.into_router(db);
//! ```

use axum::{Router, routing::get};
use sea_orm::{ActiveModelBehavior, DatabaseConnection, IntoActiveModel, TryIntoModel};
use serde::{Serialize, de::DeserializeOwned};
use std::{collections::HashMap, sync::Arc};

use crate::config::ShortcutsConfig;
use crate::errors::ShortcutError;
use crate::models::ApiModel;
use crate::naming::{derive_base_name, derive_detail_view_name};
use crate::routes::{self, EndpointState, RootState};
use crate::viewset::{ViewSet, build_model_viewset};

/// A viewset mounted under `/<prefix>/`.
#[derive(Debug, Clone)]
pub struct Registration {
    pub prefix: String,
    pub basename: String,
    pub viewset: Arc<ViewSet>,
}

/// Collects viewset registrations and turns them into an axum [`Router`].
#[derive(Debug, Clone, Default)]
pub struct ApiRouter {
    config: ShortcutsConfig,
    registrations: Vec<Registration>,
}

impl ApiRouter {
    #[must_use]
    pub fn new(config: ShortcutsConfig) -> Self {
        Self {
            config,
            registrations: Vec::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ShortcutsConfig {
        &self.config
    }

    #[must_use]
    pub fn registrations(&self) -> &[Registration] {
        &self.registrations
    }

    /// Mounts `viewset` under `prefix`. Registering a prefix again replaces
    /// the earlier viewset.
    ///
    /// # Errors
    ///
    /// `ShortcutError::EmptyPrefix` when `prefix` has no segment besides slashes.
    pub fn register(
        &mut self,
        prefix: &str,
        viewset: ViewSet,
        basename: &str,
    ) -> Result<(), ShortcutError> {
        let prefix = prefix.trim_matches('/').to_string();
        if prefix.is_empty() {
            return Err(ShortcutError::EmptyPrefix);
        }
        let registration = Registration {
            basename: basename.to_string(),
            viewset: Arc::new(viewset),
            prefix,
        };
        tracing::info!(
            prefix = %registration.prefix,
            basename = %registration.basename,
            viewset = %registration.viewset.name(),
            "registered endpoint"
        );

        match self
            .registrations
            .iter_mut()
            .find(|existing| existing.prefix == registration.prefix)
        {
            Some(existing) => {
                tracing::warn!(prefix = %registration.prefix, "replacing endpoint registered earlier");
                *existing = registration;
            }
            None => self.registrations.push(registration),
        }
        Ok(())
    }

    /// Resolver for the detail views of every registration so far.
    #[must_use]
    pub fn url_resolver(&self) -> UrlResolver {
        let namespace = self.config.api_url_namespace.as_deref();
        UrlResolver {
            mount_path: self.config.mount_path.clone(),
            detail_routes: self
                .registrations
                .iter()
                .map(|registration| {
                    (
                        derive_detail_view_name(&registration.basename, namespace),
                        registration.prefix.clone(),
                    )
                })
                .collect(),
            prefixes: self
                .registrations
                .iter()
                .map(|registration| registration.prefix.clone())
                .collect(),
        }
    }

    /// Builds the router: an API root at `/`, then for every registration
    /// `/<prefix>/` (list, create, metadata) and `/<prefix>/{lookup}/`
    /// (retrieve, update, partial update, destroy). Paths are prefixed with
    /// the configured mount path.
    pub fn into_router(self, db: DatabaseConnection) -> Router {
        let urls = Arc::new(self.url_resolver());
        let mount = self.config.mount_path.as_str();

        let mut router = Router::new()
            .route(&format!("{mount}/"), get(routes::api_root))
            .with_state(RootState { urls: urls.clone() });

        for registration in self.registrations {
            let list_path = format!("{mount}/{}/", registration.prefix);
            let detail_path = format!("{mount}/{}/{{lookup}}/", registration.prefix);
            let state = EndpointState {
                db: db.clone(),
                viewset: registration.viewset,
                urls: urls.clone(),
            };

            let endpoint = Router::new()
                .route(
                    &list_path,
                    get(routes::list)
                        .post(routes::create)
                        .options(routes::metadata),
                )
                .route(
                    &detail_path,
                    get(routes::retrieve)
                        .put(routes::update)
                        .patch(routes::update)
                        .delete(routes::destroy)
                        .options(routes::metadata),
                )
                .with_state(state);
            router = router.merge(endpoint);
        }
        router
    }
}

/// Reverses detail view names into record URLs.
#[derive(Debug, Clone, Default)]
pub struct UrlResolver {
    mount_path: String,
    detail_routes: HashMap<String, String>,
    prefixes: Vec<String>,
}

impl UrlResolver {
    /// `<origin><mount>/<prefix>/<key>/`, or `None` for an unknown view.
    #[must_use]
    pub fn reverse(&self, view_name: &str, key: &str, origin: Option<&str>) -> Option<String> {
        let prefix = self.detail_routes.get(view_name)?;
        Some(format!(
            "{}{}/{prefix}/{key}/",
            origin.unwrap_or_default(),
            self.mount_path
        ))
    }

    /// List URL of every registered prefix, in registration order.
    #[must_use]
    pub fn list_urls(&self, origin: Option<&str>) -> Vec<(String, String)> {
        let origin = origin.unwrap_or_default();
        self.prefixes
            .iter()
            .map(|prefix| {
                (
                    prefix.clone(),
                    format!("{origin}{}/{prefix}/", self.mount_path),
                )
            })
            .collect()
    }
}

/// Exposes the entity `E` under the slug of its model name (`BlogPost` is
/// served at `/blog-post/`), using `viewset` or the standard one.
///
/// # Errors
///
/// Propagates errors from building the standard viewset.
pub fn register_endpoint<E>(
    router: &mut ApiRouter,
    viewset: Option<ViewSet>,
) -> Result<(), ShortcutError>
where
    E: ApiModel + Sync,
    E::Model: Serialize + DeserializeOwned + IntoActiveModel<E::ActiveModel> + Sync,
    E::ActiveModel: ActiveModelBehavior + TryIntoModel<E::Model> + Send + Sync,
{
    let endpoint_name = derive_base_name(E::MODEL_NAME);
    let viewset = match viewset {
        Some(viewset) => viewset,
        None => build_model_viewset::<E>(None, router.config())?,
    };
    let basename = viewset.serializer().base_name().to_string();
    router.register(&endpoint_name, viewset, &basename)
}
