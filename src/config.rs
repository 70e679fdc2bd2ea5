use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Serialize};

use crate::errors::ShortcutError;

/// Environment prefix, e.g. `REST_SHORTCUTS_API_URL_NAMESPACE=api`.
pub const ENV_PREFIX: &str = "REST_SHORTCUTS_";

pub const DEFAULT_PAGE_SIZE: u64 = 25;

/// Settings shared by every generated serializer, viewset and router.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShortcutsConfig {
    /// Namespace detail view names are prefixed with (`"api"` gives
    /// `"api:blog-post-detail"`). `None` keeps plain names.
    pub api_url_namespace: Option<String>,
    /// Number of records per listing page.
    pub page_size: u64,
    /// Path the generated endpoints are nested under, e.g. `"/api"`.
    /// Empty mounts them at the root.
    pub mount_path: String,
}

impl Default for ShortcutsConfig {
    fn default() -> Self {
        Self {
            api_url_namespace: None,
            page_size: DEFAULT_PAGE_SIZE,
            mount_path: String::new(),
        }
    }
}

impl ShortcutsConfig {
    /// Load configuration with layered loading: defaults → environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ShortcutError::Config` when a variable holds a value of the wrong type.
    pub fn load() -> Result<Self, ShortcutError> {
        Self::from_figment(
            Figment::new()
                .merge(Serialized::defaults(Self::default()))
                .merge(Env::prefixed(ENV_PREFIX)),
        )
    }

    /// Extract the configuration from a caller-assembled figment, for
    /// applications that keep these settings in their own config file.
    ///
    /// # Errors
    ///
    /// Returns `ShortcutError::Config` when extraction fails.
    pub fn from_figment(figment: Figment) -> Result<Self, ShortcutError> {
        let mut config: Self = figment.extract()?;
        config.mount_path = normalize_mount_path(&config.mount_path);
        if config.page_size == 0 {
            config.page_size = DEFAULT_PAGE_SIZE;
        }
        Ok(config)
    }

    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.api_url_namespace = Some(namespace.into());
        self
    }

    #[must_use]
    pub fn with_mount_path(mut self, mount_path: &str) -> Self {
        self.mount_path = normalize_mount_path(mount_path);
        self
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size.max(1);
        self
    }
}

/// `"api/"` and `"/api"` both become `"/api"`; `"/"` becomes `""`.
fn normalize_mount_path(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}
