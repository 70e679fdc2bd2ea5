//! Viewsets generated for models: a serializer, a record store and the
//! listing options (search, ordering, pagination) exposed over HTTP.

pub mod docs;

use regex::Regex;
use sea_orm::{ActiveModelBehavior, IntoActiveModel, TryIntoModel};
use serde::{Serialize, de::DeserializeOwned};
use std::sync::Arc;

use crate::config::ShortcutsConfig;
use crate::errors::ShortcutError;
use crate::models::{ApiModel, FieldType, ListParams, ModelDescriptor};
use crate::naming::{humanize, pluralize, underscore, viewset_type_name};
use crate::pagination::PageRequest;
use crate::serializer::{Serializer, build_model_serializer, js_friendly_name};
use crate::store::{EntityStore, ListQuery, OrderingTerm, RecordStore};

pub use docs::{
    append_ordering_info, append_pagination_info, append_search_info,
    append_search_ordering_and_pagination_info,
};

/// Lookup values accepted by default: anything up to the next slash.
pub const DEFAULT_LOOKUP_VALUE_REGEX: &str = "[^/]+";

/// Fields results can be ordered by: everything except long text and
/// reverse relations.
#[must_use]
pub fn fields_for_ordering(model: &ModelDescriptor) -> Vec<String> {
    model
        .fields
        .iter()
        .filter(|field| !matches!(field.field_type, FieldType::Text | FieldType::ReverseRelation))
        .map(|field| field.name.clone())
        .collect()
}

/// Fields searched by `?search=`: the bounded-length text fields.
#[must_use]
pub fn fields_for_search(model: &ModelDescriptor) -> Vec<String> {
    model
        .fields
        .iter()
        .filter(|field| field.field_type == FieldType::ShortText)
        .map(|field| field.name.clone())
        .collect()
}

#[derive(Debug, Clone)]
pub struct ViewSet {
    name: String,
    doc: String,
    serializer: Arc<Serializer>,
    store: Arc<dyn RecordStore>,
    search_fields: Vec<String>,
    ordering_fields: Vec<String>,
    lookup_value_regex: String,
    lookup_matcher: Regex,
    page_size: u64,
}

impl ViewSet {
    /// Viewset over `store` with search and ordering fields, name and
    /// description derived from the serializer's model.
    ///
    /// # Errors
    ///
    /// `ShortcutError::NoOrderingFields` when the model has no field to
    /// order by.
    pub fn new(
        serializer: Serializer,
        store: Arc<dyn RecordStore>,
        config: &ShortcutsConfig,
    ) -> Result<Self, ShortcutError> {
        let model = serializer.model();
        let ordering_fields = fields_for_ordering(model);
        let search_fields = fields_for_search(model);

        let plural = pluralize(&model.name);
        let doc = format!(
            "This is {} API endpoint.\n",
            humanize(&underscore(&plural)).to_lowercase()
        );
        let doc = append_search_ordering_and_pagination_info(
            &doc,
            &ordering_fields,
            &model.name,
            config.page_size,
        )?;

        Ok(Self {
            name: viewset_type_name(&model.name),
            doc,
            store,
            search_fields,
            ordering_fields,
            lookup_value_regex: DEFAULT_LOOKUP_VALUE_REGEX.to_string(),
            lookup_matcher: anchored(DEFAULT_LOOKUP_VALUE_REGEX)?,
            page_size: config.page_size,
            serializer: Arc::new(serializer),
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Description returned by `OPTIONS` on the list endpoint.
    #[must_use]
    pub fn doc(&self) -> &str {
        &self.doc
    }

    #[must_use]
    pub fn serializer(&self) -> &Serializer {
        &self.serializer
    }

    #[must_use]
    pub fn model(&self) -> &ModelDescriptor {
        self.serializer.model()
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    #[must_use]
    pub fn search_fields(&self) -> &[String] {
        &self.search_fields
    }

    #[must_use]
    pub fn ordering_fields(&self) -> &[String] {
        &self.ordering_fields
    }

    #[must_use]
    pub fn lookup_value_regex(&self) -> &str {
        &self.lookup_value_regex
    }

    #[must_use]
    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = doc.into();
        self
    }

    #[must_use]
    pub fn with_search_fields(mut self, fields: Vec<String>) -> Self {
        self.search_fields = fields;
        self
    }

    #[must_use]
    pub fn with_ordering_fields(mut self, fields: Vec<String>) -> Self {
        self.ordering_fields = fields;
        self
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// # Errors
    ///
    /// `ShortcutError::LookupPattern` when `pattern` is not a valid regex.
    pub fn with_lookup_value_regex(mut self, pattern: &str) -> Result<Self, ShortcutError> {
        self.lookup_matcher = anchored(pattern)?;
        self.lookup_value_regex = pattern.to_string();
        Ok(self)
    }

    /// Whether `key` is a lookup value this viewset accepts.
    #[must_use]
    pub fn accepts_lookup(&self, key: &str) -> bool {
        self.lookup_matcher.is_match(key)
    }

    /// Ordering field matching `name`, either as declared or in its
    /// camelCase output form.
    fn ordering_field(&self, name: &str) -> Option<&String> {
        self.ordering_fields
            .iter()
            .find(|field| *field == name || js_friendly_name(field) == name)
    }

    /// Translates listing parameters. Unknown ordering fields are dropped.
    #[must_use]
    pub fn list_query(&self, params: &ListParams) -> ListQuery {
        let search_terms = params
            .search
            .as_deref()
            .unwrap_or_default()
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|term| !term.is_empty())
            .map(str::to_string)
            .collect();

        let ordering = params
            .ordering
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .filter_map(|term| {
                let (name, descending) = match term.strip_prefix('-') {
                    Some(name) => (name, true),
                    None => (term, false),
                };
                let field = self.ordering_field(name);
                if field.is_none() {
                    tracing::debug!(viewset = %self.name, field = name, "ignoring unknown ordering field");
                }
                field.map(|field| OrderingTerm {
                    field: field.clone(),
                    descending,
                })
            })
            .collect();

        ListQuery {
            search_terms,
            search_fields: self.search_fields.clone(),
            ordering,
            page: PageRequest::new(params.page, self.page_size),
        }
    }
}

fn anchored(pattern: &str) -> Result<Regex, ShortcutError> {
    Regex::new(&format!("^(?:{pattern})$")).map_err(|source| ShortcutError::LookupPattern {
        pattern: pattern.to_string(),
        source,
    })
}

/// Standard viewset for the entity `E`: the given serializer (or the
/// standard one), search and ordering over the suitable fields, results
/// ordered by primary key, and a description documenting the listing
/// parameters.
///
/// # Errors
///
/// `ShortcutError::NoOrderingFields` when the model has no field to order by.
pub fn build_model_viewset<E>(
    serializer: Option<Serializer>,
    config: &ShortcutsConfig,
) -> Result<ViewSet, ShortcutError>
where
    E: ApiModel + Sync,
    E::Model: Serialize + DeserializeOwned + IntoActiveModel<E::ActiveModel> + Sync,
    E::ActiveModel: ActiveModelBehavior + TryIntoModel<E::Model> + Send + Sync,
{
    let serializer =
        serializer.unwrap_or_else(|| build_model_serializer(&E::descriptor(), config));
    let store: Arc<dyn RecordStore> = Arc::new(EntityStore::<E>::new(E::MODEL_NAME));
    ViewSet::new(serializer, store, config)
}
