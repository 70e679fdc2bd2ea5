//! Serializers generated from model descriptors.
//!
//! A [`Serializer`] is built once per model (usually at startup) and shared.
//! Optional behaviours are configured on the [`SerializerBuilder`] and turned
//! into two ordered pipelines:
//!
//! - field transforms, run whenever a [`SerializerInstance`] is created
//!   (renaming, hyperlink suppression);
//! - data transforms, run on incoming payloads after they have been mapped
//!   back to model attributes (author/editor injection).
//!
//! ```rust,ignore
//! let serializer = SerializerBuilder::standard(&blog_post::Entity::descriptor(), &config)
//!     .inject_author(InjectionTarget::field("author_id"))?
//!     .inject_editor(InjectionTarget::field("editor_id"))?
//!     .build();
//! ```

pub mod authorship;
pub mod renaming;
pub mod urls;

use serde_json::{Map, Value};
use std::{fmt, sync::Arc};

pub use authorship::{
    AuthorInjection, EditorInjection, InjectionHook, InjectionTarget, LegacyAuthorCheck,
    NormalizationState,
};
pub use renaming::{JsFriendlyRenaming, js_friendly_name};
pub use urls::{UrlFieldSuppression, should_strip_urls};

use crate::config::ShortcutsConfig;
use crate::context::SerializerContext;
use crate::errors::{ApiError, ShortcutError};
use crate::fields::{FieldDescriptor, FieldKind, FieldMap};
use crate::models::ModelDescriptor;
use crate::naming::{derive_base_name, derive_detail_view_name, serializer_type_name};

/// Name of the hyperlink field pointing at the record itself.
pub const URL_FIELD_NAME: &str = "url";

/// Step run over a fresh field mapping.
pub trait FieldTransform: Send + Sync + fmt::Debug {
    /// # Errors
    ///
    /// Misconfiguration such as renaming a field that does not exist.
    fn apply(&self, fields: &mut FieldMap, ctx: &SerializerContext) -> Result<(), ShortcutError>;
}

/// Step run over normalized incoming data.
pub trait DataTransform: Send + Sync + fmt::Debug {
    /// # Errors
    ///
    /// User-facing validation failures.
    fn apply(
        &self,
        data: &mut Map<String, Value>,
        ctx: &SerializerContext,
        state: &mut NormalizationState,
    ) -> Result<(), ApiError>;
}

#[derive(Debug)]
pub struct SerializerBuilder {
    name: String,
    base_name: String,
    model: ModelDescriptor,
    fields: Vec<(String, FieldDescriptor)>,
    rename_fields: bool,
    suppress_urls: bool,
    explicit_url_fields: Vec<String>,
    author: Option<AuthorInjection>,
    editor: Option<EditorInjection>,
    legacy_author: Option<LegacyAuthorCheck>,
    field_transforms: Vec<Arc<dyn FieldTransform>>,
    data_transforms: Vec<Arc<dyn DataTransform>>,
}

impl SerializerBuilder {
    /// A serializer without fields or behaviours.
    #[must_use]
    pub fn new(model: &ModelDescriptor) -> Self {
        Self {
            name: serializer_type_name(&model.name),
            base_name: derive_base_name(&model.name),
            model: model.clone(),
            fields: Vec::new(),
            rename_fields: false,
            suppress_urls: false,
            explicit_url_fields: Vec::new(),
            author: None,
            editor: None,
            legacy_author: None,
            field_transforms: Vec::new(),
            data_transforms: Vec::new(),
        }
    }

    /// Every column of the model (primary key read-only), a `url` link to
    /// the detail view, camelCase renaming and hyperlink suppression.
    #[must_use]
    pub fn standard(model: &ModelDescriptor, config: &ShortcutsConfig) -> Self {
        let mut builder = Self::new(model);
        let view_name =
            derive_detail_view_name(&builder.base_name, config.api_url_namespace.as_deref());

        let (primary, others): (Vec<_>, Vec<_>) = model
            .concrete_fields()
            .partition(|field| field.name == model.primary_key);
        for field in primary {
            builder = builder.field(&field.name, FieldDescriptor::value(&field.name).read_only());
        }
        builder = builder.field(
            URL_FIELD_NAME,
            FieldDescriptor::hyperlinked_identity(&model.primary_key, view_name),
        );
        for field in others {
            builder = builder.field(&field.name, FieldDescriptor::value(&field.name));
        }

        builder.rename_fields(true).suppress_urls(true)
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Declares a field, replacing a previous declaration with the same name.
    #[must_use]
    pub fn field(mut self, name: &str, descriptor: FieldDescriptor) -> Self {
        match self.fields.iter_mut().find(|(existing, _)| existing == name) {
            Some((_, slot)) => *slot = descriptor,
            None => self.fields.push((name.to_string(), descriptor)),
        }
        self
    }

    #[must_use]
    pub fn without_field(mut self, name: &str) -> Self {
        self.fields.retain(|(existing, _)| existing != name);
        self
    }

    #[must_use]
    pub fn rename_fields(mut self, enabled: bool) -> Self {
        self.rename_fields = enabled;
        self
    }

    #[must_use]
    pub fn suppress_urls(mut self, enabled: bool) -> Self {
        self.suppress_urls = enabled;
        self
    }

    /// Extra fields removed together with hyperlinks.
    #[must_use]
    pub fn explicit_url_fields<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.explicit_url_fields = names.into_iter().map(Into::into).collect();
        self
    }

    /// # Errors
    ///
    /// `ShortcutError::MissingInjectionTarget` for an empty field name.
    pub fn inject_author(mut self, target: InjectionTarget) -> Result<Self, ShortcutError> {
        self.author = Some(AuthorInjection::new(target)?);
        Ok(self)
    }

    /// # Errors
    ///
    /// `ShortcutError::MissingInjectionTarget` for an empty field name.
    pub fn inject_editor(mut self, target: InjectionTarget) -> Result<Self, ShortcutError> {
        self.editor = Some(EditorInjection::new(target)?);
        Ok(self)
    }

    /// Enables the deprecated validating author injection on `field`.
    ///
    /// # Errors
    ///
    /// `ShortcutError::MissingInjectionTarget` for an empty field name.
    pub fn legacy_author_check(mut self, field: &str) -> Result<Self, ShortcutError> {
        self.legacy_author = Some(LegacyAuthorCheck::new(field)?);
        Ok(self)
    }

    /// Appends a custom step after the built-in field transforms.
    #[must_use]
    pub fn field_transform(mut self, transform: Arc<dyn FieldTransform>) -> Self {
        self.field_transforms.push(transform);
        self
    }

    /// Appends a custom step after the built-in data transforms.
    #[must_use]
    pub fn data_transform(mut self, transform: Arc<dyn DataTransform>) -> Self {
        self.data_transforms.push(transform);
        self
    }

    #[must_use]
    pub fn build(self) -> Serializer {
        let mut field_pipeline: Vec<Arc<dyn FieldTransform>> = Vec::new();
        if self.rename_fields {
            field_pipeline.push(Arc::new(JsFriendlyRenaming));
        }
        if self.suppress_urls {
            field_pipeline.push(Arc::new(UrlFieldSuppression::new(self.explicit_url_fields)));
        }
        field_pipeline.extend(self.field_transforms);

        let mut data_pipeline: Vec<Arc<dyn DataTransform>> = Vec::new();
        if let Some(author) = self.author {
            data_pipeline.push(Arc::new(author));
        }
        if let Some(editor) = self.editor {
            data_pipeline.push(Arc::new(editor));
        }
        if let Some(legacy) = self.legacy_author {
            data_pipeline.push(Arc::new(legacy));
        }
        data_pipeline.extend(self.data_transforms);

        Serializer {
            name: self.name,
            base_name: self.base_name,
            model: self.model,
            fields: self.fields,
            field_pipeline,
            data_pipeline,
        }
    }
}

/// Serializer for the model, with every field, a `url` link and the
/// standard behaviours. A new value is built on every call.
#[must_use]
pub fn build_model_serializer(model: &ModelDescriptor, config: &ShortcutsConfig) -> Serializer {
    SerializerBuilder::standard(model, config).build()
}

/// Immutable serializer definition.
#[derive(Debug, Clone)]
pub struct Serializer {
    name: String,
    base_name: String,
    model: ModelDescriptor,
    fields: Vec<(String, FieldDescriptor)>,
    field_pipeline: Vec<Arc<dyn FieldTransform>>,
    data_pipeline: Vec<Arc<dyn DataTransform>>,
}

impl Serializer {
    /// Type name, e.g. `BlogPostSerializer`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Base name the viewset using this serializer is routed under.
    #[must_use]
    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    #[must_use]
    pub fn model(&self) -> &ModelDescriptor {
        &self.model
    }

    /// Fields as declared, before any transform.
    pub fn declared_fields(&self) -> impl Iterator<Item = (&str, &FieldDescriptor)> {
        self.fields.iter().map(|(name, field)| (name.as_str(), field))
    }

    /// Creates the per-request instance and runs the field pipeline.
    ///
    /// # Errors
    ///
    /// Propagates misconfiguration reported by a field transform.
    pub fn instance<'a>(
        &'a self,
        ctx: &'a SerializerContext,
    ) -> Result<SerializerInstance<'a>, ShortcutError> {
        let mut fields: FieldMap = self.fields.iter().cloned().collect();
        for transform in &self.field_pipeline {
            transform.apply(&mut fields, ctx)?;
        }
        Ok(SerializerInstance {
            serializer: self,
            context: ctx,
            fields,
        })
    }
}

/// A serializer bound to one request.
#[derive(Debug)]
pub struct SerializerInstance<'a> {
    serializer: &'a Serializer,
    context: &'a SerializerContext,
    fields: FieldMap,
}

impl SerializerInstance<'_> {
    #[must_use]
    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut FieldMap {
        &mut self.fields
    }

    #[must_use]
    pub fn serializer(&self) -> &Serializer {
        self.serializer
    }

    /// Output representation of a stored record.
    #[must_use]
    pub fn to_representation(&self, record: &Value) -> Value {
        let output: Map<String, Value> = self
            .fields
            .iter()
            .map(|(name, field)| {
                let raw = record.get(&field.source).cloned().unwrap_or(Value::Null);
                let value = match &field.kind {
                    FieldKind::Value => raw,
                    FieldKind::HyperlinkedIdentity { view_name }
                    | FieldKind::HyperlinkedRelated { view_name } => self.hyperlink(view_name, &raw),
                };
                (name.clone(), value)
            })
            .collect();
        Value::Object(output)
    }

    fn hyperlink(&self, view_name: &str, key: &Value) -> Value {
        let key = match key {
            Value::String(key) => key.clone(),
            Value::Number(key) => key.to_string(),
            _ => return Value::Null,
        };
        let origin = self
            .context
            .request
            .as_ref()
            .and_then(|request| request.origin.as_deref());
        self.context
            .urls
            .as_ref()
            .and_then(|urls| urls.reverse(view_name, &key, origin))
            .map_or(Value::Null, Value::String)
    }

    /// Maps an incoming payload to model attributes and runs the data
    /// pipeline. Unknown and read-only keys are ignored.
    ///
    /// # Errors
    ///
    /// `ApiError::BadRequest` when `data` is not a JSON object, or the error
    /// of a failing data transform.
    pub fn to_internal_value(
        &self,
        data: &Value,
        state: &mut NormalizationState,
    ) -> Result<Map<String, Value>, ApiError> {
        let Value::Object(payload) = data else {
            return Err(ApiError::bad_request(
                "Invalid data. Expected a JSON object.",
            ));
        };

        let mut internal: Map<String, Value> = self
            .fields
            .iter()
            .filter(|(_, field)| !field.read_only && field.kind == FieldKind::Value)
            .filter_map(|(name, field)| {
                payload
                    .get(name)
                    .map(|value| (field.source.clone(), value.clone()))
            })
            .collect();

        for transform in &self.serializer.data_pipeline {
            transform.apply(&mut internal, self.context, state)?;
        }
        Ok(internal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{FORCE_URLS_PARAM, Principal, Renderer, RequestContext};
    use crate::models::{FieldType, ModelField};
    use axum::http::Method;
    use serde_json::json;
    use uuid::Uuid;

    fn blog_post() -> ModelDescriptor {
        ModelDescriptor::new(
            "BlogPost",
            vec![
                ModelField::new("id", FieldType::Integer),
                ModelField::new("title", FieldType::ShortText),
                ModelField::new("body", FieldType::Text),
                ModelField::new("author_id", FieldType::Uuid),
                ModelField::new("comments", FieldType::ReverseRelation),
            ],
        )
    }

    fn url_fields_serializer() -> SerializerBuilder {
        SerializerBuilder::new(&blog_post())
            .field("id_field", FieldDescriptor::hyperlinked_identity("id", "foo"))
            .field("related_field", FieldDescriptor::hyperlinked_related("author_id", "foo"))
            .field("regular_field", FieldDescriptor::value("title"))
            .suppress_urls(true)
    }

    fn field_count(serializer: &Serializer, ctx: &SerializerContext) -> usize {
        serializer.instance(ctx).unwrap().fields().len()
    }

    #[test]
    fn test_removes_url_fields_by_default() {
        let serializer = url_fields_serializer().build();
        assert_eq!(field_count(&serializer, &SerializerContext::new()), 1);
    }

    #[test]
    fn test_keeps_url_fields_if_force_urls_is_true() {
        let serializer = url_fields_serializer().build();
        let ctx = SerializerContext::new()
            .with_request(RequestContext::new(Method::GET).with_query(FORCE_URLS_PARAM, "true"));
        assert_eq!(field_count(&serializer, &ctx), 3);
    }

    #[test]
    fn test_removes_url_fields_if_force_urls_is_false() {
        let serializer = url_fields_serializer().build();
        let ctx = SerializerContext::new()
            .with_request(RequestContext::new(Method::GET).with_query(FORCE_URLS_PARAM, "false"));
        assert_eq!(field_count(&serializer, &ctx), 1);
    }

    #[test]
    fn test_keeps_url_fields_for_browsable_renderer() {
        let serializer = url_fields_serializer().build();
        let ctx = SerializerContext::new()
            .with_request(RequestContext::new(Method::GET).with_renderer(Renderer::BrowsableApi));
        assert_eq!(field_count(&serializer, &ctx), 3);
    }

    #[test]
    fn test_removes_url_fields_for_json_renderer() {
        let serializer = url_fields_serializer().build();
        let ctx = SerializerContext::new()
            .with_request(RequestContext::new(Method::GET).with_renderer(Renderer::Json));
        assert_eq!(field_count(&serializer, &ctx), 1);
    }

    #[test]
    fn test_removes_field_specified_explicitly() {
        let serializer = url_fields_serializer()
            .explicit_url_fields(["regular_field"])
            .build();
        assert_eq!(field_count(&serializer, &SerializerContext::new()), 0);
    }

    #[test]
    fn test_standard_serializer_shape() {
        let serializer = build_model_serializer(&blog_post(), &ShortcutsConfig::default());
        assert_eq!(serializer.name(), "BlogPostSerializer");
        assert_eq!(serializer.base_name(), "blog-post");

        let declared: Vec<&str> = serializer.declared_fields().map(|(name, _)| name).collect();
        assert_eq!(declared, ["id", "url", "title", "body", "author_id"]);

        let (_, url) = serializer
            .declared_fields()
            .find(|(name, _)| *name == URL_FIELD_NAME)
            .unwrap();
        assert_eq!(
            url.kind,
            FieldKind::HyperlinkedIdentity {
                view_name: "blog-post-detail".to_string()
            }
        );
    }

    #[test]
    fn test_standard_serializer_uses_namespace() {
        let config = ShortcutsConfig::default().with_namespace("api");
        let serializer = build_model_serializer(&blog_post(), &config);
        let (_, url) = serializer
            .declared_fields()
            .find(|(name, _)| *name == URL_FIELD_NAME)
            .unwrap();
        assert_eq!(
            url.kind,
            FieldKind::HyperlinkedIdentity {
                view_name: "api:blog-post-detail".to_string()
            }
        );
    }

    #[test]
    fn test_standard_instance_renames_and_strips() {
        let serializer = build_model_serializer(&blog_post(), &ShortcutsConfig::default());
        let ctx = SerializerContext::new();
        let instance = serializer.instance(&ctx).unwrap();
        let names: Vec<&str> = instance.fields().keys().map(String::as_str).collect();
        assert_eq!(names, ["id", "title", "body", "authorId"]);
    }

    #[test]
    fn test_factory_is_deterministic() {
        let config = ShortcutsConfig::default();
        let first = build_model_serializer(&blog_post(), &config);
        let second = build_model_serializer(&blog_post(), &config);
        let first_fields: Vec<_> = first.declared_fields().collect();
        let second_fields: Vec<_> = second.declared_fields().collect();
        assert_eq!(first_fields, second_fields);
    }

    #[test]
    fn test_representation_without_resolver_nulls_links() {
        let serializer = build_model_serializer(&blog_post(), &ShortcutsConfig::default());
        let ctx = SerializerContext::new().with_request(
            RequestContext::new(Method::GET).with_query(FORCE_URLS_PARAM, "true"),
        );
        let instance = serializer.instance(&ctx).unwrap();
        let output = instance.to_representation(&json!({
            "id": 1, "title": "Hello", "body": "World", "author_id": null
        }));
        assert_eq!(
            output,
            json!({"id": 1, "url": null, "title": "Hello", "body": "World", "authorId": null})
        );
    }

    #[test]
    fn test_internal_value_maps_names_back_and_skips_read_only() {
        let serializer = build_model_serializer(&blog_post(), &ShortcutsConfig::default());
        let ctx = SerializerContext::new();
        let instance = serializer.instance(&ctx).unwrap();

        let internal = instance
            .to_internal_value(
                &json!({"id": 99, "title": "Hi", "authorId": "x", "unknown": true}),
                &mut NormalizationState::new(),
            )
            .unwrap();

        assert_eq!(internal.get("title"), Some(&json!("Hi")));
        assert_eq!(internal.get("author_id"), Some(&json!("x")));
        assert!(!internal.contains_key("id"));
        assert!(!internal.contains_key("unknown"));
    }

    #[test]
    fn test_internal_value_rejects_non_objects() {
        let serializer = build_model_serializer(&blog_post(), &ShortcutsConfig::default());
        let ctx = SerializerContext::new();
        let instance = serializer.instance(&ctx).unwrap();
        let err = instance
            .to_internal_value(&json!([1, 2]), &mut NormalizationState::new())
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest { .. }));
    }

    #[test]
    fn test_internal_value_runs_injection_pipeline() {
        let user = Principal::new(Uuid::from_u128(1), "ada");
        let serializer = SerializerBuilder::standard(&blog_post(), &ShortcutsConfig::default())
            .inject_author(InjectionTarget::field("author_id"))
            .unwrap()
            .build();
        let ctx = SerializerContext::new()
            .with_request(RequestContext::new(Method::POST).with_user(user.clone()));
        let instance = serializer.instance(&ctx).unwrap();

        let internal = instance
            .to_internal_value(&json!({"title": "Hi"}), &mut NormalizationState::new())
            .unwrap();
        assert_eq!(internal.get("author_id"), Some(&user.identity()));
    }

    #[test]
    fn test_builder_rejects_empty_injection_field() {
        let result = SerializerBuilder::new(&blog_post()).inject_editor(InjectionTarget::field(""));
        assert!(matches!(
            result,
            Err(ShortcutError::MissingInjectionTarget { role: "editor" })
        ));
    }

    #[test]
    fn test_field_redeclaration_and_removal() {
        let serializer = SerializerBuilder::standard(&blog_post(), &ShortcutsConfig::default())
            .field("title", FieldDescriptor::value("title").read_only())
            .without_field("body")
            .build();
        let declared: Vec<(&str, bool)> = serializer
            .declared_fields()
            .map(|(name, field)| (name, field.read_only))
            .collect();
        assert_eq!(
            declared,
            [("id", true), ("url", true), ("title", true), ("author_id", false)]
        );
    }
}
