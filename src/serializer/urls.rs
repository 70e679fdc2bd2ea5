use super::FieldTransform;
use crate::context::{FORCE_URLS_PARAM, Renderer, RequestContext, SerializerContext};
use crate::errors::ShortcutError;
use crate::fields::FieldMap;

/// Whether hyperlink fields should be removed for this request.
///
/// `forceUrls` wins when present (`"false"` strips, anything else keeps).
/// Otherwise links are only kept for the browsable renderer. Without a
/// request they are always stripped.
#[must_use]
pub fn should_strip_urls(request: Option<&RequestContext>) -> bool {
    let Some(request) = request else {
        return true;
    };
    match request.query_param(FORCE_URLS_PARAM) {
        Some(force_urls) => force_urls == "false",
        None => request.renderer != Renderer::BrowsableApi,
    }
}

/// Removes fields producing URLs from the output to keep payloads small.
///
/// Hyperlinked identity and related fields are removed, and so is any field
/// listed in `explicit_fields` (matched by field name or source attribute).
#[derive(Debug, Default, Clone)]
pub struct UrlFieldSuppression {
    explicit_fields: Vec<String>,
}

impl UrlFieldSuppression {
    #[must_use]
    pub fn new(explicit_fields: Vec<String>) -> Self {
        Self { explicit_fields }
    }

    fn is_explicit(&self, name: &str, source: &str) -> bool {
        self.explicit_fields
            .iter()
            .any(|explicit| explicit == name || explicit == source)
    }
}

impl FieldTransform for UrlFieldSuppression {
    fn apply(&self, fields: &mut FieldMap, ctx: &SerializerContext) -> Result<(), ShortcutError> {
        if !should_strip_urls(ctx.request.as_ref()) {
            return Ok(());
        }
        let before = fields.len();
        fields.retain(|name, field| !(field.kind.is_hyperlink() || self.is_explicit(name, &field.source)));
        tracing::debug!(removed = before - fields.len(), "stripped url fields");
        Ok(())
    }
}
