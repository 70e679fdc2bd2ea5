//! Serializer field descriptors and the helpers operating on field
//! mappings and submitted data.

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::context::SerializerContext;
use crate::errors::ShortcutError;

/// How a serializer field produces its output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// Plain value copied from the record attribute.
    Value,
    /// URL of the record itself, resolved through `view_name`.
    HyperlinkedIdentity { view_name: String },
    /// URL of a related record whose key the attribute holds.
    HyperlinkedRelated { view_name: String },
}

impl FieldKind {
    #[must_use]
    pub fn is_hyperlink(&self) -> bool {
        !matches!(self, Self::Value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Record attribute the field reads from and writes to.
    pub source: String,
    pub kind: FieldKind,
    pub read_only: bool,
    pub label: Option<String>,
}

impl FieldDescriptor {
    pub fn value(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            kind: FieldKind::Value,
            read_only: false,
            label: None,
        }
    }

    /// Read-only link to the record itself. The source is the primary key.
    pub fn hyperlinked_identity(source: impl Into<String>, view_name: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            kind: FieldKind::HyperlinkedIdentity {
                view_name: view_name.into(),
            },
            read_only: true,
            label: None,
        }
    }

    /// Read-only link to the record referenced by `source`.
    pub fn hyperlinked_related(source: impl Into<String>, view_name: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            kind: FieldKind::HyperlinkedRelated {
                view_name: view_name.into(),
            },
            read_only: true,
            label: None,
        }
    }

    #[must_use]
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Ordered mapping from output field name to descriptor.
pub type FieldMap = IndexMap<String, FieldDescriptor>;

/// Moves the field `source` to `target`, optionally replacing its label.
///
/// The moved descriptor is appended at the end of the mapping; the other
/// fields keep their positions. An existing `target` entry is replaced.
///
/// # Errors
///
/// `ShortcutError::UnknownField` when `source` is not in the mapping.
pub fn rename_field(
    fields: &mut FieldMap,
    source: &str,
    target: &str,
    label: Option<&str>,
) -> Result<(), ShortcutError> {
    let mut field = fields
        .shift_remove(source)
        .ok_or_else(|| ShortcutError::UnknownField {
            field: source.to_string(),
        })?;
    if let Some(label) = label {
        field.label = Some(label.to_string());
    }
    if fields.insert(target.to_string(), field).is_some() {
        tracing::warn!(source, target, "renamed field replaced an existing field");
    }
    Ok(())
}

/// A record fetched as a fallback source of field values.
pub trait FieldSource {
    /// Value of the attribute `name`; `None` when missing or null.
    fn field_value(&self, name: &str) -> Option<Value>;
}

impl FieldSource for Value {
    fn field_value(&self, name: &str) -> Option<Value> {
        self.get(name).filter(|value| !value.is_null()).cloned()
    }
}

impl FieldSource for Map<String, Value> {
    fn field_value(&self, name: &str) -> Option<Value> {
        self.get(name).filter(|value| !value.is_null()).cloned()
    }
}

impl<T: FieldSource> FieldSource for Option<T> {
    fn field_value(&self, name: &str) -> Option<Value> {
        self.as_ref().and_then(|record| record.field_value(name))
    }
}

impl<T: FieldSource + ?Sized> FieldSource for &T {
    fn field_value(&self, name: &str) -> Option<Value> {
        (**self).field_value(name)
    }
}

/// Value of `field_name` from submitted `data`, falling back to the record
/// `fetch(key)` returns. Absence is fine: without a key nothing is fetched
/// and `None` comes back.
///
/// Data is preferred because a partial update may omit the field.
pub fn resolve_optional_value<K, R, F>(
    data: &Map<String, Value>,
    field_name: &str,
    key: Option<K>,
    fetch: F,
) -> Option<Value>
where
    F: FnOnce(K) -> R,
    R: FieldSource,
{
    if let Some(value) = data.get(field_name) {
        return Some(value.clone());
    }
    key.and_then(|key| fetch(key).field_value(field_name))
}

/// Like [`resolve_optional_value`], for fields that must have a value.
/// Only meaningful during update and partial update, where a record to fall
/// back on exists.
///
/// # Errors
///
/// - `ShortcutError::UpdateAssumed` when the field is not in `data` and there is no key.
/// - `ShortcutError::RequiredValueMissing` when the fetched record has no value.
pub fn resolve_required_value<K, R, F>(
    data: &Map<String, Value>,
    field_name: &str,
    key: Option<K>,
    fetch: F,
) -> Result<Value, ShortcutError>
where
    F: FnOnce(K) -> R,
    R: FieldSource,
{
    if let Some(value) = data.get(field_name) {
        return Ok(value.clone());
    }
    let key = key.ok_or_else(|| ShortcutError::UpdateAssumed {
        field: field_name.to_string(),
    })?;
    fetch(key)
        .field_value(field_name)
        .ok_or_else(|| ShortcutError::RequiredValueMissing {
            field: field_name.to_string(),
        })
}

/// Primary key of the record the serializer works on, taken from the view
/// keyword arguments.
#[must_use]
pub fn entity_pk(ctx: &SerializerContext) -> Option<&str> {
    ctx.view_kwargs.get("pk").map(String::as_str)
}
