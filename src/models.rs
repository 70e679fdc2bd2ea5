use sea_orm::{
    ColumnTrait, ColumnType, EntityTrait, IdenStatic, Iterable, PrimaryKeyToColumn,
    RelationTrait,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::naming::underscore;

/// Implemented by sea-orm entities that are exposed through the generated
/// serializers and viewsets.
///
/// ```rust,ignore
/// impl ApiModel for blog_post::Entity {
///     const MODEL_NAME: &'static str = "BlogPost";
/// }
/// ```
pub trait ApiModel: EntityTrait {
    /// Type name of the model; slugs and type names are derived from it.
    const MODEL_NAME: &'static str;

    #[must_use]
    fn descriptor() -> ModelDescriptor {
        ModelDescriptor::from_entity::<Self>(Self::MODEL_NAME)
    }
}

/// Storage category of a model field, as far as the helpers care.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Bounded-length string (`VARCHAR` / `CHAR`).
    ShortText,
    /// Unbounded text.
    Text,
    Integer,
    Float,
    Boolean,
    Uuid,
    Temporal,
    Json,
    Binary,
    Other,
    /// The other side of a relation whose foreign key lives on another model.
    ReverseRelation,
}

impl FieldType {
    #[must_use]
    pub fn from_column_type(column_type: &ColumnType) -> Self {
        match column_type {
            ColumnType::Char(_) | ColumnType::String(_) => Self::ShortText,
            ColumnType::Text => Self::Text,
            ColumnType::TinyInteger
            | ColumnType::SmallInteger
            | ColumnType::Integer
            | ColumnType::BigInteger
            | ColumnType::TinyUnsigned
            | ColumnType::SmallUnsigned
            | ColumnType::Unsigned
            | ColumnType::BigUnsigned
            | ColumnType::Year => Self::Integer,
            ColumnType::Float
            | ColumnType::Double
            | ColumnType::Decimal(_)
            | ColumnType::Money(_) => Self::Float,
            ColumnType::Boolean => Self::Boolean,
            ColumnType::Uuid => Self::Uuid,
            ColumnType::Date
            | ColumnType::Time
            | ColumnType::DateTime
            | ColumnType::Timestamp
            | ColumnType::TimestampWithTimeZone => Self::Temporal,
            ColumnType::Json | ColumnType::JsonBinary => Self::Json,
            ColumnType::Binary(_) | ColumnType::VarBinary(_) | ColumnType::Blob => Self::Binary,
            _ => Self::Other,
        }
    }

    /// Whether the field is backed by a column of the model's own table.
    #[must_use]
    pub fn is_concrete(self) -> bool {
        self != Self::ReverseRelation
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelField {
    pub name: String,
    pub field_type: FieldType,
}

impl ModelField {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }
}

/// Read-only description of a model: its name, its fields in declaration
/// order, and its primary key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDescriptor {
    pub name: String,
    pub table_name: String,
    pub fields: Vec<ModelField>,
    pub primary_key: String,
}

impl ModelDescriptor {
    /// Descriptor assembled by hand, primary key `"id"`.
    pub fn new(name: impl Into<String>, fields: Vec<ModelField>) -> Self {
        let name = name.into();
        Self {
            table_name: underscore(&name),
            name,
            fields,
            primary_key: "id".to_string(),
        }
    }

    #[must_use]
    pub fn with_primary_key(mut self, primary_key: impl Into<String>) -> Self {
        self.primary_key = primary_key.into();
        self
    }

    /// Reads columns, primary key and reverse relations of a sea-orm entity.
    ///
    /// Reverse relations are the `has_one`/`has_many` relations defined on
    /// this entity; they are named after the relation variant.
    #[must_use]
    pub fn from_entity<E: EntityTrait>(name: &str) -> Self {
        let mut fields: Vec<ModelField> = E::Column::iter()
            .map(|column| {
                ModelField::new(
                    column.as_str(),
                    FieldType::from_column_type(column.def().get_column_type()),
                )
            })
            .collect();

        fields.extend(
            E::Relation::iter()
                .filter(|relation| relation.def().is_owner)
                .map(|relation| {
                    ModelField::new(
                        underscore(&format!("{relation:?}")),
                        FieldType::ReverseRelation,
                    )
                }),
        );

        let primary_key = E::PrimaryKey::iter()
            .next()
            .map_or_else(|| "id".to_string(), |pk| pk.into_column().as_str().to_string());

        Self {
            name: name.to_string(),
            table_name: E::default().table_name().to_string(),
            fields,
            primary_key,
        }
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&ModelField> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Fields stored in the model's own table.
    pub fn concrete_fields(&self) -> impl Iterator<Item = &ModelField> {
        self.fields.iter().filter(|field| field.field_type.is_concrete())
    }
}

/// Query parameters understood by generated listing endpoints.
///
/// - `page`: 1-based page number, e.g. `?page=2`
/// - `search`: whitespace separated terms matched against short text fields,
///   e.g. `?search=rust axum`
/// - `ordering`: comma separated field names, `-` prefix for descending,
///   e.g. `?ordering=-createdAt,title`
/// - `forceUrls`: `true` / `false` to keep or strip hyperlink fields
#[derive(Debug, Deserialize, IntoParams, ToSchema, Default)]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    /// Page number (1-based).
    #[param(example = 1)]
    pub page: Option<u64>,
    /// Search terms.
    #[param(example = "rust")]
    pub search: Option<String>,
    /// Fields to order by.
    #[param(example = "-id")]
    pub ordering: Option<String>,
    /// Keep (`true`) or strip (`false`) hyperlink fields.
    #[serde(rename = "forceUrls")]
    #[param(example = "true")]
    pub force_urls: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_type_mapping() {
        assert_eq!(
            FieldType::from_column_type(&ColumnType::String(sea_orm::sea_query::StringLen::None)),
            FieldType::ShortText
        );
        assert_eq!(FieldType::from_column_type(&ColumnType::Text), FieldType::Text);
        assert_eq!(FieldType::from_column_type(&ColumnType::Integer), FieldType::Integer);
        assert_eq!(FieldType::from_column_type(&ColumnType::Uuid), FieldType::Uuid);
        assert_eq!(
            FieldType::from_column_type(&ColumnType::TimestampWithTimeZone),
            FieldType::Temporal
        );
    }

    #[test]
    fn test_manual_descriptor() {
        let model = ModelDescriptor::new(
            "BlogPost",
            vec![
                ModelField::new("id", FieldType::Integer),
                ModelField::new("comments", FieldType::ReverseRelation),
            ],
        );
        assert_eq!(model.table_name, "blog_post");
        assert_eq!(model.primary_key, "id");
        assert_eq!(model.concrete_fields().count(), 1);
        assert!(model.field("comments").is_some());
        assert!(model.field("missing").is_none());
    }

    #[test]
    fn test_list_params_deserialization() {
        let params: ListParams =
            serde_json::from_str(r#"{"page":2,"ordering":"-id","forceUrls":"false"}"#).unwrap();
        assert_eq!(params.page, Some(2));
        assert_eq!(params.ordering.as_deref(), Some("-id"));
        assert_eq!(params.force_urls.as_deref(), Some("false"));
        assert_eq!(params.search, None);
    }
}
