//! Record access for generated viewsets.
//!
//! Handlers only deal with JSON objects; [`EntityStore`] translates them to
//! sea-orm queries for one entity. Keeping the entity bounds here lets the
//! rest of the crate hold stores as `Arc<dyn RecordStore>`.

use async_trait::async_trait;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, ColumnType, Condition, DatabaseConnection,
    DbErr, EntityTrait, IdenStatic, IntoActiveModel, Iterable, Order, PaginatorTrait,
    PrimaryKeyToColumn, PrimaryKeyTrait, QueryFilter, QueryOrder, TryIntoModel,
    sea_query::{Expr, Func, LikeExpr, SimpleExpr},
};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use std::{fmt, marker::PhantomData, str::FromStr};
use uuid::Uuid;

use crate::errors::ApiError;
use crate::pagination::PageRequest;

/// One `?ordering=` term, already validated against the allowed fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderingTerm {
    pub field: String,
    pub descending: bool,
}

/// A listing request translated to model field names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    /// Every term must match at least one of `search_fields`.
    pub search_terms: Vec<String>,
    pub search_fields: Vec<String>,
    /// Applied before the primary key, which always orders last.
    pub ordering: Vec<OrderingTerm>,
    pub page: PageRequest,
}

/// Records of one page plus the total number of matches.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordPage {
    pub count: u64,
    pub records: Vec<Value>,
}

/// Storage behind a viewset. Records are JSON objects keyed by attribute name;
/// `key` is the raw lookup value from the URL.
#[async_trait]
pub trait RecordStore: Send + Sync + fmt::Debug {
    /// # Errors
    ///
    /// `ApiError::NotFound` for a page past the end, or a database error.
    async fn list(&self, db: &DatabaseConnection, query: &ListQuery)
    -> Result<RecordPage, ApiError>;

    /// `Ok(None)` when no record has this key.
    ///
    /// # Errors
    ///
    /// Database errors.
    async fn fetch(&self, db: &DatabaseConnection, key: &str) -> Result<Option<Value>, ApiError>;

    /// # Errors
    ///
    /// `ApiError::BadRequest` when `data` does not fit the model.
    async fn insert(
        &self,
        db: &DatabaseConnection,
        data: Map<String, Value>,
    ) -> Result<Value, ApiError>;

    /// Writes the attributes present in `data`, leaving the others untouched.
    ///
    /// # Errors
    ///
    /// `ApiError::NotFound` for an unknown key, `ApiError::BadRequest` when
    /// `data` does not fit the model.
    async fn update(
        &self,
        db: &DatabaseConnection,
        key: &str,
        data: Map<String, Value>,
    ) -> Result<Value, ApiError>;

    /// `Ok(false)` when nothing was deleted.
    ///
    /// # Errors
    ///
    /// Database errors.
    async fn delete(&self, db: &DatabaseConnection, key: &str) -> Result<bool, ApiError>;
}

/// [`RecordStore`] for a sea-orm entity.
pub struct EntityStore<E> {
    name: String,
    entity: PhantomData<fn() -> E>,
}

impl<E> EntityStore<E> {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entity: PhantomData,
        }
    }
}

impl<E> fmt::Debug for EntityStore<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityStore").field("name", &self.name).finish()
    }
}

impl<E: EntityTrait> EntityStore<E> {
    fn primary_key() -> Result<E::Column, ApiError> {
        E::PrimaryKey::iter()
            .next()
            .map(PrimaryKeyToColumn::into_column)
            .ok_or_else(|| {
                ApiError::internal(
                    "Server misconfiguration",
                    Some("entity has no primary key".to_string()),
                )
            })
    }

    fn column(name: &str) -> Option<E::Column> {
        E::Column::from_str(name).ok()
    }

    /// Primary key condition for a raw lookup value; `None` when the value
    /// cannot be a key of this entity (e.g. `abc` for an integer key).
    fn key_condition(key: &str) -> Result<Option<Condition>, ApiError> {
        let column = Self::primary_key()?;
        let value = lookup_value(column.def().get_column_type(), key);
        Ok(value.map(|value| Condition::all().add(column.eq(value))))
    }

    fn search_condition(query: &ListQuery) -> Condition {
        let columns: Vec<E::Column> = query
            .search_fields
            .iter()
            .filter_map(|name| Self::column(name))
            .collect();

        query
            .search_terms
            .iter()
            .fold(Condition::all(), |all, term| {
                let any = columns
                    .iter()
                    .fold(Condition::any(), |any, column| {
                        any.add(contains_ignoring_case(*column, term))
                    });
                all.add(any)
            })
    }

    fn not_found(&self, key: &str) -> ApiError {
        ApiError::not_found(&self.name, Some(key.to_string()))
    }
}

/// `UPPER(column) LIKE '%TERM%'` with `%`, `_` and backslashes in the term matched literally.
fn contains_ignoring_case<C: ColumnTrait>(column: C, term: &str) -> SimpleExpr {
    let pattern = format!("%{}%", escape_like_wildcards(term).to_uppercase());
    Expr::expr(Func::upper(Expr::col((column.entity_name(), column))))
        .like(LikeExpr::new(pattern).escape('\\'))
}

fn escape_like_wildcards(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Stand-in for a server-assigned key so the payload deserializes as a model.
fn key_placeholder(column_type: &ColumnType) -> Option<Value> {
    match column_type {
        ColumnType::TinyInteger
        | ColumnType::SmallInteger
        | ColumnType::Integer
        | ColumnType::BigInteger
        | ColumnType::TinyUnsigned
        | ColumnType::SmallUnsigned
        | ColumnType::Unsigned
        | ColumnType::BigUnsigned => Some(Value::from(0)),
        ColumnType::Uuid => Some(Value::String(Uuid::nil().to_string())),
        ColumnType::String(_) | ColumnType::Char(_) | ColumnType::Text => {
            Some(Value::String(String::new()))
        }
        _ => None,
    }
}

fn lookup_value(column_type: &ColumnType, key: &str) -> Option<sea_orm::Value> {
    match column_type {
        ColumnType::TinyInteger
        | ColumnType::SmallInteger
        | ColumnType::Integer
        | ColumnType::BigInteger
        | ColumnType::TinyUnsigned
        | ColumnType::SmallUnsigned
        | ColumnType::Unsigned
        | ColumnType::BigUnsigned => key.parse::<i64>().ok().map(Into::into),
        ColumnType::Uuid => Uuid::parse_str(key).ok().map(Into::into),
        _ => Some(key.to_string().into()),
    }
}

/// Malformed payloads surface as JSON errors from sea-orm.
fn payload_error(err: DbErr) -> ApiError {
    match err {
        DbErr::Json(message) | DbErr::Type(message) => {
            ApiError::bad_request(format!("Invalid data: {message}"))
        }
        other => ApiError::from(other),
    }
}

fn to_json<M: Serialize>(model: &M) -> Result<Value, ApiError> {
    serde_json::to_value(model)
        .map_err(|err| ApiError::internal("Failed to serialize record", Some(err.to_string())))
}

#[async_trait]
impl<E> RecordStore for EntityStore<E>
where
    E: EntityTrait + Sync,
    E::Model: Serialize + DeserializeOwned + IntoActiveModel<E::ActiveModel> + Sync,
    E::ActiveModel: ActiveModelBehavior + TryIntoModel<E::Model> + Send + Sync,
{
    async fn list(
        &self,
        db: &DatabaseConnection,
        query: &ListQuery,
    ) -> Result<RecordPage, ApiError> {
        let mut select = E::find().filter(Self::search_condition(query));
        for term in &query.ordering {
            if let Some(column) = Self::column(&term.field) {
                let order = if term.descending { Order::Desc } else { Order::Asc };
                select = select.order_by(column, order);
            }
        }
        select = select.order_by_asc(Self::primary_key()?);

        let paginator = select.paginate(db, query.page.page_size);
        let count = paginator.num_items().await?;
        query.page.validate(count)?;
        let records = paginator
            .fetch_page(query.page.index())
            .await?
            .iter()
            .map(to_json)
            .collect::<Result<_, _>>()?;

        Ok(RecordPage { count, records })
    }

    async fn fetch(&self, db: &DatabaseConnection, key: &str) -> Result<Option<Value>, ApiError> {
        let Some(condition) = Self::key_condition(key)? else {
            return Ok(None);
        };
        let model = E::find().filter(condition).one(db).await?;
        model.as_ref().map(to_json).transpose()
    }

    async fn insert(
        &self,
        db: &DatabaseConnection,
        mut data: Map<String, Value>,
    ) -> Result<Value, ApiError> {
        let mut assigned = Vec::new();
        for column in E::PrimaryKey::iter().map(PrimaryKeyToColumn::into_column) {
            if data.contains_key(column.as_str()) {
                continue;
            }
            if let Some(placeholder) = key_placeholder(column.def().get_column_type()) {
                data.insert(column.as_str().to_string(), placeholder);
                assigned.push(column);
            }
        }

        let mut active = E::ActiveModel::from_json(Value::Object(data)).map_err(payload_error)?;
        for column in assigned {
            let generate_uuid = !<E::PrimaryKey as PrimaryKeyTrait>::auto_increment()
                && matches!(column.def().get_column_type(), ColumnType::Uuid);
            if generate_uuid {
                active.set(column, Uuid::new_v4().into());
            } else {
                active.not_set(column);
            }
        }
        let model = active.insert(db).await.map_err(payload_error)?;
        tracing::debug!(model = %self.name, "record created");
        to_json(&model)
    }

    async fn update(
        &self,
        db: &DatabaseConnection,
        key: &str,
        data: Map<String, Value>,
    ) -> Result<Value, ApiError> {
        let Some(condition) = Self::key_condition(key)? else {
            return Err(self.not_found(key));
        };
        let existing = E::find()
            .filter(condition)
            .one(db)
            .await?
            .ok_or_else(|| self.not_found(key))?;

        // Deserialize the stored record overlaid with the submitted attributes,
        // then mark only the submitted columns as changed.
        let mut merged = match to_json(&existing)? {
            Value::Object(stored) => stored,
            _ => Map::new(),
        };
        let submitted: Vec<E::Column> = E::Column::iter()
            .filter(|column| data.contains_key(column.as_str()))
            .collect();
        merged.extend(data);
        let changes = E::ActiveModel::from_json(Value::Object(merged)).map_err(payload_error)?;

        let mut active: E::ActiveModel = existing.into_active_model();
        for column in submitted {
            if let Some(value) = changes.get(column).into_value() {
                active.set(column, value);
            }
        }
        let model = active.update(db).await.map_err(payload_error)?;
        tracing::debug!(model = %self.name, key, "record updated");
        to_json(&model)
    }

    async fn delete(&self, db: &DatabaseConnection, key: &str) -> Result<bool, ApiError> {
        let Some(condition) = Self::key_condition(key)? else {
            return Ok(false);
        };
        let result = E::delete_many().filter(condition).exec(db).await?;
        Ok(result.rows_affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_value_follows_key_type() {
        assert_eq!(
            lookup_value(&ColumnType::Integer, "42"),
            Some(sea_orm::Value::BigInt(Some(42)))
        );
        assert_eq!(lookup_value(&ColumnType::Integer, "abc"), None);
        assert_eq!(lookup_value(&ColumnType::Uuid, "not-a-uuid"), None);

        let id = Uuid::new_v4();
        assert_eq!(
            lookup_value(&ColumnType::Uuid, &id.to_string()),
            Some(sea_orm::Value::from(id))
        );
        assert_eq!(
            lookup_value(&ColumnType::Text, "slug"),
            Some(sea_orm::Value::from("slug".to_string()))
        );
    }

    #[test]
    fn test_like_wildcards_are_escaped() {
        assert_eq!(escape_like_wildcards("100%"), "100\\%");
        assert_eq!(escape_like_wildcards("snake_case"), "snake\\_case");
        assert_eq!(escape_like_wildcards("a\\b"), "a\\\\b");
        assert_eq!(escape_like_wildcards("plain"), "plain");
    }

    #[test]
    fn test_key_placeholder_follows_key_type() {
        assert_eq!(key_placeholder(&ColumnType::Integer), Some(Value::from(0)));
        assert_eq!(
            key_placeholder(&ColumnType::Uuid),
            Some(Value::String(Uuid::nil().to_string()))
        );
        assert_eq!(key_placeholder(&ColumnType::Boolean), None);
    }

    #[test]
    fn test_payload_errors_are_bad_requests() {
        let err = payload_error(DbErr::Json("missing field `title`".into()));
        assert!(matches!(err, ApiError::BadRequest { .. }));
        let err = payload_error(DbErr::Custom("boom".into()));
        assert!(matches!(err, ApiError::Database { .. }));
    }
}
