//! # Error Handling
//!
//! Two error families live here:
//!
//! - [`ShortcutError`]: programming and misconfiguration errors raised by the
//!   helpers themselves (renaming a field that does not exist, resolving a
//!   required value without a record to fall back on, configuring an
//!   injection without a target). They are returned as `Err` and are meant to
//!   surface during development, not to be recovered from.
//! - [`ApiError`]: errors that reach HTTP clients. Internal details are logged
//!   through `tracing` and never sent in the response body.
//!
//! ```rust,ignore
//! async fn handler() -> Result<Json<Value>, ApiError> {
//!     let record = store
//!         .fetch(&db, &pk)
//!         .await?
//!         .ok_or_else(|| ApiError::not_found("BlogPost", Some(pk.clone())))?;
//!     Ok(Json(record))
//! }
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::{DbErr, SqlErr};
use serde::Serialize;
use std::fmt;

/// Misuse of the helpers: fatal preconditions and misconfiguration.
#[derive(Debug, thiserror::Error)]
pub enum ShortcutError {
    /// A field was looked up in a field mapping that does not declare it.
    #[error("field '{field}' is not declared by the serializer")]
    UnknownField { field: String },

    /// A required value was missing from the data and there was no record
    /// to fall back on.
    #[error("update or partial update is assumed when resolving '{field}'")]
    UpdateAssumed { field: String },

    /// The record fetched as a fallback holds no value for a required field.
    #[error("required field value for '{field}' is unexpectedly absent")]
    RequiredValueMissing { field: String },

    /// An injection was configured with neither a field name nor a hook.
    #[error("{role} injection needs a field name or a hook")]
    MissingInjectionTarget { role: &'static str },

    /// Ordering documentation was requested for a model without orderable fields.
    #[error("at least one ordering field is required for '{model}'")]
    NoOrderingFields { model: String },

    /// Endpoints need a path segment of their own; `/` is the API root.
    #[error("endpoint prefix must not be empty")]
    EmptyPrefix,

    #[error("invalid lookup pattern '{pattern}'")]
    LookupPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error(transparent)]
    Config(#[from] figment::Error),
}

/// API error type with automatic logging and sanitized responses
#[derive(Debug)]
pub enum ApiError {
    /// 404 Not Found - Resource doesn't exist
    NotFound {
        /// Resource type (e.g., "`BlogPost`")
        resource: String,
        /// Optional lookup value that wasn't found
        id: Option<String>,
    },

    /// 400 Bad Request - Malformed input from the client
    BadRequest { message: String },

    /// 409 Conflict - Resource conflict (e.g., duplicate key)
    Conflict { message: String },

    /// 422 Unprocessable Entity - Validation failed
    ValidationFailed { errors: Vec<String> },

    /// 500 Internal Server Error - Database error (details logged, not exposed)
    Database { message: String, internal: DbErr },

    /// 500 Internal Server Error - Generic internal error
    Internal {
        message: String,
        internal: Option<String>,
    },
}

impl ApiError {
    pub fn not_found(resource: impl Into<String>, id: Option<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn validation_failed(errors: Vec<String>) -> Self {
        Self::ValidationFailed { errors }
    }

    /// Create a 500 error from a database error. Unique constraint
    /// violations become 409 instead.
    #[must_use]
    pub fn database(err: DbErr) -> Self {
        if let Some(SqlErr::UniqueConstraintViolation(_)) = err.sql_err() {
            return Self::conflict("Duplicate entry");
        }
        Self::Database {
            message: "A database error occurred".to_string(),
            internal: err,
        }
    }

    pub fn internal(message: impl Into<String>, internal: Option<String>) -> Self {
        Self::Internal {
            message: message.into(),
            internal,
        }
    }

    /// HTTP status code for this error
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::ValidationFailed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Database { .. } | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// User-facing error message (sanitized)
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound { resource, id } => match id {
                Some(id) => format!("{resource} with ID '{id}' not found"),
                None => format!("{resource} not found"),
            },
            Self::ValidationFailed { errors } => {
                if errors.len() == 1 {
                    errors[0].clone()
                } else {
                    format!("Validation failed: {}", errors.join(", "))
                }
            }
            Self::BadRequest { message }
            | Self::Conflict { message }
            | Self::Database { message, .. }
            | Self::Internal { message, .. } => message.clone(),
        }
    }

    fn log_internal(&self) {
        match self {
            Self::Database { internal, .. } => {
                tracing::error!(error = ?internal, "Database error occurred");
            }
            Self::Internal {
                internal: Some(details),
                ..
            } => {
                tracing::error!(details = %details, "Internal error occurred");
            }
            _ => {
                tracing::debug!(
                    error = %self.user_message(),
                    status = %self.status_code(),
                    "API error"
                );
            }
        }
    }
}

/// Error response sent to users (sanitized)
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<String>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log_internal();

        let status = self.status_code();
        let response = match &self {
            Self::ValidationFailed { errors } => ErrorResponse {
                error: "Validation failed".to_string(),
                details: Some(errors.clone()),
            },
            _ => ErrorResponse {
                error: self.user_message(),
                details: None,
            },
        };

        (status, Json(response)).into_response()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.user_message())
    }
}

impl std::error::Error for ApiError {}

/// `DbErr::RecordNotFound` becomes 404, everything else goes through
/// [`ApiError::database`].
impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        match &err {
            DbErr::RecordNotFound(msg) => {
                let resource = msg.split_whitespace().next().unwrap_or("Resource");
                Self::NotFound {
                    resource: resource.to_string(),
                    id: None,
                }
            }
            _ => Self::database(err),
        }
    }
}

/// A misconfigured serializer discovered while serving a request is a
/// server fault; the details go to the log only.
impl From<ShortcutError> for ApiError {
    fn from(err: ShortcutError) -> Self {
        Self::internal("Server misconfiguration", Some(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_with_id() {
        let err = ApiError::not_found("BlogPost", Some("42".to_string()));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.user_message(), "BlogPost with ID '42' not found");
    }

    #[test]
    fn test_not_found_without_id() {
        let err = ApiError::not_found("BlogPost", None);
        assert_eq!(err.user_message(), "BlogPost not found");
    }

    #[test]
    fn test_validation_failed_messages() {
        let single = ApiError::validation_failed(vec!["authorId: mismatch".to_string()]);
        assert_eq!(single.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(single.user_message(), "authorId: mismatch");

        let many = ApiError::validation_failed(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(many.user_message(), "Validation failed: a, b");
    }

    #[test]
    fn test_database_error_is_sanitized() {
        let err = ApiError::database(DbErr::Custom("connection refused at 10.0.0.3".to_string()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.user_message(), "A database error occurred");
    }

    #[test]
    fn test_dberr_record_not_found_becomes_404() {
        let api_err: ApiError = DbErr::RecordNotFound("BlogPost not found".to_string()).into();
        assert_eq!(api_err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(api_err.user_message(), "BlogPost not found");
    }

    #[test]
    fn test_shortcut_error_becomes_internal() {
        let api_err: ApiError = ShortcutError::UnknownField {
            field: "title".to_string(),
        }
        .into();
        assert_eq!(api_err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api_err.user_message(), "Server misconfiguration");
    }

    #[test]
    fn test_shortcut_error_messages() {
        let err = ShortcutError::UpdateAssumed {
            field: "foo".to_string(),
        };
        assert!(err.to_string().contains("update is assumed"));

        let err = ShortcutError::RequiredValueMissing {
            field: "foo".to_string(),
        };
        assert!(err.to_string().contains("required field value"));
    }
}
