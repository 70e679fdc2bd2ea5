//! Injection of the requesting user into incoming data.
//!
//! [`AuthorInjection`] fills "created by" fields on `POST`,
//! [`EditorInjection`] fills "last modified by" fields on `PUT` and `PATCH`.
//! [`LegacyAuthorCheck`] is the older single-step variant that also rejects
//! payloads naming somebody else as the author.

use serde_json::{Map, Value};
use std::{fmt, sync::Arc};
use uuid::Uuid;

use super::DataTransform;
use crate::context::{Principal, SerializerContext};
use crate::errors::{ApiError, ShortcutError};
use crate::fields::{entity_pk, resolve_optional_value};

/// Custom injection logic, called with the normalized data and the user.
pub type InjectionHook = Arc<dyn Fn(&mut Map<String, Value>, &Principal) + Send + Sync>;

/// Where the user goes: a named field receiving the user id, or a hook.
#[derive(Clone)]
pub enum InjectionTarget {
    Field(String),
    Hook(InjectionHook),
}

impl InjectionTarget {
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field(name.into())
    }

    pub fn hook<F>(hook: F) -> Self
    where
        F: Fn(&mut Map<String, Value>, &Principal) + Send + Sync + 'static,
    {
        Self::Hook(Arc::new(hook))
    }

    pub(crate) fn validated(self, role: &'static str) -> Result<Self, ShortcutError> {
        match &self {
            Self::Field(name) if name.trim().is_empty() => {
                Err(ShortcutError::MissingInjectionTarget { role })
            }
            _ => Ok(self),
        }
    }

    fn inject(&self, data: &mut Map<String, Value>, user: &Principal) {
        match self {
            Self::Field(name) => {
                data.insert(name.clone(), user.identity());
            }
            Self::Hook(hook) => hook(data, user),
        }
    }
}

impl fmt::Debug for InjectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => f.debug_tuple("Field").field(name).finish(),
            Self::Hook(_) => f.write_str("Hook(..)"),
        }
    }
}

/// Per-normalization state, created fresh for every request.
#[derive(Debug, Default, Clone)]
pub struct NormalizationState {
    author_injected: bool,
}

impl NormalizationState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn author_injected(&self) -> bool {
        self.author_injected
    }
}

#[derive(Debug, Clone)]
pub struct AuthorInjection {
    target: InjectionTarget,
}

impl AuthorInjection {
    /// # Errors
    ///
    /// `ShortcutError::MissingInjectionTarget` for an empty field name.
    pub fn new(target: InjectionTarget) -> Result<Self, ShortcutError> {
        Ok(Self {
            target: target.validated("author")?,
        })
    }
}

impl DataTransform for AuthorInjection {
    fn apply(
        &self,
        data: &mut Map<String, Value>,
        ctx: &SerializerContext,
        _state: &mut NormalizationState,
    ) -> Result<(), ApiError> {
        if let Some(request) = ctx.request.as_ref().filter(|request| request.is_create()) {
            if let Some(user) = &request.user {
                self.target.inject(data, user);
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct EditorInjection {
    target: InjectionTarget,
}

impl EditorInjection {
    /// # Errors
    ///
    /// `ShortcutError::MissingInjectionTarget` for an empty field name.
    pub fn new(target: InjectionTarget) -> Result<Self, ShortcutError> {
        Ok(Self {
            target: target.validated("editor")?,
        })
    }
}

impl DataTransform for EditorInjection {
    fn apply(
        &self,
        data: &mut Map<String, Value>,
        ctx: &SerializerContext,
        _state: &mut NormalizationState,
    ) -> Result<(), ApiError> {
        if let Some(request) = ctx.request.as_ref().filter(|request| request.is_update()) {
            if let Some(user) = &request.user {
                self.target.inject(data, user);
            }
        }
        Ok(())
    }
}

/// Deprecated: prefer [`AuthorInjection`] together with [`EditorInjection`].
///
/// On create and update the author currently known (from the payload, or
/// from the stored record on update) must be the requesting user. A match or
/// an empty value lets the user id be written; a mismatch is a validation
/// error. Once injected, later passes with the same state do nothing.
#[derive(Debug, Clone)]
pub struct LegacyAuthorCheck {
    field: String,
}

impl LegacyAuthorCheck {
    /// # Errors
    ///
    /// `ShortcutError::MissingInjectionTarget` for an empty field name.
    pub fn new(field: impl Into<String>) -> Result<Self, ShortcutError> {
        let field = field.into();
        if field.trim().is_empty() {
            return Err(ShortcutError::MissingInjectionTarget { role: "author" });
        }
        Ok(Self { field })
    }
}

fn is_same_user(value: &Value, user: &Principal) -> bool {
    value
        .as_str()
        .and_then(|raw| Uuid::parse_str(raw).ok())
        .is_some_and(|id| id == user.id)
}

impl DataTransform for LegacyAuthorCheck {
    fn apply(
        &self,
        data: &mut Map<String, Value>,
        ctx: &SerializerContext,
        state: &mut NormalizationState,
    ) -> Result<(), ApiError> {
        if state.author_injected {
            return Ok(());
        }
        let Some(request) = ctx
            .request
            .as_ref()
            .filter(|request| request.is_create() || request.is_update())
        else {
            return Ok(());
        };
        let Some(user) = &request.user else {
            return Ok(());
        };

        let current = resolve_optional_value(data, &self.field, entity_pk(ctx), |_| {
            ctx.instance.as_ref()
        });
        if let Some(current) = current.filter(|value| !value.is_null()) {
            if !is_same_user(&current, user) {
                return Err(ApiError::validation_failed(vec![format!(
                    "{}: author must be the current user",
                    self.field
                )]));
            }
        }

        data.insert(self.field.clone(), user.identity());
        state.author_injected = true;
        Ok(())
    }
}
