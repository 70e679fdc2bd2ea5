use regex::{Captures, Regex};
use std::sync::LazyLock;

use super::FieldTransform;
use crate::context::SerializerContext;
use crate::errors::ShortcutError;
use crate::fields::{FieldMap, rename_field};

static UNDERSCORED_CHAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("_(.)").expect("static regex"));

/// `first_name` → `firstName`, `_private` → `Private`. A trailing
/// underscore has nothing to capitalise and stays.
#[must_use]
pub fn js_friendly_name(name: &str) -> String {
    UNDERSCORED_CHAR
        .replace_all(name, |caps: &Captures| caps[1].to_uppercase())
        .into_owned()
}

/// Renames every snake_case field to its JavaScript-friendly form, in the
/// original field order.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsFriendlyRenaming;

impl FieldTransform for JsFriendlyRenaming {
    fn apply(&self, fields: &mut FieldMap, _ctx: &SerializerContext) -> Result<(), ShortcutError> {
        let snake_names: Vec<String> = fields
            .keys()
            .filter(|name| name.contains('_'))
            .cloned()
            .collect();

        for name in snake_names {
            let target = js_friendly_name(&name);
            if target != name {
                rename_field(fields, &name, &target, None)?;
            }
        }
        Ok(())
    }
}
