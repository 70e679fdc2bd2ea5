//! Derivation of URL slugs, view names and type names from model names.

use regex::Regex;
use std::sync::LazyLock;

/// Suffix the router gives to detail views.
pub const DETAIL_VIEW_SUFFIX: &str = "-detail";

static ACRONYM_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Z]+)([A-Z][a-z])").expect("static regex"));
static WORD_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-z\d])([A-Z])").expect("static regex"));

/// Converts a model type name into the base name used for routing,
/// e.g. `"BlogPost"` → `"blog-post"`.
#[must_use]
pub fn derive_base_name(model_name: &str) -> String {
    dasherize(&underscore(model_name))
}

/// Name of the detail view of a viewset registered under `base_name`.
///
/// With a namespace `n` the result is `"n:<base_name>-detail"`.
#[must_use]
pub fn derive_detail_view_name(base_name: &str, namespace: Option<&str>) -> String {
    let detail_name = format!("{base_name}{DETAIL_VIEW_SUFFIX}");
    match namespace {
        Some(namespace) => format!("{namespace}:{detail_name}"),
        None => detail_name,
    }
}

/// `"BlogPost"` → `"blog_post"`, `"HTTPRequest"` → `"http_request"`.
#[must_use]
pub fn underscore(word: &str) -> String {
    let word = word.replace("::", "/");
    let word = ACRONYM_BOUNDARY.replace_all(&word, "${1}_${2}");
    let word = WORD_BOUNDARY.replace_all(&word, "${1}_${2}");
    word.replace('-', "_").to_lowercase()
}

#[must_use]
pub fn dasherize(word: &str) -> String {
    word.replace('_', "-")
}

/// Plural form of a type name. Handles the regular English endings only.
#[must_use]
pub fn pluralize(word: &str) -> String {
    if word.is_empty() {
        return String::new();
    }
    let lower = word.to_lowercase();
    if lower.ends_with('s') && !lower.ends_with("ss") {
        return word.to_string();
    }
    if ["ss", "x", "z", "ch", "sh"].iter().any(|end| lower.ends_with(end)) {
        return format!("{word}es");
    }
    if let Some(stem) = word.strip_suffix('y').or_else(|| word.strip_suffix('Y')) {
        let before_y = stem.chars().last().map(|c| c.to_ascii_lowercase());
        if before_y.is_some_and(|c| !"aeiou".contains(c)) {
            return format!("{stem}ies");
        }
    }
    format!("{word}s")
}

/// `"blog_posts"` → `"Blog posts"`, `"author_id"` → `"Author"`.
#[must_use]
pub fn humanize(word: &str) -> String {
    let word = word.strip_suffix("_id").unwrap_or(word).replace('_', " ");
    let mut chars = word.trim().chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[must_use]
pub fn serializer_type_name(model_name: &str) -> String {
    format!("{model_name}Serializer")
}

#[must_use]
pub fn viewset_type_name(model_name: &str) -> String {
    format!("{}ViewSet", pluralize(model_name))
}
