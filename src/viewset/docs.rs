//! Usage notes appended to viewset descriptions.
//!
//! The description is what an `OPTIONS` request on the list endpoint returns,
//! so these texts tell API consumers which query parameters they can use.

use crate::errors::ShortcutError;

#[must_use]
pub fn append_pagination_info(doc: &str, page_size: u64) -> String {
    format!(
        "{doc}\nSpecify \"?page=<page number>\" to get particular page. Page size is {page_size}.\n"
    )
}

#[must_use]
pub fn append_search_info(doc: &str) -> String {
    format!("{doc}\nSpecify \"?search=<search terms here>\" query parameter to search items.\n")
}

/// # Errors
///
/// `ShortcutError::NoOrderingFields` when `fields` is empty.
pub fn append_ordering_info<S: AsRef<str>>(
    doc: &str,
    fields: &[S],
    model: &str,
) -> Result<String, ShortcutError> {
    let Some(first) = fields.first() else {
        return Err(ShortcutError::NoOrderingFields {
            model: model.to_string(),
        });
    };
    let names: Vec<&str> = fields.iter().map(AsRef::as_ref).collect();

    let mut appended = format!(
        "Specify \"?ordering=<fields to order by here>\" query parameter to order results.\n\n\
         You can use following fields for ordering: {}.\n\n\
         To reverse ordering of a field prefix it with hyphen '-': ?ordering=-{}.\n",
        names.join(", "),
        first.as_ref(),
    );
    if names.len() > 1 {
        appended.push_str(&format!(
            "You can specify multiple orderings by separating them using comma: ?ordering={}.\n",
            names[..2].join(",")
        ));
    }
    Ok(format!("{doc}\n{appended}"))
}

/// Search, then ordering, then pagination notes.
///
/// # Errors
///
/// `ShortcutError::NoOrderingFields` when `fields` is empty.
pub fn append_search_ordering_and_pagination_info<S: AsRef<str>>(
    doc: &str,
    fields: &[S],
    model: &str,
    page_size: u64,
) -> Result<String, ShortcutError> {
    let doc = append_search_info(doc);
    let doc = append_ordering_info(&doc, fields, model)?;
    Ok(append_pagination_info(&doc, page_size))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_info() {
        assert_eq!(
            append_pagination_info("Doc.\n", 10),
            "Doc.\n\nSpecify \"?page=<page number>\" to get particular page. Page size is 10.\n"
        );
    }

    #[test]
    fn test_ordering_info_single_field() {
        let doc = append_ordering_info("Doc.\n", &["id"], "Tag").unwrap();
        assert!(doc.contains("You can use following fields for ordering: id.\n"));
        assert!(doc.contains("?ordering=-id.\n"));
        assert!(!doc.contains("multiple orderings"));
    }

    #[test]
    fn test_ordering_info_multiple_fields() {
        let doc = append_ordering_info("Doc.\n", &["id", "title", "author_id"], "BlogPost").unwrap();
        assert!(doc.contains("ordering: id, title, author_id."));
        assert!(doc.ends_with(
            "You can specify multiple orderings by separating them using comma: ?ordering=id,title.\n"
        ));
    }

    #[test]
    fn test_ordering_info_requires_fields() {
        let err = append_ordering_info::<&str>("Doc.\n", &[], "Empty").unwrap_err();
        assert!(matches!(err, ShortcutError::NoOrderingFields { model } if model == "Empty"));
    }

    #[test]
    fn test_combined_order() {
        let doc = append_search_ordering_and_pagination_info("Doc.\n", &["id"], "Tag", 25).unwrap();
        let search = doc.find("?search=").unwrap();
        let ordering = doc.find("?ordering=").unwrap();
        let page = doc.find("?page=").unwrap();
        assert!(doc.starts_with("Doc.\n"));
        assert!(search < ordering && ordering < page);
    }
}
