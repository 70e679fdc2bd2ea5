use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use utoipa::ToSchema;

use crate::context::RequestContext;
use crate::errors::ApiError;

/// Query parameter selecting the page.
pub const PAGE_PARAM: &str = "page";

/// Position of a listing request: 1-based page number and page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub page_size: u64,
}

impl PageRequest {
    #[must_use]
    pub fn new(page: Option<u64>, page_size: u64) -> Self {
        Self {
            page: page.unwrap_or(1),
            page_size: page_size.max(1),
        }
    }

    /// Zero-based index as used by the paginator.
    #[must_use]
    pub fn index(&self) -> u64 {
        self.page.saturating_sub(1)
    }

    #[must_use]
    pub fn page_count(&self, count: u64) -> u64 {
        count.div_ceil(self.page_size).max(1)
    }

    /// Page 0 and pages past the end are rejected; page 1 always exists.
    ///
    /// # Errors
    ///
    /// `ApiError::NotFound` for the requested page.
    pub fn validate(&self, count: u64) -> Result<(), ApiError> {
        if self.page == 0 || self.page > self.page_count(count) {
            return Err(ApiError::not_found("Page", Some(self.page.to_string())));
        }
        Ok(())
    }
}

/// One page of a listing.
#[derive(Debug, Serialize, ToSchema)]
pub struct Page {
    /// Total number of matching records.
    pub count: u64,
    /// Link to the next page, if any.
    pub next: Option<String>,
    /// Link to the previous page, if any.
    pub previous: Option<String>,
    #[schema(value_type = Vec<Object>)]
    pub results: Vec<Value>,
}

impl Page {
    /// Links keep every query parameter of the request and replace `page`.
    /// The link to the first page carries no `page` parameter.
    #[must_use]
    pub fn new(
        results: Vec<Value>,
        count: u64,
        request: PageRequest,
        ctx: &RequestContext,
    ) -> Self {
        let next = (request.page < request.page_count(count))
            .then(|| page_link(ctx, Some(request.page + 1)));
        let previous = (request.page > 1).then(|| {
            let target = request.page - 1;
            page_link(ctx, (target > 1).then_some(target))
        });
        Self {
            count,
            next,
            previous,
            results,
        }
    }
}

fn page_link(ctx: &RequestContext, page: Option<u64>) -> String {
    let mut params: BTreeMap<&str, String> = ctx
        .query
        .iter()
        .filter(|(key, _)| key.as_str() != PAGE_PARAM)
        .map(|(key, value)| (key.as_str(), value.clone()))
        .collect();
    if let Some(page) = page {
        params.insert(PAGE_PARAM, page.to_string());
    }

    let mut link = format!("{}{}", ctx.origin.as_deref().unwrap_or_default(), ctx.path);
    if !params.is_empty() {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(params.iter())
            .finish();
        link.push('?');
        link.push_str(&query);
    }
    link
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Method;

    fn ctx() -> RequestContext {
        RequestContext::new(Method::GET)
            .with_path("/blog-post/")
            .with_origin("http://example.org")
            .with_query("search", "rust axum")
    }

    #[test]
    fn test_page_count() {
        let request = PageRequest::new(None, 10);
        assert_eq!(request.page_count(0), 1);
        assert_eq!(request.page_count(10), 1);
        assert_eq!(request.page_count(11), 2);
    }

    #[test]
    fn test_validate() {
        assert!(PageRequest::new(Some(1), 10).validate(0).is_ok());
        assert!(PageRequest::new(Some(2), 10).validate(11).is_ok());
        assert!(PageRequest::new(Some(3), 10).validate(11).is_err());
        assert!(PageRequest::new(Some(0), 10).validate(11).is_err());
    }

    #[test]
    fn test_links_on_middle_page() {
        let page = Page::new(Vec::new(), 30, PageRequest::new(Some(2), 10), &ctx());
        assert_eq!(
            page.next.as_deref(),
            Some("http://example.org/blog-post/?page=3&search=rust+axum")
        );
        assert_eq!(
            page.previous.as_deref(),
            Some("http://example.org/blog-post/?search=rust+axum")
        );
    }

    #[test]
    fn test_no_links_on_single_page() {
        let page = Page::new(Vec::new(), 3, PageRequest::new(None, 10), &ctx());
        assert_eq!(page.next, None);
        assert_eq!(page.previous, None);
    }
}
