//! Page-number pagination over encoded documents.
//!
//! The sequence is sliced before anything is encoded, so references are only
//! resolved for documents that land on the requested page.
//!
//! # Example
//!
//! ```rust
//! use goodjson::pagination::{Page, PageRequest};
//!
//! let page = Page::compute(PageRequest::new(3, 15), 37).unwrap();
//! assert_eq!(page.total_pages, 3);
//! assert_eq!(page.range(), 30..37);
//! assert!(!page.has_next());
//! ```

use std::ops::{Range, RangeInclusive};

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::codec::{DocumentNode, Encoder};
use crate::error::{EncodeError, PaginationError};
use crate::model::{Document, FieldType};
use crate::policy::should_encode;

/// Page size used when the request does not give one.
pub const DEFAULT_PER_PAGE: usize = 15;

/// A requested page: 1-indexed number and page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PageRequest {
    pub page: usize,
    pub per_page: usize,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl PageRequest {
    pub fn new(page: usize, per_page: usize) -> Self {
        Self { page, per_page }
    }

    /// Page `page` at the default size.
    pub fn page(page: usize) -> Self {
        Self {
            page,
            ..Self::default()
        }
    }
}

/// Page metadata derived from a request and the sequence length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub page: usize,
    pub per_page: usize,
    /// 0 for an empty sequence.
    pub total_pages: usize,
    pub total_count: usize,
}

impl Page {
    /// Validates the request and computes totals for `total_count` items.
    pub fn compute(request: PageRequest, total_count: usize) -> Result<Self, PaginationError> {
        if request.per_page < 1 {
            return Err(PaginationError::InvalidParameter {
                name: "perPage",
                value: request.per_page,
            });
        }
        if request.page < 1 {
            return Err(PaginationError::InvalidParameter {
                name: "page",
                value: request.page,
            });
        }
        Ok(Self {
            page: request.page,
            per_page: request.per_page,
            total_pages: total_count.div_ceil(request.per_page),
            total_count,
        })
    }

    /// Index range of this page's items. Empty past the last page.
    pub fn range(&self) -> Range<usize> {
        let start = self.page.saturating_sub(1).saturating_mul(self.per_page).min(self.total_count);
        let end = start.saturating_add(self.per_page).min(self.total_count);
        start..end
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn prev_num(&self) -> Option<usize> {
        self.has_prev().then(|| self.page - 1)
    }

    pub fn next_num(&self) -> Option<usize> {
        self.has_next().then(|| self.page + 1)
    }

    /// All page numbers.
    pub fn pages(&self) -> RangeInclusive<usize> {
        1..=self.total_pages
    }

    /// Page numbers for a pagination widget, with `None` marking each gap.
    ///
    /// Keeps `left_edge` pages at the start, `right_edge` at the end, and
    /// the pages from `page - left_current` to `page + right_current - 1`
    /// around the current one.
    pub fn iter_pages(
        &self,
        left_edge: usize,
        left_current: usize,
        right_current: usize,
        right_edge: usize,
    ) -> Vec<Option<usize>> {
        let mut out = Vec::new();
        let mut last = 0;
        for num in self.pages() {
            let near_current =
                num + left_current + 1 > self.page && num < self.page + right_current;
            let keep = num <= left_edge || near_current || num + right_edge > self.total_pages;
            if keep {
                if last + 1 != num {
                    out.push(None);
                }
                out.push(Some(num));
                last = num;
            }
        }
        out
    }

    /// [`iter_pages`](Self::iter_pages) with the usual 2/2/3/2 window.
    pub fn iter_pages_default(&self) -> Vec<Option<usize>> {
        self.iter_pages(2, 2, 3, 2)
    }
}

/// One page of encoded items plus its metadata.
///
/// Serializes as `{"items", "page", "perPage", "totalPages", "totalCount"}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageEnvelope<T = DocumentNode> {
    pub items: Vec<T>,
    #[serde(flatten)]
    pub meta: Page,
}

impl<T: Serialize> PageEnvelope<T> {
    pub fn to_json(&self) -> Result<JsonValue, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// Encodes one page of `docs`.
pub fn paginate(
    encoder: &Encoder<'_>,
    docs: &[Document],
    request: PageRequest,
) -> Result<PageEnvelope, PaginationError> {
    let meta = Page::compute(request, docs.len())?;
    let items = encoder.encode_many(&docs[meta.range()])?;
    debug!(
        page = meta.page,
        per_page = meta.per_page,
        total_count = meta.total_count,
        items = items.len(),
        "paginated documents"
    );
    Ok(PageEnvelope { items, meta })
}

/// Encodes one page of the elements of a list field of `doc`.
///
/// An unset field pages over an empty list. A field whose policy keeps it
/// out of encoded documents is rejected with
/// [`PaginationError::ExcludedField`].
pub fn paginate_field(
    encoder: &Encoder<'_>,
    doc: &Document,
    field: &str,
    request: PageRequest,
) -> Result<PageEnvelope<JsonValue>, PaginationError> {
    let schema = encoder
        .registry()
        .get(doc.collection())
        .ok_or_else(|| EncodeError::UnknownSchema {
            name: doc.collection().to_string(),
        })?;
    let descriptor = schema.field(field);
    if descriptor.is_some_and(|f| !should_encode(f)) {
        return Err(PaginationError::ExcludedField {
            field: field.to_string(),
        });
    }
    let element_type = match descriptor.map(|f| &f.field_type) {
        Some(FieldType::List(inner)) => inner.as_ref(),
        _ => {
            return Err(PaginationError::NotAList {
                field: field.to_string(),
            });
        }
    };
    let elements = match doc.get(field) {
        None => &[][..],
        Some(value) => value.as_list().ok_or_else(|| PaginationError::NotAList {
            field: field.to_string(),
        })?,
    };

    let meta = Page::compute(request, elements.len())?;
    let items = elements[meta.range()]
        .iter()
        .map(|element| encoder.encode_element(field, element_type, element))
        .collect::<Result<Vec<_>, _>>()?;
    debug!(
        collection = %doc.collection(),
        field,
        page = meta.page,
        total_count = meta.total_count,
        "paginated list field"
    );
    Ok(PageEnvelope { items, meta })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::error::ErrorKind;
    use crate::model::{DocumentBuilder, FieldPolicy, SchemaBuilder, SchemaRegistry, Value};
    use crate::store::MemoryStore;

    fn page(page: usize, per_page: usize, total: usize) -> Page {
        Page::compute(PageRequest::new(page, per_page), total).unwrap()
    }

    #[test]
    fn test_compute_totals() {
        let p = page(3, 15, 37);
        assert_eq!((p.total_pages, p.total_count), (3, 37));
        assert_eq!(p.range().len(), 7);

        let past = page(4, 15, 37);
        assert_eq!(past.total_pages, 3);
        assert!(past.range().is_empty());

        let empty = page(1, 15, 0);
        assert_eq!(empty.total_pages, 0);
        assert!(empty.range().is_empty());
    }

    #[test]
    fn test_invalid_parameters() {
        let err = Page::compute(PageRequest::new(1, 0), 10).unwrap_err();
        assert_eq!(err, PaginationError::InvalidParameter { name: "perPage", value: 0 });
        let err = Page::compute(PageRequest::new(0, 15), 10).unwrap_err();
        assert_eq!(err, PaginationError::InvalidParameter { name: "page", value: 0 });
    }

    #[test]
    fn test_navigation() {
        let first = page(1, 10, 25);
        assert!(!first.has_prev());
        assert_eq!(first.prev_num(), None);
        assert_eq!(first.next_num(), Some(2));

        let last = page(3, 10, 25);
        assert!(last.has_prev());
        assert!(!last.has_next());
        assert_eq!(last.next_num(), None);
        assert_eq!(last.pages().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_iter_pages_gaps() {
        let p = page(10, 1, 20);
        assert_eq!(
            p.iter_pages_default(),
            vec![
                Some(1),
                Some(2),
                None,
                Some(8),
                Some(9),
                Some(10),
                Some(11),
                Some(12),
                None,
                Some(19),
                Some(20)
            ]
        );

        let short = page(1, 1, 4);
        assert_eq!(short.iter_pages_default(), vec![Some(1), Some(2), Some(3), Some(4)]);
    }

    #[test]
    fn test_request_defaults_from_params() {
        let request: PageRequest = serde_json::from_value(json!({ "page": 2 })).unwrap();
        assert_eq!(request, PageRequest::new(2, 15));
        assert_eq!(PageRequest::default(), PageRequest::page(1));
    }

    #[test]
    fn test_envelope_shape() {
        let registry: SchemaRegistry = [SchemaBuilder::document("items").int("n").build()]
            .into_iter()
            .collect();
        let store = MemoryStore::new();
        let docs = (0..3)
            .map(|n| DocumentBuilder::new("items").set("n", n).build())
            .collect::<Vec<_>>();
        let encoder = Encoder::new(&registry, &store);

        let envelope = paginate(&encoder, &docs, PageRequest::new(2, 2)).unwrap();
        assert_eq!(
            envelope.to_json().unwrap(),
            json!({
                "items": [{ "n": 2 }],
                "page": 2,
                "perPage": 2,
                "totalPages": 2,
                "totalCount": 3,
            })
        );
    }

    #[test]
    fn test_paginate_field() {
        let registry: SchemaRegistry = [SchemaBuilder::document("posts")
            .string("title")
            .list("comments", FieldType::String)
            .build()]
        .into_iter()
        .collect();
        let store = MemoryStore::new();
        let comments = (0..5).map(|i| Value::from(format!("c{}", i))).collect::<Vec<_>>();
        let post = DocumentBuilder::new("posts").set("comments", comments).build();
        let encoder = Encoder::new(&registry, &store);

        let envelope = paginate_field(&encoder, &post, "comments", PageRequest::new(2, 2)).unwrap();
        assert_eq!(envelope.items, vec![json!("c2"), json!("c3")]);
        assert_eq!(envelope.meta.total_count, 5);

        let err = paginate_field(&encoder, &post, "title", PageRequest::default()).unwrap_err();
        assert!(matches!(err, PaginationError::NotAList { .. }));
    }

    #[test]
    fn test_paginate_field_respects_encode_policy() {
        let registry: SchemaRegistry = [SchemaBuilder::document("users")
            .string("name")
            .typed_with("tokens", FieldType::list(FieldType::String), FieldPolicy::exclude_encode())
            .typed_with("recovery", FieldType::list(FieldType::String), FieldPolicy::exclude_both())
            .build()]
        .into_iter()
        .collect();
        let store = MemoryStore::new();
        let user = DocumentBuilder::new("users")
            .set("name", "ada")
            .set("tokens", vec![Value::from("secret")])
            .set("recovery", vec![Value::from("backup")])
            .build();
        let encoder = Encoder::new(&registry, &store);

        let node = encoder.encode(&user).unwrap();
        assert!(!node.contains_key("tokens"));

        for field in ["tokens", "recovery"] {
            let err = paginate_field(&encoder, &user, field, PageRequest::default()).unwrap_err();
            assert_eq!(err, PaginationError::ExcludedField { field: field.to_string() });
            assert_eq!(err.kind(), ErrorKind::SchemaMismatch);
        }
    }
}
