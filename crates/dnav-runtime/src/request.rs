//! Extraction request parsing and validation.
//!
//! Two request shapes are in circulation and differ only in field names:
//! `{name, pageCount, pages: [{page, text}]}` and
//! `{fileName, numPages, pages: [{pageNumber, text}]}`. Both deserialize into
//! [`ExtractRequest`] and validate into one [`Document`].

use std::collections::BTreeSet;

use serde::Deserialize;

use dnav_core::{Document, Error, ExtractionMode, PageText, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractRequest {
    #[serde(alias = "fileName")]
    pub name: String,
    #[serde(default, alias = "numPages")]
    pub page_count: Option<u32>,
    pub pages: Vec<RequestPage>,
    #[serde(default)]
    pub mode: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RequestPage {
    #[serde(alias = "pageNumber")]
    pub page: i64,
    pub text: String,
}

/// A request that passed validation.
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    pub document: Document,
    pub mode: Option<ExtractionMode>,
}

impl ExtractRequest {
    /// Parse a JSON body; any structural problem is a validation error.
    pub fn from_json(body: &str) -> Result<Self> {
        serde_json::from_str(body).map_err(|e| Error::Validation(e.to_string()))
    }

    /// Check the request and build the internal document, pages sorted by
    /// page number. A page count below the highest page number is raised to it.
    pub fn validate(self) -> Result<ValidatedRequest> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(Error::Validation("document name is required".into()));
        }
        if self.pages.is_empty() {
            return Err(Error::Validation("pages must not be empty".into()));
        }

        let mut seen = BTreeSet::new();
        let mut pages = Vec::with_capacity(self.pages.len());
        for p in self.pages {
            let page = u32::try_from(p.page)
                .ok()
                .filter(|n| *n >= 1)
                .ok_or_else(|| {
                    Error::Validation(format!("page numbers must be positive, got {}", p.page))
                })?;
            if !seen.insert(page) {
                return Err(Error::Validation(format!("duplicate page {page}")));
            }
            pages.push(PageText { page, text: p.text });
        }
        pages.sort_by_key(|p| p.page);

        let highest = pages.last().map_or(0, |p| p.page);
        let page_count = self.page_count.unwrap_or(highest).max(highest);

        let mode = match self.mode.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(m) => Some(
                m.parse::<ExtractionMode>()
                    .map_err(|e| Error::Validation(e.to_string()))?,
            ),
        };

        Ok(ValidatedRequest {
            document: Document::new(name, page_count, pages),
            mode,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_shape() {
        let req = ExtractRequest::from_json(
            r#"{"name":"q4.pdf","pageCount":3,"pages":[{"page":2,"text":"b"},{"page":1,"text":"a"}],"mode":"refine"}"#,
        )
        .unwrap()
        .validate()
        .unwrap();
        assert_eq!(req.document.name, "q4.pdf");
        assert_eq!(req.document.page_count, 3);
        assert_eq!(req.document.pages[0].page, 1);
        assert_eq!(req.mode, Some(ExtractionMode::Refine));
    }

    #[test]
    fn test_legacy_shape() {
        let req = ExtractRequest::from_json(
            r#"{"fileName":"memo.pdf","numPages":1,"pages":[{"pageNumber":1,"text":"We will hire."}]}"#,
        )
        .unwrap()
        .validate()
        .unwrap();
        assert_eq!(req.document.name, "memo.pdf");
        assert_eq!(req.document.page_text(1), Some("We will hire."));
        assert!(req.mode.is_none());
    }

    #[test]
    fn test_missing_fields_rejected() {
        assert!(matches!(
            ExtractRequest::from_json(r#"{"pages":[]}"#),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            ExtractRequest::from_json(r#"{"name":"x.pdf","pages":[{"page":1}]}"#),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let bad = |body: &str| {
            ExtractRequest::from_json(body)
                .and_then(ExtractRequest::validate)
                .is_err()
        };
        assert!(bad(r#"{"name":"  ","pages":[{"page":1,"text":"a"}]}"#));
        assert!(bad(r#"{"name":"x","pages":[]}"#));
        assert!(bad(r#"{"name":"x","pages":[{"page":0,"text":"a"}]}"#));
        assert!(bad(r#"{"name":"x","pages":[{"page":1,"text":"a"},{"page":1,"text":"b"}]}"#));
        assert!(bad(r#"{"name":"x","pages":[{"page":1,"text":"a"}],"mode":"magic"}"#));
    }

    #[test]
    fn test_page_count_defaults_to_highest_page() {
        let req = ExtractRequest::from_json(r#"{"name":"x","pageCount":1,"pages":[{"page":4,"text":"a"}]}"#)
            .unwrap()
            .validate()
            .unwrap();
        assert_eq!(req.document.page_count, 4);
    }
}
