//! Page-level results exchanged between adapters and the copier

use super::data::{DataPage, ItemKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Item counts by kind
pub type ItemCounts = BTreeMap<ItemKind, u64>;

/// Adds `other` into `counts` key-wise
pub fn merge_counts(counts: &mut ItemCounts, other: &ItemCounts) {
    for (kind, count) in other {
        *counts.entry(kind.clone()).or_insert(0) += count;
    }
}

/// Opaque pagination cursor
///
/// Vendors paginate with string tokens, numeric offsets or structured
/// markers; the copier never looks inside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ContinuationToken {
    Token(String),
    Offset(u64),
    Structured(serde_json::Value),
}

impl ContinuationToken {
    /// String token shorthand
    pub fn token(value: impl Into<String>) -> Self {
        Self::Token(value.into())
    }
}

impl fmt::Display for ContinuationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token(token) => f.write_str(token),
            Self::Offset(offset) => write!(f, "@{offset}"),
            Self::Structured(value) => write!(f, "{value}"),
        }
    }
}

/// A sub-unit discovered during export that needs its own pagination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerResource {
    /// Source-side container id
    pub id: String,

    /// Display name, when the vendor provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ContainerResource {
    /// Creates a container resource
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }

    /// Sets the display name
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Pagination state returned by an export
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContinuationData {
    /// Next page of the container just exported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page: Option<ContinuationToken>,

    /// Newly discovered containers to traverse later
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub containers: Vec<ContainerResource>,
}

impl ContinuationData {
    /// Continuation with only a next-page token
    pub fn next(token: ContinuationToken) -> Self {
        Self {
            next_page: Some(token),
            containers: Vec::new(),
        }
    }

    /// Adds a discovered container
    pub fn with_container(mut self, container: ContainerResource) -> Self {
        self.containers.push(container);
        self
    }

    /// True when there is nothing left to follow
    pub fn is_exhausted(&self) -> bool {
        self.next_page.is_none() && self.containers.is_empty()
    }
}

/// Cursor for one export call: which container, from which page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportInformation {
    /// Page to resume from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<ContinuationToken>,

    /// Container to export; `None` means the top-level listing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<ContainerResource>,
}

impl ExportInformation {
    /// Cursor for the first page of a container
    pub fn for_container(container: ContainerResource) -> Self {
        Self {
            page: None,
            container: Some(container),
        }
    }

    /// Same container, another page
    pub fn with_page(mut self, page: ContinuationToken) -> Self {
        self.page = Some(page);
        self
    }

    /// `<container|root>:<page|first>`, unique per cursor within a job
    pub fn label(&self) -> String {
        let container = self.container.as_ref().map_or("root", |c| c.id.as_str());
        match &self.page {
            Some(page) => format!("{container}:{page}"),
            None => format!("{container}:first"),
        }
    }
}

/// Outcome kind of an export call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportResultType {
    Continue,
    End,
    Error,
}

/// Result of exporting one page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportResult {
    /// Continue, end or error
    pub result_type: ExportResultType,

    /// Exported data, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<DataPage>,

    /// Where to go next
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continuation: Option<ContinuationData>,

    /// Error cause for [`ExportResultType::Error`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExportResult {
    /// More pages or containers follow
    pub fn continuing(data: Option<DataPage>, continuation: ContinuationData) -> Self {
        Self {
            result_type: ExportResultType::Continue,
            data,
            continuation: Some(continuation),
            error: None,
        }
    }

    /// Last page of this cursor
    pub fn end(data: Option<DataPage>) -> Self {
        Self {
            result_type: ExportResultType::End,
            data,
            continuation: None,
            error: None,
        }
    }

    /// The export failed; no further pages for this call
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            result_type: ExportResultType::Error,
            data: None,
            continuation: None,
            error: Some(message.into()),
        }
    }

    /// Attaches continuation data to an `End` result
    ///
    /// Containers discovered on the last page of a listing still need to
    /// be traversed.
    pub fn with_continuation(mut self, continuation: ContinuationData) -> Self {
        self.continuation = Some(continuation);
        self
    }

    /// Data to import, skipping empty pages
    pub fn data_to_import(&self) -> Option<&DataPage> {
        self.data.as_ref().filter(|page| !page.is_empty())
    }

    /// Continuation to follow, if any
    ///
    /// `Continue` without a token and without containers is an implicit
    /// end. An `End` result may still carry discovered containers but never
    /// a next page.
    pub fn next_work(&self) -> Option<ContinuationData> {
        match self.result_type {
            ExportResultType::Error => None,
            ExportResultType::Continue => self
                .continuation
                .clone()
                .filter(|c| !c.is_exhausted()),
            ExportResultType::End => self
                .continuation
                .as_ref()
                .filter(|c| !c.containers.is_empty())
                .map(|c| ContinuationData {
                    next_page: None,
                    containers: c.containers.clone(),
                }),
        }
    }
}

/// Outcome kind of an import call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportResultType {
    Ok,
    Error,
}

/// Result of importing one page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportResult {
    /// Ok or error
    pub result_type: ImportResultType,

    /// Items written, by kind
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counts: Option<ItemCounts>,

    /// Bytes written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes: Option<u64>,

    /// Error cause for [`ImportResultType::Error`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ImportResult {
    /// Successful import with no counts
    pub fn ok() -> Self {
        Self {
            result_type: ImportResultType::Ok,
            counts: None,
            bytes: None,
            error: None,
        }
    }

    /// Failed import
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            result_type: ImportResultType::Error,
            counts: None,
            bytes: None,
            error: Some(message.into()),
        }
    }

    /// Sets item counts
    pub fn with_counts(mut self, counts: ItemCounts) -> Self {
        self.counts = Some(counts);
        self
    }

    /// Sets bytes
    pub fn with_bytes(mut self, bytes: u64) -> Self {
        self.bytes = Some(bytes);
        self
    }

    /// True for `Ok`
    pub fn is_ok(&self) -> bool {
        self.result_type == ImportResultType::Ok
    }

    /// Combines two results from parts of the same page
    ///
    /// An error on either side wins. Counts merge key-wise and bytes add.
    pub fn merge(self, other: ImportResult) -> ImportResult {
        if !self.is_ok() {
            return self;
        }
        if !other.is_ok() {
            return other;
        }

        let counts = match (self.counts, other.counts) {
            (None, None) => None,
            (Some(a), None) | (None, Some(a)) => Some(a),
            (Some(mut a), Some(b)) => {
                merge_counts(&mut a, &b);
                Some(a)
            }
        };
        let bytes = match (self.bytes, other.bytes) {
            (None, None) => None,
            (a, b) => Some(a.unwrap_or(0) + b.unwrap_or(0)),
        };

        ImportResult {
            result_type: ImportResultType::Ok,
            counts,
            bytes,
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_labels_differ_per_page() {
        let root = ExportInformation::default();
        assert_eq!(root.label(), "root:first");
        assert_eq!(root.clone().with_page(ContinuationToken::token("T1")).label(), "root:T1");

        let album = ExportInformation::for_container(ContainerResource::new("a1"));
        assert_eq!(album.label(), "a1:first");
        assert_eq!(album.with_page(ContinuationToken::Offset(50)).label(), "a1:@50");
    }
    use crate::domain::data::DataItem;

    fn counts(kind: &str, n: u64) -> ItemCounts {
        ItemCounts::from([(kind.to_string(), n)])
    }

    #[test]
    fn test_continue_without_token_is_end() {
        let result = ExportResult::continuing(None, ContinuationData::default());
        assert!(result.next_work().is_none());
    }

    #[test]
    fn test_continue_with_token() {
        let result = ExportResult::continuing(
            None,
            ContinuationData::next(ContinuationToken::token("abc")),
        );
        let next = result.next_work().unwrap();
        assert_eq!(next.next_page, Some(ContinuationToken::token("abc")));
    }

    #[test]
    fn test_end_keeps_discovered_containers_but_not_page() {
        let result = ExportResult::end(None).with_continuation(
            ContinuationData::next(ContinuationToken::Offset(10))
                .with_container(ContainerResource::new("album-1")),
        );
        let next = result.next_work().unwrap();
        assert!(next.next_page.is_none());
        assert_eq!(next.containers.len(), 1);
    }

    #[test]
    fn test_error_has_no_next_work() {
        assert!(ExportResult::error("boom").next_work().is_none());
    }

    #[test]
    fn test_data_to_import_skips_empty_pages() {
        assert!(ExportResult::end(Some(DataPage::default()))
            .data_to_import()
            .is_none());
        let page = DataPage::from_items(vec![DataItem::new("c1", "Ada", "contacts")]);
        assert!(ExportResult::end(Some(page)).data_to_import().is_some());
    }

    #[test]
    fn test_import_result_merge() {
        let merged = ImportResult::ok()
            .with_counts(counts("photos", 3))
            .with_bytes(100)
            .merge(ImportResult::ok().with_counts(counts("photos", 2)).with_bytes(250));
        assert_eq!(merged.counts, Some(counts("photos", 5)));
        assert_eq!(merged.bytes, Some(350));
    }

    #[test]
    fn test_import_result_merge_error_wins() {
        let merged = ImportResult::ok()
            .with_counts(counts("photos", 3))
            .merge(ImportResult::error("quota"));
        assert!(!merged.is_ok());
        assert_eq!(merged.error.as_deref(), Some("quota"));
    }

    #[test]
    fn test_continuation_token_serde() {
        let json = serde_json::to_string(&ContinuationToken::Offset(42)).unwrap();
        assert_eq!(json, r#"{"type":"offset","value":42}"#);
        let back: ContinuationToken = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ContinuationToken::Offset(42));
    }
}
