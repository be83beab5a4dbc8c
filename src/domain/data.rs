//! Vendor-agnostic data model
//!
//! Exporters translate vendor payloads into a [`DataPage`]; importers
//! translate a page back into vendor calls.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The data vertical a job moves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataVertical {
    Photos,
    Videos,
    Media,
    Contacts,
    Calendar,
    Mail,
    Tasks,
}

impl DataVertical {
    /// All verticals, in display order
    pub const ALL: [DataVertical; 7] = [
        Self::Photos,
        Self::Videos,
        Self::Media,
        Self::Contacts,
        Self::Calendar,
        Self::Mail,
        Self::Tasks,
    ];

    /// Lowercase name used in config files and the job store
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Photos => "photos",
            Self::Videos => "videos",
            Self::Media => "media",
            Self::Contacts => "contacts",
            Self::Calendar => "calendar",
            Self::Mail => "mail",
            Self::Tasks => "tasks",
        }
    }
}

impl fmt::Display for DataVertical {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataVertical {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|v| v.as_str() == lowered)
            .ok_or_else(|| {
                format!(
                    "Unknown data type '{s}'. Must be one of: {}",
                    Self::ALL.map(|v| v.as_str()).join(", ")
                )
            })
    }
}

/// Kind of item counted in job aggregates
pub type ItemKind = String;

/// A container to create at the destination before its items (album, folder)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestinationContainer {
    /// Source-side id; also the idempotent id of the creation
    pub id: String,

    /// Human-readable name
    pub name: String,

    /// Optional description carried over from the source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl DestinationContainer {
    /// Creates a new container
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
        }
    }
}

/// One exported item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataItem {
    /// Stable source id; used as the idempotent id on import
    pub id: String,

    /// Display title used in error reports
    pub title: String,

    /// Kind counted in job aggregates (e.g. "photos", "contacts")
    pub kind: ItemKind,

    /// Destination container this item belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_id: Option<String>,

    /// Size of the item content in bytes, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,

    /// Vendor-agnostic payload
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl DataItem {
    /// Creates a new item with an empty payload
    pub fn new(id: impl Into<String>, title: impl Into<String>, kind: impl Into<ItemKind>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            kind: kind.into(),
            container_id: None,
            size_bytes: None,
            payload: serde_json::Value::Null,
        }
    }

    /// Sets the destination container
    pub fn in_container(mut self, container_id: impl Into<String>) -> Self {
        self.container_id = Some(container_id.into());
        self
    }

    /// Sets the content size
    pub fn with_size(mut self, size_bytes: u64) -> Self {
        self.size_bytes = Some(size_bytes);
        self
    }

    /// Sets the payload
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

/// A page of exported data
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataPage {
    /// Containers to create before the items
    #[serde(default)]
    pub containers: Vec<DestinationContainer>,

    /// Items in this page
    #[serde(default)]
    pub items: Vec<DataItem>,
}

impl DataPage {
    /// Creates a page from items only
    pub fn from_items(items: Vec<DataItem>) -> Self {
        Self {
            containers: Vec::new(),
            items,
        }
    }

    /// Adds a container
    pub fn with_container(mut self, container: DestinationContainer) -> Self {
        self.containers.push(container);
        self
    }

    /// Returns true when the page carries neither containers nor items
    pub fn is_empty(&self) -> bool {
        self.containers.is_empty() && self.items.is_empty()
    }

    /// Number of items in the page
    pub fn len(&self) -> usize {
        self.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_vertical_parse() {
        assert_eq!(DataVertical::from_str("Photos").unwrap(), DataVertical::Photos);
        assert_eq!(DataVertical::from_str("contacts").unwrap(), DataVertical::Contacts);
        let err = DataVertical::from_str("music").unwrap_err();
        assert!(err.contains("photos"));
    }

    #[test]
    fn test_data_vertical_serde() {
        let json = serde_json::to_string(&DataVertical::Calendar).unwrap();
        assert_eq!(json, "\"calendar\"");
    }

    #[test]
    fn test_data_page_empty() {
        assert!(DataPage::default().is_empty());
        let page = DataPage::default().with_container(DestinationContainer::new("a1", "Trip"));
        assert!(!page.is_empty());
        assert_eq!(page.len(), 0);
    }

    #[test]
    fn test_data_item_builder() {
        let item = DataItem::new("p1", "beach.jpg", "photos")
            .in_container("a1")
            .with_size(2048);
        assert_eq!(item.container_id.as_deref(), Some("a1"));
        assert_eq!(item.size_bytes, Some(2048));
    }
}
