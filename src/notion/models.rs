//! Wire types for the Notion API.
//!
//! Only the slices of the API this tool touches are modeled: pages with typed
//! properties, database queries with cursor pagination, and block children
//! for child-database discovery. Responses carry extra keys (`object`,
//! per-property `id`s, colors) that serde ignores.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::notion::property::PropertyValue;

/// One rich-text block. Requests only ever send the `text` payload; responses
/// additionally carry `plain_text`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RichText {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<TextContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plain_text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextContent {
    pub content: String,
}

impl RichText {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            kind: "text".into(),
            text: Some(TextContent {
                content: content.into(),
            }),
            plain_text: None,
        }
    }

    /// The readable content, preferring the response-side `plain_text`.
    pub fn plain(&self) -> Option<&str> {
        self.plain_text
            .as_deref()
            .or_else(|| self.text.as_ref().map(|t| t.content.as_str()))
    }
}

/// A select/status/multi-select option, matched by name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SelectOption {
    pub name: String,
}

impl SelectOption {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A reference to a related page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelationRef {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExternalFile {
    pub url: String,
}

/// An externally hosted file attachment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileRef {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external: Option<ExternalFile>,
}

impl FileRef {
    pub fn external(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            kind: "external".into(),
            name: Some(name.into()),
            external: Some(ExternalFile { url: url.into() }),
        }
    }
}

/// A date property payload. `end` is kept even when null, matching what the
/// destination stores for point-in-time dates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DateValue {
    pub start: String,
    pub end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

/// A page icon; only external image icons are used.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Icon {
    #[serde(rename = "type")]
    pub kind: String,
    pub external: ExternalFile,
}

impl Icon {
    pub fn external(url: impl Into<String>) -> Self {
        Self {
            kind: "external".into(),
            external: ExternalFile { url: url.into() },
        }
    }
}

/// Parent pointer for a created page.
#[derive(Debug, Clone, Serialize)]
pub struct Parent {
    #[serde(rename = "type")]
    pub kind: String,
    pub database_id: String,
}

impl Parent {
    pub fn database(id: impl Into<String>) -> Self {
        Self {
            kind: "database_id".into(),
            database_id: id.into(),
        }
    }
}

/// A page as returned by queries. Properties stay as raw JSON so unknown
/// property kinds in the destination schema never break a fetch; callers
/// decode the fields they care about through [`Page::property`].
#[derive(Debug, Clone, Deserialize)]
pub struct Page {
    pub id: String,
    #[serde(default)]
    pub properties: BTreeMap<String, serde_json::Value>,
}

impl Page {
    /// Decodes one property into the typed representation. Unknown or
    /// malformed kinds come back as `None` rather than an error.
    pub fn property(&self, name: &str) -> Option<PropertyValue> {
        let raw = self.properties.get(name)?;
        serde_json::from_value(raw.clone()).ok()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatePageRequest {
    pub parent: Parent,
    pub properties: BTreeMap<String, PropertyValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<Icon>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdatePageRequest {
    pub properties: BTreeMap<String, PropertyValue>,
}

/// Exact-match filter on a database's title property.
#[derive(Debug, Clone, Serialize)]
pub struct TitleEqualsFilter {
    pub property: String,
    pub title: EqualsClause,
}

#[derive(Debug, Clone, Serialize)]
pub struct EqualsClause {
    pub equals: String,
}

impl TitleEqualsFilter {
    pub fn new(property: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            title: EqualsClause {
                equals: value.into(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct QueryDatabaseRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<TitleEqualsFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_cursor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryDatabaseResponse {
    pub results: Vec<Page>,
    #[serde(default)]
    pub next_cursor: Option<String>,
    #[serde(default)]
    pub has_more: bool,
}

/// A child block of a page, as listed by the block-children endpoint. Only
/// `child_database` blocks matter here; everything else is walked through.
#[derive(Debug, Clone, Deserialize)]
pub struct Block {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub has_children: bool,
    #[serde(default)]
    pub child_database: Option<ChildDatabase>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChildDatabase {
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockChildrenResponse {
    pub results: Vec<Block>,
    #[serde(default)]
    pub next_cursor: Option<String>,
    #[serde(default)]
    pub has_more: bool,
}

/// Minimal creation response; only the new page id is consumed.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedPage {
    pub id: String,
}
