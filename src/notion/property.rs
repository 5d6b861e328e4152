//! Property codec: plain field values in, typed Notion properties out, and
//! back again when reading existing pages during reconciliation.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar::shanghai;
use crate::notion::models::{DateValue, FileRef, RelationRef, RichText, SelectOption};

/// Notion caps rich text at 2000 characters per block; stay well under it.
/// https://developers.notion.com/reference/request-limits
pub const MAX_TEXT_LENGTH: usize = 1024;

const TIMEZONE_NAME: &str = "Asia/Shanghai";

/// The closed set of property kinds the destination schema uses. Drives the
/// codec's dispatch in both directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Title,
    RichText,
    Url,
    Relation,
    Number,
    Date,
    Files,
    Status,
    Select,
    MultiSelect,
}

/// A plain, destination-agnostic field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    /// Unix timestamp, seconds.
    Timestamp(i64),
    /// Option names for multi-selects.
    Strings(Vec<String>),
    /// Already-resolved page ids for relations.
    RelationIds(Vec<String>),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.is_empty() {
            None
        } else {
            Some(Self::Text(value))
        }
    }
}

/// A typed property value in the destination's wire shape, e.g.
/// `{"type":"select","select":{"name":"看过"}}`. One variant per kind, so the
/// codec's dispatch is exhaustive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PropertyValue {
    Title {
        title: Vec<RichText>,
    },
    RichText {
        rich_text: Vec<RichText>,
    },
    Number {
        number: Option<f64>,
    },
    Url {
        url: Option<String>,
    },
    Select {
        select: Option<SelectOption>,
    },
    MultiSelect {
        multi_select: Vec<SelectOption>,
    },
    Status {
        status: Option<SelectOption>,
    },
    Relation {
        relation: Vec<RelationRef>,
    },
    Date {
        date: Option<DateValue>,
    },
    Files {
        files: Vec<FileRef>,
    },
}

/// Field name → value mapping fed to [`encode`]. `None` marks an absent
/// value, which must not overwrite whatever the destination already holds.
pub type FieldMap = BTreeMap<String, Option<FieldValue>>;

/// Field name → declared kind for one destination table.
pub type Schema = HashMap<&'static str, PropertyKind>;

fn clip(text: &str) -> String {
    text.chars().take(MAX_TEXT_LENGTH).collect()
}

fn render_timestamp(ts: i64) -> Option<String> {
    let utc = Utc.timestamp_opt(ts, 0).single()?;
    Some(
        utc.with_timezone(&shanghai())
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
    )
}

/// Renders a local (UTC+8) datetime for a date property payload.
pub fn render_local(datetime: &NaiveDateTime) -> String {
    datetime.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Builds a date payload carrying the fixed destination timezone.
pub fn date_payload(start: String, end: Option<String>) -> DateValue {
    DateValue {
        start,
        end,
        time_zone: Some(TIMEZONE_NAME.into()),
    }
}

/// Encodes present fields into typed properties per the declared schema.
/// Absent values, fields missing from the schema, and kind/value mismatches
/// are all skipped rather than failed.
pub fn encode(fields: &FieldMap, schema: &Schema) -> BTreeMap<String, PropertyValue> {
    let mut properties = BTreeMap::new();
    for (name, value) in fields {
        let Some(value) = value else { continue };
        let Some(kind) = schema.get(name.as_str()) else {
            continue;
        };
        if let Some(property) = encode_one(*kind, value) {
            properties.insert(name.clone(), property);
        }
    }
    properties
}

fn encode_one(kind: PropertyKind, value: &FieldValue) -> Option<PropertyValue> {
    match (kind, value) {
        (PropertyKind::Title, FieldValue::Text(text)) => Some(PropertyValue::Title {
            title: vec![RichText::text(clip(text))],
        }),
        (PropertyKind::RichText, FieldValue::Text(text)) => Some(PropertyValue::RichText {
            rich_text: vec![RichText::text(clip(text))],
        }),
        (PropertyKind::Number, FieldValue::Number(n)) => Some(PropertyValue::Number {
            number: Some(*n),
        }),
        (PropertyKind::Url, FieldValue::Text(url)) => Some(PropertyValue::Url {
            url: Some(url.clone()),
        }),
        (PropertyKind::Select, FieldValue::Text(name)) => Some(PropertyValue::Select {
            select: Some(SelectOption::new(name.clone())),
        }),
        (PropertyKind::Status, FieldValue::Text(name)) => Some(PropertyValue::Status {
            status: Some(SelectOption::new(name.clone())),
        }),
        (PropertyKind::MultiSelect, FieldValue::Strings(names)) => {
            Some(PropertyValue::MultiSelect {
                multi_select: names.iter().cloned().map(SelectOption::new).collect(),
            })
        }
        (PropertyKind::Relation, FieldValue::RelationIds(ids)) => Some(PropertyValue::Relation {
            relation: ids.iter().cloned().map(|id| RelationRef { id }).collect(),
        }),
        (PropertyKind::Files, FieldValue::Text(url)) => Some(PropertyValue::Files {
            files: vec![FileRef::external("Cover", url.clone())],
        }),
        (PropertyKind::Date, FieldValue::Timestamp(ts)) => {
            let start = render_timestamp(*ts)?;
            Some(PropertyValue::Date {
                date: Some(date_payload(start, None)),
            })
        }
        _ => None,
    }
}

/// Extracts the plain value back out of a typed property. Null or empty
/// properties come back as `None`, never as an error.
pub fn decode(property: &PropertyValue) -> Option<FieldValue> {
    match property {
        PropertyValue::Title { title } => first_text(title),
        PropertyValue::RichText { rich_text } => first_text(rich_text),
        PropertyValue::Number { number } => number.map(FieldValue::Number),
        PropertyValue::Url { url } => url.clone().and_then(FieldValue::text),
        PropertyValue::Select { select } => {
            select.as_ref().and_then(|o| FieldValue::text(o.name.as_str()))
        }
        PropertyValue::Status { status } => {
            status.as_ref().and_then(|o| FieldValue::text(o.name.as_str()))
        }
        PropertyValue::MultiSelect { multi_select } => Some(FieldValue::Strings(
            multi_select.iter().map(|o| o.name.clone()).collect(),
        )),
        PropertyValue::Relation { relation } => Some(FieldValue::RelationIds(
            relation.iter().map(|r| r.id.clone()).collect(),
        )),
        PropertyValue::Files { files } => files
            .first()
            .and_then(|f| f.external.as_ref())
            .and_then(|e| FieldValue::text(e.url.as_str())),
        PropertyValue::Date { date } => {
            let start = date.as_ref()?.start.as_str();
            parse_timestamp(start).map(FieldValue::Timestamp)
        }
    }
}

fn first_text(blocks: &[RichText]) -> Option<FieldValue> {
    blocks.first().and_then(|b| b.plain()).and_then(FieldValue::text)
}

/// Parses a stored date string back to a Unix timestamp. Accepts RFC 3339
/// (what Notion returns) and the naive local forms this codec writes.
fn parse_timestamp(text: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.timestamp());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        return shanghai()
            .from_local_datetime(&naive)
            .single()
            .map(|dt| dt.timestamp());
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        let naive = date.and_hms_opt(0, 0, 0)?;
        return shanghai()
            .from_local_datetime(&naive)
            .single()
            .map(|dt| dt.timestamp());
    }
    None
}
