//! Data model for feed items and extracted records

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One unit from a reverse-chronological message feed.
///
/// Immutable once fetched; the timestamp is feed-assigned and never
/// recomputed locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    /// Feed-native publication time (seconds precision)
    pub date: DateTime<Utc>,
    /// Raw message body, possibly empty
    pub body: String,
}

impl FeedItem {
    pub fn new(date: DateTime<Utc>, body: impl Into<String>) -> Self {
        Self {
            date,
            body: body.into(),
        }
    }

    /// Build an item from a unix timestamp in seconds.
    pub fn from_unix(secs: i64, body: impl Into<String>) -> Self {
        Self {
            date: DateTime::from_timestamp(secs, 0).unwrap_or_else(Utc::now),
            body: body.into(),
        }
    }

    /// Calendar day of the item, truncated in UTC.
    pub fn day(&self) -> NaiveDate {
        self.date.date_naive()
    }
}

/// A single text entry inside a batched digest record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextEntry {
    pub text: String,
}

/// A structured unit extracted from a feed item body.
///
/// This is the typed union the orchestrator stores: either plain text
/// (passthrough), a day-level digest batching many plain texts, or a parsed
/// wire report. Keeping the shape closed means the storage path never has to
/// walk an arbitrary nested structure looking for strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Record {
    /// Structured wire report with metadata and named sections
    Report(Report),
    /// One batched record for a whole day of passthrough bodies
    Digest { data: Vec<TextEntry> },
    /// A single raw body kept as-is
    Text { text: String },
}

impl Record {
    /// Wrap a raw body as a passthrough record.
    pub fn text(body: impl Into<String>) -> Self {
        Record::Text { text: body.into() }
    }

    /// Batch plain texts into one digest record.
    pub fn digest(texts: impl IntoIterator<Item = String>) -> Self {
        Record::Digest {
            data: texts.into_iter().map(|text| TextEntry { text }).collect(),
        }
    }

    /// Canonical JSON text used for hashing and storage.
    ///
    /// Map fields are `BTreeMap`s, so equal records always serialize to
    /// byte-identical text regardless of construction order.
    pub fn canonical_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// A parsed wire report: free-text metadata header plus named subsections.
///
/// Unknown fields are rejected so the untagged [`Record`] union stays
/// unambiguous: a digest body must never match this variant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Report {
    /// `key: value` lines from the metadata section
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// Named subsections from the data section
    #[serde(default)]
    pub sections: BTreeMap<String, Section>,
}

/// Entries of one named subsection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Classified lines in original order
    pub entries: Vec<Entry>,
    /// Rollup of analyst comment texts, present only on the analyst-comments
    /// subsection
    #[serde(
        rename = "analystComments",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub analyst_comments: Vec<String>,
}

/// One classified line of a subsection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Entry {
    /// Plain content line
    #[serde(rename = "content")]
    Content(String),
    /// `AC:`-marked analyst comment (continuation lines merged)
    #[serde(rename = "analystComment")]
    AnalystComment(String),
}

/// Row shape persisted by the content store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEntry {
    /// Content hash, primary key and deduplication boundary
    pub hash: String,
    /// Record serialized to canonical text
    pub data: String,
    /// The backfill query date, not an item-intrinsic timestamp
    pub date: DateTime<Utc>,
}
