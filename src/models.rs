//! Core data models for Stockfind
//!
//! A provider returns raw [`SymbolRecord`]s. These are normalized into
//! [`DirectoryEntry`] values and collected into an immutable [`Directory`]
//! snapshot, which is replaced wholesale on every successful retrieval.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// One searchable symbol: ticker plus company name
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct DirectoryEntry {
    /// Ticker symbol, unique within a directory snapshot
    pub symbol: String,
    /// Human-readable company or instrument name
    pub name: String,
}

impl DirectoryEntry {
    pub fn new(symbol: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            name: name.into(),
        }
    }
}

/// Raw record as returned by the symbol provider
///
/// Only `symbol` is required. The remaining fields are carried for
/// diagnostics and are dropped during normalization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SymbolRecord {
    pub symbol: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    #[serde(default, rename = "displaySymbol", skip_serializing_if = "Option::is_none")]
    pub display_symbol: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub figi: Option<String>,
}

impl SymbolRecord {
    pub fn new(symbol: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            description: description.into(),
            display_symbol: None,
            kind: None,
            currency: None,
            mic: None,
            figi: None,
        }
    }

    /// Extract records from a provider response body
    ///
    /// The body must be a JSON array. Elements that are not objects, or whose
    /// `symbol` is missing, empty, or not a string, are skipped. Returns the
    /// parsed records together with the number of skipped elements.
    pub fn parse_list(body: serde_json::Value) -> anyhow::Result<(Vec<SymbolRecord>, usize)> {
        let items = match body {
            serde_json::Value::Array(items) => items,
            other => anyhow::bail!(
                "Expected a JSON array of symbol records, got {}",
                json_kind(&other)
            ),
        };

        let mut records = Vec::with_capacity(items.len());
        let mut skipped = 0;

        for item in items {
            match serde_json::from_value::<SymbolRecord>(item) {
                Ok(record) if !record.symbol.trim().is_empty() => records.push(record),
                Ok(_) => skipped += 1,
                Err(e) => {
                    log::trace!("Skipping malformed symbol record: {}", e);
                    skipped += 1;
                }
            }
        }

        Ok((records, skipped))
    }
}

/// Providers send `"description": null` for some instruments
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

impl From<SymbolRecord> for DirectoryEntry {
    fn from(record: SymbolRecord) -> Self {
        Self {
            symbol: record.symbol,
            name: record.description,
        }
    }
}

/// Immutable snapshot of every known symbol, in provider order
///
/// Symbols are unique. When the provider repeats a symbol the last record
/// wins, but it keeps the position of the first occurrence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Directory {
    entries: Vec<DirectoryEntry>,
    /// When this snapshot was produced (None for the empty startup directory)
    pub fetched_at: Option<DateTime<Utc>>,
}

impl Directory {
    /// The empty directory the pipeline starts with
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            fetched_at: None,
        }
    }

    /// Build a snapshot from raw provider records
    pub fn from_records(records: Vec<SymbolRecord>) -> Self {
        Self::from_entries(records.into_iter().map(DirectoryEntry::from))
    }

    /// Build a snapshot from already-normalized entries, applying the dedup policy
    pub fn from_entries(entries: impl IntoIterator<Item = DirectoryEntry>) -> Self {
        let mut deduped: Vec<DirectoryEntry> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();

        for entry in entries {
            match positions.get(&entry.symbol) {
                Some(&pos) => {
                    log::debug!("Duplicate symbol {} in directory, keeping last record", entry.symbol);
                    deduped[pos] = entry;
                }
                None => {
                    positions.insert(entry.symbol.clone(), deduped.len());
                    deduped.push(entry);
                }
            }
        }

        Self {
            entries: deduped,
            fetched_at: Some(Utc::now()),
        }
    }

    pub fn entries(&self) -> &[DirectoryEntry] {
        &self.entries
    }

    pub fn get(&self, idx: usize) -> Option<&DirectoryEntry> {
        self.entries.get(idx)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for Directory {
    fn default() -> Self {
        Self::empty()
    }
}

/// Loading and error state of the directory retrieval
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetrievalStatus {
    pub loading: bool,
    pub error: Option<String>,
}

/// Consistent read-only view of the pipeline, published on every transition
#[derive(Debug, Clone)]
pub struct PipelineView {
    /// Ranked matches for the current debounced query
    pub results: Arc<[DirectoryEntry]>,
    /// Whether a directory retrieval is outstanding
    pub loading: bool,
    /// Message from the most recent failed retrieval
    pub error: Option<String>,
    /// Query value the current results were computed for
    pub debounced_query: String,
    /// Number of entries in the current directory snapshot
    pub directory_len: usize,
    /// When the current directory snapshot was fetched
    pub fetched_at: Option<DateTime<Utc>>,
    /// Count of debounced query transitions handled so far
    pub searches_run: u64,
}

impl Default for PipelineView {
    fn default() -> Self {
        Self {
            results: Arc::from(Vec::new()),
            loading: false,
            error: None,
            debounced_query: String::new(),
            directory_len: 0,
            fetched_at: None,
            searches_run: 0,
        }
    }
}
