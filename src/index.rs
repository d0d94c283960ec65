//! Fuzzy match index over a directory snapshot
//!
//! Each entry's symbol and name are lowercased once at build time. A query is
//! matched against every field using approximate substring matching: the
//! smallest edit distance between the query and any substring of the field.
//!
//! # Scoring
//!
//! ```text
//! score = errors / query_len + match_start / LOCATION_DISTANCE
//! ```
//!
//! A score of 0.0 is an exact match at the start of the field. Entries whose
//! best field score exceeds the threshold are dropped. Results are ranked by
//! ascending score, then symbol matches before name matches, then directory
//! order.
//!
//! Query time is O(n * q * f) for n entries, query length q and field length
//! f, which is fine for exchange-sized directories (tens of thousands of
//! short strings).

use serde::Serialize;
use std::cmp::Ordering;
use std::sync::Arc;

use crate::models::{Directory, DirectoryEntry};

/// Default match threshold (0 = exact, 1 = anything)
pub const DEFAULT_THRESHOLD: f64 = 0.3;

/// How far into a field a match can start before the location penalty alone
/// reaches 1.0
const LOCATION_DISTANCE: f64 = 100.0;

/// Which field of an entry produced the best score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchField {
    Symbol,
    Name,
}

/// A single ranked hit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Match {
    /// Position of the entry in the directory
    pub index: usize,
    pub score: f64,
    pub field: MatchField,
}

struct IndexedKeys {
    symbol: Vec<char>,
    name: Vec<char>,
}

/// Immutable search structure built from one directory snapshot
///
/// Never patched: a new directory means a new index.
pub struct MatchIndex {
    directory: Arc<Directory>,
    keys: Vec<IndexedKeys>,
    threshold: f64,
}

impl MatchIndex {
    /// Build an index over `directory`
    ///
    /// `threshold` is clamped to `[0.0, 1.0]`.
    pub fn build(directory: Arc<Directory>, threshold: f64) -> Self {
        let keys = directory
            .entries()
            .iter()
            .map(|entry| IndexedKeys {
                symbol: entry.symbol.to_lowercase().chars().collect(),
                name: entry.name.to_lowercase().chars().collect(),
            })
            .collect();

        let threshold = if threshold.is_nan() { DEFAULT_THRESHOLD } else { threshold.clamp(0.0, 1.0) };

        Self {
            directory,
            keys,
            threshold,
        }
    }

    /// An index over the empty directory
    pub fn empty(threshold: f64) -> Self {
        Self::build(Arc::new(Directory::empty()), threshold)
    }

    /// Whether this index was built from exactly this snapshot
    pub fn is_built_from(&self, directory: &Arc<Directory>) -> bool {
        Arc::ptr_eq(&self.directory, directory)
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Rank entries against `query`, returning at most `limit` hits
    ///
    /// Surrounding whitespace in the query is ignored; an empty query matches
    /// nothing.
    pub fn search(&self, query: &str, limit: usize) -> Vec<Match> {
        let pattern: Vec<char> = query.trim().to_lowercase().chars().collect();
        if pattern.is_empty() || limit == 0 {
            return Vec::new();
        }

        let match_all = self.threshold >= 1.0;
        let max_errors = if match_all {
            pattern.len()
        } else {
            (self.threshold * pattern.len() as f64).floor() as usize
        };

        let mut hits: Vec<Match> = self
            .keys
            .iter()
            .enumerate()
            .filter_map(|(index, keys)| {
                let symbol = field_score(&pattern, &keys.symbol, max_errors)
                    .map(|score| (score, MatchField::Symbol));
                let name = field_score(&pattern, &keys.name, max_errors)
                    .map(|score| (score, MatchField::Name));

                let (score, field) = match (symbol, name) {
                    (Some(s), Some(n)) => {
                        if n.0 < s.0 { n } else { s }
                    }
                    (Some(s), None) => s,
                    (None, Some(n)) => n,
                    (None, None) if match_all => (1.0, MatchField::Symbol),
                    (None, None) => return None,
                };

                if !match_all && score > self.threshold {
                    return None;
                }

                Some(Match { index, score, field })
            })
            .collect();

        hits.sort_by(|a, b| {
            a.score
                .total_cmp(&b.score)
                .then(a.field.cmp(&b.field))
                .then(a.index.cmp(&b.index))
        });
        hits.truncate(limit);

        log::trace!("Query {:?} matched {} entries", query, hits.len());
        hits
    }

    /// Like [`MatchIndex::search`] but returns the matched entries themselves
    pub fn search_entries(&self, query: &str, limit: usize) -> Vec<DirectoryEntry> {
        self.search(query, limit)
            .into_iter()
            .filter_map(|hit| self.directory.get(hit.index).cloned())
            .collect()
    }
}

/// Best score of `pattern` against any substring of `text`
///
/// Returns `None` when every alignment needs more than `max_errors` edits.
fn field_score(pattern: &[char], text: &[char], max_errors: usize) -> Option<f64> {
    let m = pattern.len();
    let n = text.len();

    // Row i holds the cheapest alignment of pattern[..i] ending at text[..j],
    // with a free starting position in the text. `start` records where that
    // alignment began so the location penalty can be applied.
    let mut prev_cost: Vec<usize> = vec![0; n + 1];
    let mut prev_start: Vec<usize> = (0..=n).collect();
    let mut cost: Vec<usize> = vec![0; n + 1];
    let mut start: Vec<usize> = vec![0; n + 1];

    for i in 1..=m {
        cost[0] = i;
        start[0] = 0;
        let mut row_min = cost[0];

        for j in 1..=n {
            let substitute = prev_cost[j - 1] + usize::from(pattern[i - 1] != text[j - 1]);
            let skip_pattern = prev_cost[j] + 1;
            let skip_text = cost[j - 1] + 1;

            let (c, s) = if substitute <= skip_pattern && substitute <= skip_text {
                (substitute, prev_start[j - 1])
            } else if skip_pattern <= skip_text {
                (skip_pattern, prev_start[j])
            } else {
                (skip_text, start[j - 1])
            };

            cost[j] = c;
            start[j] = s;
            row_min = row_min.min(c);
        }

        if row_min > max_errors {
            return None;
        }

        std::mem::swap(&mut prev_cost, &mut cost);
        std::mem::swap(&mut prev_start, &mut start);
    }

    (0..=n)
        .filter(|&j| prev_cost[j] <= max_errors)
        .map(|j| prev_cost[j] as f64 / m as f64 + prev_start[j] as f64 / LOCATION_DISTANCE)
        .min_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal))
}
