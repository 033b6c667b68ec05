//! Protocol Improver Storage Layer
//!
//! Implements the AnalysisStore trait with a process-local cache.
//!
//! # Architecture
//!
//! - `RwLock<HashMap>` keyed by [`AnalysisId`]
//! - Ids are assigned under the write lock, so concurrent `put`s of the same
//!   upload never collide
//! - No eviction; records live until the process exits
//!
//! # Examples
//!
//! ```
//! use improver_domain::traits::AnalysisStore;
//! use improver_store::InMemoryStore;
//!
//! let store = InMemoryStore::new();
//! assert!(store.is_empty().unwrap());
//! ```

#![warn(missing_docs)]

use improver_domain::traits::AnalysisStore;
use improver_domain::{AnalysisDraft, AnalysisId, AnalysisRecord};
use std::collections::HashMap;
use std::sync::RwLock;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// A thread panicked while holding the cache lock
    #[error("Analysis cache lock poisoned")]
    LockPoisoned,
}

/// In-memory implementation of AnalysisStore
///
/// Safe to share between requests behind an `Arc`.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: RwLock<HashMap<AnalysisId, AnalysisRecord>>,
}

impl InMemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

/// First id derived from `base` that is not yet taken
///
/// `base` itself, then `base_2`, `base_3`, ...
fn unique_id(base: AnalysisId, taken: &HashMap<AnalysisId, AnalysisRecord>) -> AnalysisId {
    if !taken.contains_key(&base) {
        return base;
    }
    let mut n = 2;
    loop {
        let candidate = base.with_suffix(n);
        if !taken.contains_key(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

impl AnalysisStore for InMemoryStore {
    type Error = StoreError;

    fn put(&self, draft: AnalysisDraft) -> Result<AnalysisId, Self::Error> {
        let base = AnalysisId::derive(&draft.stored_filename, draft.created_at);

        let mut records = self.records.write().map_err(|_| StoreError::LockPoisoned)?;
        let id = unique_id(base, &records);
        debug!(analysis_id = %id, suggestions = draft.result.suggestions.len(), "Caching analysis");

        records.insert(id.clone(), AnalysisRecord::from_draft(id.clone(), draft));
        Ok(id)
    }

    fn get(&self, id: &AnalysisId) -> Result<Option<AnalysisRecord>, Self::Error> {
        let records = self.records.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(records.get(id).cloned())
    }

    fn len(&self) -> Result<usize, Self::Error> {
        let records = self.records.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};
    use improver_domain::AnalysisResult;

    fn draft(stored_filename: &str, second: u32) -> AnalysisDraft {
        AnalysisDraft {
            stored_filename: stored_filename.to_string(),
            source_filename: "protocol.pdf".to_string(),
            original_text: "Step 1. Thaw cells.".to_string(),
            result: AnalysisResult {
                summary: "Analysis completed".to_string(),
                overall_score: "N/A".to_string(),
                total_issues: 0,
                suggestions: vec![],
                raw_response: None,
            },
            created_at: Local.with_ymd_and_hms(2024, 5, 1, 12, 0, second).unwrap(),
        }
    }

    #[test]
    fn test_put_and_get() {
        let store = InMemoryStore::new();
        let id = store.put(draft("20240501_120000_a.pdf", 0)).unwrap();

        assert_eq!(id.as_str(), "20240501_120000_a.pdf_20240501120000");
        let record = store.get(&id).unwrap().unwrap();
        assert_eq!(record.id, id);
        assert_eq!(record.original_text, "Step 1. Thaw cells.");
        assert_eq!(record.source_filename, "protocol.pdf");
    }

    #[test]
    fn test_get_unknown_id() {
        let store = InMemoryStore::new();
        assert!(store.get(&AnalysisId::from("missing")).unwrap().is_none());
    }

    #[test]
    fn test_same_second_ids_get_suffixes() {
        let store = InMemoryStore::new();
        let first = store.put(draft("x.pdf", 7)).unwrap();
        let second = store.put(draft("x.pdf", 7)).unwrap();
        let third = store.put(draft("x.pdf", 7)).unwrap();

        assert_eq!(first.as_str(), "x.pdf_20240501120007");
        assert_eq!(second.as_str(), "x.pdf_20240501120007_2");
        assert_eq!(third.as_str(), "x.pdf_20240501120007_3");
        assert_eq!(store.len().unwrap(), 3);
    }

    #[test]
    fn test_different_seconds_do_not_collide() {
        let store = InMemoryStore::new();
        let a = store.put(draft("x.pdf", 1)).unwrap();
        let b = store.put(draft("x.pdf", 2)).unwrap();
        assert_ne!(a, b);
        assert!(!b.as_str().ends_with("_2"));
    }

    #[test]
    fn test_len_and_is_empty() {
        let store = InMemoryStore::new();
        assert!(store.is_empty().unwrap());

        let b = store.put(draft("b.pdf", 0)).unwrap();
        let a = store.put(draft("a.pdf", 0)).unwrap();

        assert_eq!(store.len().unwrap(), 2);
        assert!(!store.is_empty().unwrap());
        assert_eq!(a.as_str(), "a.pdf_20240501120000");
        assert_eq!(b.as_str(), "b.pdf_20240501120000");
    }
}
