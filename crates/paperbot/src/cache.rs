//! The record cache: point lookups and conditional writes of [`PaperRecord`]s by
//! `paper_id`.
//!
//! Two implementations are provided: the SQLite-backed [`Database`](crate::database::Database)
//! for persistent use, and [`MemoryCache`] for tests and short-lived processes. Neither
//! expires entries; a record stays authoritative until it is explicitly overwritten.

use std::collections::HashMap;

use tokio::sync::RwLock;

use super::*;

/// Key-value storage of paper records.
#[async_trait]
pub trait PaperCache: Send + Sync {
  /// Looks up a record. Absence is `Ok(None)`, never an error.
  async fn get(&self, paper_id: &str) -> Result<Option<PaperRecord>, PaperbotError>;

  /// Writes a record under its `paper_id`.
  ///
  /// If a record already exists and `overwrite` is false, nothing is written and `false`
  /// is returned. The check and the write happen atomically, so when several writers race
  /// on the same key exactly one of them wins.
  async fn put(&self, record: &PaperRecord, overwrite: bool) -> Result<bool, PaperbotError>;
}

/// In-memory [`PaperCache`].
#[derive(Debug, Default)]
pub struct MemoryCache {
  /// Records keyed by `paper_id`
  records: RwLock<HashMap<String, PaperRecord>>,
}

impl MemoryCache {
  /// Creates an empty cache.
  pub fn new() -> Self { Self::default() }

  /// Number of cached records.
  pub async fn len(&self) -> usize { self.records.read().await.len() }

  /// Whether the cache holds no records.
  pub async fn is_empty(&self) -> bool { self.records.read().await.is_empty() }
}

#[async_trait]
impl PaperCache for MemoryCache {
  async fn get(&self, paper_id: &str) -> Result<Option<PaperRecord>, PaperbotError> {
    Ok(self.records.read().await.get(paper_id).cloned())
  }

  async fn put(&self, record: &PaperRecord, overwrite: bool) -> Result<bool, PaperbotError> {
    let mut records = self.records.write().await;
    if !overwrite && records.contains_key(record.paper_id()) {
      return Ok(false);
    }
    records.insert(record.paper_id().to_string(), record.clone());
    Ok(true)
  }
}
