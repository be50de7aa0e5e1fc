//! Append-only result log.
//!
//! Entries are never mutated or removed. Readers get snapshots; the log may grow
//! between two reads, so consumers must not cache its length across awaits.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{RwLock, broadcast};

use crate::error::{LogError, Result};
use crate::types::{EntryId, EntryKind, Event, ItemId, LogEntry};

/// Ordered record of submissions and their outcomes (cloneable handle)
#[derive(Clone, Debug)]
pub struct ResultLog {
    entries: Arc<RwLock<Vec<LogEntry>>>,
    event_tx: broadcast::Sender<Event>,
}

impl ResultLog {
    /// Create an empty log that announces appends on `event_tx`
    pub fn new(event_tx: broadcast::Sender<Event>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
            event_tx,
        }
    }

    /// Append an entry and notify subscribers
    ///
    /// The notification is sent while the write lock is held, so a subscriber
    /// reacting to `EntryAppended` always finds the entry in the log.
    pub async fn append(&self, item_id: ItemId, kind: EntryKind) -> EntryId {
        let mut entries = self.entries.write().await;
        let id = EntryId(entries.len() as u64);
        entries.push(LogEntry {
            id,
            item_id,
            recorded_at: Utc::now(),
            kind,
        });
        self.event_tx.send(Event::EntryAppended { entry_id: id }).ok();
        tracing::debug!(entry_id = id.0, item_id = item_id.0, "result log entry appended");
        id
    }

    /// Append several entries back to back, with no other append in between
    pub async fn append_all(
        &self,
        item_id: ItemId,
        kinds: impl IntoIterator<Item = EntryKind>,
    ) -> Vec<EntryId> {
        let mut entries = self.entries.write().await;
        let mut ids = Vec::new();
        for kind in kinds {
            let id = EntryId(entries.len() as u64);
            entries.push(LogEntry {
                id,
                item_id,
                recorded_at: Utc::now(),
                kind,
            });
            self.event_tx.send(Event::EntryAppended { entry_id: id }).ok();
            ids.push(id);
        }
        ids
    }

    /// Snapshot of all entries in append order
    pub async fn entries(&self) -> Vec<LogEntry> {
        self.entries.read().await.clone()
    }

    /// Look up one entry
    pub async fn entry_at(&self, id: EntryId) -> Result<LogEntry> {
        let entries = self.entries.read().await;
        usize::try_from(id.0)
            .ok()
            .and_then(|index| entries.get(index))
            .cloned()
            .ok_or_else(|| LogError::EntryNotFound { id: id.0 }.into())
    }

    /// Number of entries
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// True when nothing has been logged
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Most recent entry
    pub async fn last(&self) -> Option<LogEntry> {
        self.entries.read().await.last().cloned()
    }
}
