//! Submission queue: FIFO of work items awaiting the pipeline runner.
//!
//! The queue owns each [`WorkItem`] from the moment it is accepted until the
//! runner drains it. Drained items stay registered as *in flight* until the
//! runner calls [`SubmissionQueue::finish`], which is what keeps a second file
//! with the same name out while the first is still being uploaded.

use std::collections::{HashMap, VecDeque};

use chrono::Utc;

use crate::config::PipelineConfig;
use crate::error::{QueueError, Result, ValidationError};
use crate::types::{ItemId, ItemStatus, Payload, WorkItem, label_for};

/// In-memory FIFO of pending work items
#[derive(Debug)]
pub struct SubmissionQueue {
    pending: VecDeque<WorkItem>,
    /// Drained but unfinished items -> file name (None for text)
    in_flight: HashMap<ItemId, Option<String>>,
    next_id: u64,
    accepted_extensions: Vec<String>,
    label_max_chars: usize,
}

impl SubmissionQueue {
    /// Create an empty queue
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            pending: VecDeque::new(),
            in_flight: HashMap::new(),
            next_id: 1,
            accepted_extensions: config
                .accepted_extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
            label_max_chars: config.label_max_chars,
        }
    }

    /// Check a payload without enqueuing it
    ///
    /// # Errors
    ///
    /// - `EmptySubmission` for blank text or a zero-byte file
    /// - `UnsupportedFileType` for a file whose extension is not accepted
    /// - `DuplicateItem` for a file named like one still queued or in flight
    pub fn validate(&self, payload: &Payload) -> Result<()> {
        if payload.is_empty() {
            return Err(ValidationError::EmptySubmission.into());
        }

        if let Payload::File(file) = payload {
            let accepted = file
                .extension()
                .is_some_and(|ext| self.accepted_extensions.contains(&ext));
            if !accepted {
                return Err(ValidationError::UnsupportedFileType {
                    name: file.name.clone(),
                }
                .into());
            }

            if self.file_name_taken(&file.name) {
                return Err(ValidationError::DuplicateItem {
                    name: file.name.clone(),
                }
                .into());
            }
        }

        Ok(())
    }

    /// Add an item to the back of the queue
    pub fn enqueue(&mut self, payload: Payload) -> Result<ItemId> {
        self.validate(&payload)?;
        let item = self.new_item(payload, ItemStatus::Queued);
        let id = item.id;
        self.pending.push_back(item);
        Ok(id)
    }

    /// Accept an item that bypasses the queue and goes straight in flight
    ///
    /// Used for chat turns, which are processed on their own rather than by the
    /// next run. The item must still be released with [`finish`](Self::finish).
    pub fn admit(&mut self, payload: Payload) -> Result<WorkItem> {
        self.validate(&payload)?;
        let item = self.new_item(payload, ItemStatus::InProgress);
        self.in_flight
            .insert(item.id, item.file_name().map(str::to_string));
        Ok(item)
    }

    fn new_item(&mut self, payload: Payload, status: ItemStatus) -> WorkItem {
        let id = ItemId(self.next_id);
        self.next_id += 1;

        let label = label_for(&payload, self.label_max_chars);
        WorkItem {
            id,
            payload,
            status,
            label,
            queued_at: Utc::now(),
        }
    }

    /// Remove a queued item
    ///
    /// # Errors
    ///
    /// `AlreadyProcessing` if the runner already drained it, `ItemNotFound` if the
    /// ID is unknown (or finished).
    pub fn remove(&mut self, id: ItemId) -> Result<WorkItem> {
        if self.in_flight.contains_key(&id) {
            return Err(QueueError::AlreadyProcessing { id: id.0 }.into());
        }

        let position = self
            .pending
            .iter()
            .position(|item| item.id == id)
            .ok_or(QueueError::ItemNotFound { id: id.0 })?;

        // position came from the same deque
        match self.pending.remove(position) {
            Some(item) => Ok(item),
            None => Err(QueueError::ItemNotFound { id: id.0 }.into()),
        }
    }

    /// Pop the oldest queued item and register it as in flight
    pub fn drain_next(&mut self) -> Option<WorkItem> {
        let mut item = self.pending.pop_front()?;
        item.status = ItemStatus::InProgress;
        self.in_flight
            .insert(item.id, item.file_name().map(str::to_string));
        Some(item)
    }

    /// Mark an in-flight item as finished, releasing its file name
    ///
    /// Returns false if the item was not in flight.
    pub fn finish(&mut self, id: ItemId, status: ItemStatus) -> bool {
        debug_assert!(matches!(status, ItemStatus::Done | ItemStatus::Failed));
        let was_in_flight = self.in_flight.remove(&id).is_some();
        if was_in_flight {
            tracing::debug!(item_id = id.0, status = ?status, "work item finished");
        }
        was_in_flight
    }

    /// Discard every queued item (in-flight items are unaffected)
    ///
    /// Returns the number of discarded items.
    pub fn clear(&mut self) -> usize {
        let discarded = self.pending.len();
        self.pending.clear();
        discarded
    }

    /// Number of queued (not yet drained) items
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// True when nothing is waiting
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Number of drained, unfinished items
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Current status of a known item
    pub fn status(&self, id: ItemId) -> Option<ItemStatus> {
        if self.in_flight.contains_key(&id) {
            Some(ItemStatus::InProgress)
        } else if self.pending.iter().any(|item| item.id == id) {
            Some(ItemStatus::Queued)
        } else {
            None
        }
    }

    /// Copy of the queued items in FIFO order
    pub fn snapshot(&self) -> Vec<WorkItem> {
        self.pending.iter().cloned().collect()
    }

    fn file_name_taken(&self, name: &str) -> bool {
        self.pending
            .iter()
            .any(|item| item.file_name() == Some(name))
            || self
                .in_flight
                .values()
                .any(|file| file.as_deref() == Some(name))
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::types::FileUpload;

    fn queue() -> SubmissionQueue {
        SubmissionQueue::new(&PipelineConfig::default())
    }

    fn pdf(name: &str) -> Payload {
        Payload::File(FileUpload::new(name, b"%PDF-1.4 test".to_vec()))
    }

    #[test]
    fn test_drain_is_fifo() {
        let mut q = queue();
        let a = q.enqueue(Payload::Text("first".into())).unwrap();
        let b = q.enqueue(pdf("b.pdf")).unwrap();
        let c = q.enqueue(Payload::Text("third".into())).unwrap();

        assert_eq!(q.drain_next().unwrap().id, a);
        assert_eq!(q.drain_next().unwrap().id, b);
        assert_eq!(q.drain_next().unwrap().id, c);
        assert!(q.drain_next().is_none());
    }

    #[test]
    fn test_drained_item_is_in_progress() {
        let mut q = queue();
        let id = q.enqueue(Payload::Text("x".into())).unwrap();
        assert_eq!(q.status(id), Some(ItemStatus::Queued));

        let item = q.drain_next().unwrap();
        assert_eq!(item.status, ItemStatus::InProgress);
        assert_eq!(q.status(id), Some(ItemStatus::InProgress));

        assert!(q.finish(id, ItemStatus::Done));
        assert_eq!(q.status(id), None);
        assert!(!q.finish(id, ItemStatus::Done), "second finish is a no-op");
    }

    #[test]
    fn test_empty_submission_rejected() {
        let mut q = queue();
        let err = q.enqueue(Payload::Text("   ".into())).unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::EmptySubmission)
        ));

        let err = q
            .enqueue(Payload::File(FileUpload::new("empty.pdf", vec![])))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::EmptySubmission)
        ));
        assert!(q.is_empty());
    }

    #[test]
    fn test_unsupported_file_type_rejected() {
        let mut q = queue();
        let err = q
            .enqueue(Payload::File(FileUpload::new("scan.png", vec![1])))
            .unwrap_err();
        match err {
            Error::Validation(ValidationError::UnsupportedFileType { name }) => {
                assert_eq!(name, "scan.png");
            }
            other => panic!("expected UnsupportedFileType, got: {:?}", other),
        }
    }

    #[test]
    fn test_extension_match_is_case_insensitive() {
        let mut q = queue();
        assert!(q.enqueue(pdf("JUDGMENT.PDF")).is_ok());
    }

    #[test]
    fn test_duplicate_file_rejected_while_queued_or_in_flight() {
        let mut q = queue();
        let id = q.enqueue(pdf("a.pdf")).unwrap();

        let err = q.enqueue(pdf("a.pdf")).unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::DuplicateItem { .. })
        ));

        q.drain_next().unwrap();
        assert!(
            q.enqueue(pdf("a.pdf")).is_err(),
            "in-flight file still blocks its name"
        );

        q.finish(id, ItemStatus::Failed);
        assert!(
            q.enqueue(pdf("a.pdf")).is_ok(),
            "name is free once processing finished"
        );
    }

    #[test]
    fn test_duplicate_text_allowed() {
        let mut q = queue();
        q.enqueue(Payload::Text("same".into())).unwrap();
        q.enqueue(Payload::Text("same".into())).unwrap();
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn test_remove_queued_item() {
        let mut q = queue();
        let a = q.enqueue(pdf("a.pdf")).unwrap();
        let b = q.enqueue(pdf("b.pdf")).unwrap();

        let removed = q.remove(a).unwrap();
        assert_eq!(removed.label, "a.pdf");
        assert_eq!(q.drain_next().unwrap().id, b);
    }

    #[test]
    fn test_remove_in_flight_fails() {
        let mut q = queue();
        let id = q.enqueue(pdf("a.pdf")).unwrap();
        q.drain_next().unwrap();

        let err = q.remove(id).unwrap_err();
        assert!(matches!(
            err,
            Error::Queue(QueueError::AlreadyProcessing { id: 1 })
        ));
    }

    #[test]
    fn test_remove_unknown_fails() {
        let mut q = queue();
        let err = q.remove(ItemId(42)).unwrap_err();
        assert!(matches!(err, Error::Queue(QueueError::ItemNotFound { id: 42 })));
    }

    #[test]
    fn test_clear_discards_only_pending() {
        let mut q = queue();
        let first = q.enqueue(pdf("a.pdf")).unwrap();
        q.enqueue(pdf("b.pdf")).unwrap();
        q.enqueue(Payload::Text("c".into())).unwrap();
        q.drain_next().unwrap();

        assert_eq!(q.clear(), 2);
        assert!(q.is_empty());
        assert_eq!(q.in_flight_count(), 1);
        assert_eq!(q.status(first), Some(ItemStatus::InProgress));
    }

    #[test]
    fn test_ids_are_monotonic_across_clear() {
        let mut q = queue();
        let a = q.enqueue(Payload::Text("a".into())).unwrap();
        q.clear();
        let b = q.enqueue(Payload::Text("b".into())).unwrap();
        assert!(b > a);
    }

    #[test]
    fn test_admit_skips_pending_list() {
        let mut q = queue();
        let queued = q.enqueue(pdf("a.pdf")).unwrap();

        let item = q.admit(Payload::Text("hello".into())).unwrap();
        assert_eq!(item.status, ItemStatus::InProgress);
        assert!(item.id > queued);
        assert_eq!(q.len(), 1, "queued item untouched");
        assert_eq!(q.drain_next().unwrap().id, queued);

        assert!(q.finish(item.id, ItemStatus::Done));
        assert!(q.admit(Payload::Text(" ".into())).is_err());
    }
}
