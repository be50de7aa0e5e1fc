//! Submitting work items.

use std::path::Path;

use super::Workspace;
use crate::error::Result;
use crate::types::{Event, FileUpload, ItemId, Payload, label_for};

impl Workspace {
    /// Queue typed text
    ///
    /// Requires a verified session.
    pub async fn submit_text(&self, text: impl Into<String>) -> Result<ItemId> {
        self.submit(Payload::Text(text.into())).await
    }

    /// Queue a document
    ///
    /// Requires a verified session. Fails with `DuplicateItem` while a file with
    /// the same name is queued or uploading.
    pub async fn submit_file(&self, file: FileUpload) -> Result<ItemId> {
        self.submit(Payload::File(file)).await
    }

    /// Read a document from disk and queue it
    pub async fn submit_path(&self, path: impl AsRef<Path>) -> Result<ItemId> {
        self.gate.require_verified().await?;
        let file = FileUpload::from_path(path).await?;
        self.submit_file(file).await
    }

    /// Validate and enqueue any payload
    pub async fn submit(&self, payload: Payload) -> Result<ItemId> {
        self.gate.require_verified().await?;

        let label = label_for(&payload, self.config.pipeline.label_max_chars);
        let id = self.pipeline.queue.lock().await.enqueue(payload)?;

        tracing::debug!(item_id = id.0, label = %label, "item queued");
        self.emit_event(Event::ItemQueued { id, label });
        Ok(id)
    }

    /// Remove a queued item before the runner picks it up
    pub async fn remove(&self, id: ItemId) -> Result<()> {
        self.pipeline.queue.lock().await.remove(id)?;
        tracing::debug!(item_id = id.0, "item removed from queue");
        self.emit_event(Event::ItemRemoved { id });
        Ok(())
    }

    /// Discard all pending items when the user switches between text and file input
    ///
    /// In-flight items are unaffected. Nothing is logged.
    pub async fn switch_mode(&self) -> usize {
        let discarded = self.pipeline.queue.lock().await.clear();
        if discarded > 0 {
            tracing::debug!(discarded, "submission queue cleared");
        }
        self.emit_event(Event::QueueCleared { discarded });
        discarded
    }
}
