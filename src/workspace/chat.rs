//! Chat: one text item processed on its own.

use super::Workspace;
use super::runner::EchoTiming;
use crate::error::{LogError, Result};
use crate::remote::RemoteOp;
use crate::types::{LogEntry, OperationKind, Payload};

impl Workspace {
    /// Send a chat message to the configured chat endpoint
    ///
    /// Returns the reply entry (an `Outcome`, or an `OutcomeError` when the
    /// endpoint failed). Only validation and session errors are returned as
    /// `Err`.
    pub async fn send_chat_message(&self, text: &str) -> Result<LogEntry> {
        let operation = self.http_operation(OperationKind::Chat)?;
        self.send_chat_message_with(&operation, text).await
    }

    /// Like [`send_chat_message`](Self::send_chat_message) with a caller-supplied operation
    ///
    /// The message never enters the submission queue, so items queued for other
    /// operations are left alone. A run in progress finishes first.
    pub async fn send_chat_message_with(
        &self,
        operation: &dyn RemoteOp,
        text: &str,
    ) -> Result<LogEntry> {
        self.gate.require_verified().await?;
        let item = self
            .pipeline
            .queue
            .lock()
            .await
            .admit(Payload::Text(text.to_string()))?;
        let id = item.id;

        let _run_guard = self.pipeline.run_lock.lock().await;
        tracing::debug!(item_id = id.0, operation = %operation.kind(), "chat turn started");
        self.process_item(operation, item, EchoTiming::Immediate)
            .await;

        self.log
            .entries()
            .await
            .into_iter()
            .rev()
            .find(|entry| entry.item_id == id && !entry.is_echo())
            .ok_or_else(|| LogError::EntryNotFound { id: id.0 }.into())
    }
}
