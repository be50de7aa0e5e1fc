//! Workspace facade split into focused submodules.
//!
//! The `Workspace` struct and its methods are organized by concern:
//! - [`submit`] - Enqueuing, removing and clearing work items
//! - [`runner`] - Draining the queue against a remote operation
//! - [`chat`] - One-shot chat turns
//! - [`export_ops`] - Exporting logged outcomes

mod chat;
mod export_ops;
mod runner;
mod submit;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, broadcast};
use tokio_stream::wrappers::BroadcastStream;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::Result;
use crate::export::{DocumentConverter, ExportCodec};
use crate::gate::CredentialGate;
use crate::identity::{IdentityProvider, RestIdentityProvider};
use crate::queue::SubmissionQueue;
use crate::remote::HttpRemoteOp;
use crate::result_log::ResultLog;
use crate::types::{Event, ItemId, OperationKind, WorkItem};

/// Upload progress per in-flight item (0 to 100)
///
/// Written from synchronous progress callbacks, so this uses a std lock that is
/// never held across an await.
pub(crate) type ProgressMap = Arc<std::sync::RwLock<HashMap<ItemId, u8>>>;

/// Queue and in-flight call state
#[derive(Clone)]
pub(crate) struct PipelineState {
    /// Pending and in-flight work items
    pub(crate) queue: Arc<Mutex<SubmissionQueue>>,
    /// Cancellation tokens of calls currently in flight
    pub(crate) active_calls: Arc<Mutex<HashMap<ItemId, CancellationToken>>>,
    /// Held for the duration of a run; a second `run()` waits for the first
    pub(crate) run_lock: Arc<Mutex<()>>,
    /// Ephemeral upload progress, kept out of the result log
    pub(crate) progress: ProgressMap,
}

/// Main client instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct Workspace {
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: broadcast::Sender<Event>,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Session state machine
    pub(crate) gate: CredentialGate,
    /// Queue and in-flight call state
    pub(crate) pipeline: PipelineState,
    /// Append-only record of submissions and outcomes
    pub(crate) log: ResultLog,
    /// Text-to-artifact codec
    pub(crate) export: ExportCodec,
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace")
            .field("gate", &self.gate)
            .field("export", &self.export)
            .finish_non_exhaustive()
    }
}

impl Workspace {
    /// Create a workspace backed by `provider`
    ///
    /// Validates the configuration and sets up the event channel, queue, log and
    /// credential gate. The gate starts `Anonymous`.
    pub fn new(config: Config, provider: Arc<dyn IdentityProvider>) -> Result<Self> {
        config.validate()?;

        let (event_tx, _rx) = broadcast::channel(config.pipeline.event_buffer);
        let gate = CredentialGate::new(provider, config.identity.clone());
        let pipeline = PipelineState {
            queue: Arc::new(Mutex::new(SubmissionQueue::new(&config.pipeline))),
            active_calls: Arc::new(Mutex::new(HashMap::new())),
            run_lock: Arc::new(Mutex::new(())),
            progress: Arc::new(std::sync::RwLock::new(HashMap::new())),
        };
        let log = ResultLog::new(event_tx.clone());
        let export = ExportCodec::new(&config.export);

        tracing::info!(
            backend = %config.endpoints.backend_url,
            max_concurrent_calls = config.pipeline.max_concurrent_calls,
            "workspace created"
        );

        Ok(Self {
            event_tx,
            config: Arc::new(config),
            gate,
            pipeline,
            log,
            export,
        })
    }

    /// Create a workspace using the Identity Toolkit REST provider
    pub fn with_rest_identity(config: Config) -> Result<Self> {
        let provider = RestIdentityProvider::new(&config.identity)?;
        Self::new(config, Arc::new(provider))
    }

    /// Replace the PDF/DOCX converter used by exports
    pub fn with_document_converter(mut self, converter: Arc<dyn DocumentConverter>) -> Self {
        self.export = ExportCodec::with_converter(&self.config.export, converter);
        self
    }

    /// Subscribe to workspace events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all events
    /// independently; a subscriber that falls behind by more than
    /// `pipeline.event_buffer` events gets `RecvError::Lagged`.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Workspace events as a `Stream`
    pub fn event_stream(&self) -> BroadcastStream<Event> {
        BroadcastStream::new(self.event_tx.subscribe())
    }

    /// The credential gate
    pub fn gate(&self) -> &CredentialGate {
        &self.gate
    }

    /// The result log
    pub fn log(&self) -> &ResultLog {
        &self.log
    }

    /// Current configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// HTTP client for `kind` built from the endpoint configuration
    pub fn http_operation(&self, kind: OperationKind) -> Result<HttpRemoteOp> {
        HttpRemoteOp::new(kind, &self.config.endpoints)
    }

    /// Pending items in queue order
    pub async fn queue_snapshot(&self) -> Vec<WorkItem> {
        self.pipeline.queue.lock().await.snapshot()
    }

    /// Number of pending items
    pub async fn queue_len(&self) -> usize {
        self.pipeline.queue.lock().await.len()
    }

    /// Upload progress of an in-flight item
    pub fn progress(&self, id: ItemId) -> Option<u8> {
        self.pipeline
            .progress
            .read()
            .ok()
            .and_then(|map| map.get(&id).copied())
    }

    /// Upload progress of every in-flight file item
    pub fn progress_snapshot(&self) -> HashMap<ItemId, u8> {
        self.pipeline
            .progress
            .read()
            .map(|map| map.clone())
            .unwrap_or_default()
    }

    pub(crate) fn emit_event(&self, event: Event) {
        // send() returns Err if there are no receivers, which is fine - we just drop the event
        self.event_tx.send(event).ok();
    }
}
