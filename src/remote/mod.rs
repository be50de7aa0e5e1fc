//! Remote operations: search, summarize, predict and chat.
//!
//! The pipeline runner only sees the [`RemoteOp`] trait. [`HttpRemoteOp`] is the
//! production implementation talking to the Legalytics backend and chat route;
//! tests plug in scripted implementations.

mod http;
mod response;

pub use http::HttpRemoteOp;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::RemoteError;
use crate::types::{OperationKind, Payload, RetrievedCase};

/// Successful result of a remote call
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OperationOutput {
    /// Text shown to the user and stored in the result log
    pub text: String,
    /// Structured cases (search only)
    pub cases: Vec<RetrievedCase>,
}

impl OperationOutput {
    /// Output consisting of text only
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            cases: Vec::new(),
        }
    }
}

/// Receiver for upload progress (0 to 100)
///
/// Cloneable and cheap; a sink built with [`ProgressSink::noop`] drops every update.
#[derive(Clone, Default)]
pub struct ProgressSink {
    callback: Option<Arc<dyn Fn(u8) + Send + Sync>>,
}

impl ProgressSink {
    /// Sink that forwards every update to `callback`
    pub fn new(callback: impl Fn(u8) + Send + Sync + 'static) -> Self {
        Self {
            callback: Some(Arc::new(callback)),
        }
    }

    /// Sink that ignores updates
    pub fn noop() -> Self {
        Self::default()
    }

    /// Report a percentage (clamped to 100)
    pub fn report(&self, percent: u8) {
        if let Some(callback) = &self.callback {
            callback(percent.min(100));
        }
    }
}

impl std::fmt::Debug for ProgressSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressSink")
            .field("active", &self.callback.is_some())
            .finish()
    }
}

/// Percentage of `done` out of `total`, rounded like the web client did
pub(crate) fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let pct = (done as f64 * 100.0 / total as f64).round();
    pct.clamp(0.0, 100.0) as u8
}

/// One remote operation, called once per work item
///
/// Implementations are stateless per call: no retries, no memory of earlier
/// items. Timeouts are the implementation's responsibility.
#[async_trait]
pub trait RemoteOp: Send + Sync {
    /// Which operation this is
    fn kind(&self) -> OperationKind;

    /// Send `payload` and wait for the result
    ///
    /// File uploads should report progress through `progress`; text calls may
    /// ignore it.
    async fn call(
        &self,
        payload: &Payload,
        progress: ProgressSink,
    ) -> Result<OperationOutput, RemoteError>;
}
