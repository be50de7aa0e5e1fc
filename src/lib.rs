//! # legalytics-client
//!
//! Interaction core of the Legalytics legal-research client: an email-verified
//! session gate, a submission queue of documents and questions, a pipeline
//! runner calling the search, summarization, bail-prediction and chat
//! endpoints, an append-only result log and an export codec.
//!
//! ## Design Philosophy
//!
//! legalytics-client is designed to be:
//! - **Library-first** - No UI, no server; hosts drive it and render its state
//! - **Event-driven** - Consumers subscribe to events, no polling required
//! - **Failure-contained** - A failed item becomes a log entry, never a failed batch
//! - **Sensible defaults** - Works against a local backend with zero configuration
//!
//! ## Quick Start
//!
//! ```no_run
//! use legalytics_client::{Config, OperationKind, Workspace};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let workspace = Workspace::with_rest_identity(Config::default())?;
//!
//!     // Subscribe to events
//!     let mut events = workspace.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     workspace.gate().sign_in("advocate@example.com", "password").await?;
//!     workspace.submit_text("Can the accused be granted bail?").await?;
//!
//!     let predict = workspace.http_operation(OperationKind::Predict)?;
//!     let summary = workspace.run(&predict).await;
//!     println!("{} processed, {} failed", summary.processed, summary.failed);
//!
//!     for entry in workspace.log().entries().await {
//!         println!("{:?}", entry.kind);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Export codec
pub mod export;
/// Credential gate (session state machine and access decisions)
pub mod gate;
/// Identity provider seam and REST implementation
pub mod identity;
/// Submission queue
pub mod queue;
/// Remote operations (search, summarize, predict, chat)
pub mod remote;
/// Append-only result log
pub mod result_log;
/// Retry logic with exponential backoff
pub mod retry;
/// Core types
pub mod types;
/// Workspace facade (decomposed into focused submodules)
pub mod workspace;

// Re-export commonly used types
pub use config::{
    Config, EndpointConfig, ExportConfig, IdentityConfig, PipelineConfig, RetryConfig,
    UnknownFormatPolicy,
};
pub use error::{
    AuthError, Error, ExportError, LogError, QueueError, RemoteError, Result, ValidationError,
};
pub use export::{Artifact, DocumentConverter, ExportCodec, ExportFormat, PassthroughConverter};
pub use gate::{AccessPolicy, CredentialGate, GateDecision, Session, SessionEvent, SessionState};
pub use identity::{
    FederatedCredential, FederatedTokenSource, Identity, IdentityProvider, RestIdentityProvider,
    SignInMethod,
};
pub use queue::SubmissionQueue;
pub use remote::{HttpRemoteOp, OperationOutput, ProgressSink, RemoteOp};
pub use result_log::ResultLog;
pub use types::{
    EntryId, EntryKind, Event, FileUpload, ItemId, ItemKind, ItemStatus, LogEntry, OperationKind,
    Payload, RetrievedCase, RunSummary, WorkItem,
};
pub use workspace::Workspace;
