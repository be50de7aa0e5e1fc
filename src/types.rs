//! Core types for legalytics-client

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;

/// Unique identifier for a work item (monotonic per workspace)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl ItemId {
    /// Get the inner u64 value
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl From<u64> for ItemId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a result log entry (its position in the log)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub u64);

impl EntryId {
    /// Get the inner u64 value
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl From<u64> for EntryId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of user input
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// Free text typed by the user
    Text,
    /// Uploaded document
    File,
}

/// Work item status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// Waiting in the submission queue
    Queued,
    /// Drained by the runner, remote call in flight
    InProgress,
    /// Remote call succeeded
    Done,
    /// Remote call failed
    Failed,
}

/// Remote operation selector
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// Semantic case retrieval
    Search,
    /// Case summarization
    Summarize,
    /// Bail-decision prediction
    Predict,
    /// Conversational Q&A
    Chat,
}

impl OperationKind {
    /// Stable lowercase name used in logs and events
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Search => "search",
            OperationKind::Summarize => "summarize",
            OperationKind::Predict => "predict",
            OperationKind::Chat => "chat",
        }
    }

    /// Whether this operation accepts file uploads
    pub fn accepts_files(&self) -> bool {
        matches!(self, OperationKind::Search | OperationKind::Summarize)
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A document selected for upload
#[derive(Clone, PartialEq, Eq)]
pub struct FileUpload {
    /// File name as shown to the user (and sent in the multipart part)
    pub name: String,
    /// Raw file content
    pub bytes: Vec<u8>,
    /// MIME type sent with the upload
    pub mime_type: String,
}

impl std::fmt::Debug for FileUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileUpload")
            .field("name", &self.name)
            .field("len", &self.bytes.len())
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

impl FileUpload {
    /// Create an upload, guessing the MIME type from the extension
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let mime_type = mime_for_name(&name).to_string();
        Self {
            name,
            bytes,
            mime_type,
        }
    }

    /// Read a file from disk
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self::new(name, bytes))
    }

    /// Lowercased extension without the dot, if any
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
    }
}

fn mime_for_name(name: &str) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase());
    match ext.as_deref() {
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain",
        Some("docx") => {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
        _ => "application/octet-stream",
    }
}

/// Content of a work item
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Payload {
    /// Typed text
    Text(String),
    /// Uploaded file
    File(FileUpload),
}

impl Payload {
    /// Kind of this payload
    pub fn kind(&self) -> ItemKind {
        match self {
            Payload::Text(_) => ItemKind::Text,
            Payload::File(_) => ItemKind::File,
        }
    }

    /// True when there is nothing to send (blank text or empty file)
    pub fn is_empty(&self) -> bool {
        match self {
            Payload::Text(text) => text.trim().is_empty(),
            Payload::File(file) => file.bytes.is_empty(),
        }
    }
}

/// A unit of user input owned by the submission queue until drained
#[derive(Clone, Debug)]
pub struct WorkItem {
    /// Item ID
    pub id: ItemId,
    /// What the user submitted
    pub payload: Payload,
    /// Current status
    pub status: ItemStatus,
    /// Display label (file name, or truncated text)
    pub label: String,
    /// When the item was enqueued
    pub queued_at: DateTime<Utc>,
}

impl WorkItem {
    /// Kind of the item
    pub fn kind(&self) -> ItemKind {
        self.payload.kind()
    }

    /// File name for file items
    pub fn file_name(&self) -> Option<&str> {
        match &self.payload {
            Payload::File(file) => Some(&file.name),
            Payload::Text(_) => None,
        }
    }
}

/// Build the display label for a payload
///
/// Text is truncated on a character boundary to `max_chars` with a trailing
/// ellipsis; files use their name.
pub fn label_for(payload: &Payload, max_chars: usize) -> String {
    match payload {
        Payload::File(file) => file.name.clone(),
        Payload::Text(text) => {
            let text = text.trim();
            if text.chars().count() <= max_chars {
                text.to_string()
            } else {
                let truncated: String = text.chars().take(max_chars).collect();
                format!("{}…", truncated.trim_end())
            }
        }
    }
}

/// One case returned by semantic search
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RetrievedCase {
    /// Case identifier
    #[serde(rename = "Case ID", deserialize_with = "string_or_number")]
    pub case_id: String,
    /// Cosine similarity reported by the search backend
    #[serde(rename = "Similarity Score", default)]
    pub similarity_score: f64,
    /// Short preview of the case text
    #[serde(rename = "Text Preview", default)]
    pub text_preview: String,
    /// Full case text (exportable)
    #[serde(rename = "Full Text", default)]
    pub full_text: String,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number for case id, got {}",
            other
        ))),
    }
}

/// Result log entry variants
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntryKind {
    /// What was submitted
    Echo {
        /// Label of the originating work item
        label: String,
    },
    /// What came back
    Outcome {
        /// Textual result
        text: String,
        /// Label of the originating work item
        source_label: String,
        /// Structured search results (empty for other operations)
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        cases: Vec<RetrievedCase>,
    },
    /// Remote call failed
    OutcomeError {
        /// User-safe failure message
        message: String,
        /// Label of the originating work item
        source_label: String,
    },
}

/// Immutable record in the result log
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Entry ID (position in the log)
    pub id: EntryId,
    /// Work item this entry belongs to
    pub item_id: ItemId,
    /// When the entry was appended
    pub recorded_at: DateTime<Utc>,
    /// Entry content
    #[serde(flatten)]
    pub kind: EntryKind,
}

impl LogEntry {
    /// Exportable text (only outcome entries carry any)
    pub fn outcome_text(&self) -> Option<&str> {
        match &self.kind {
            EntryKind::Outcome { text, .. } => Some(text),
            _ => None,
        }
    }

    /// True for echo entries
    pub fn is_echo(&self) -> bool {
        matches!(self.kind, EntryKind::Echo { .. })
    }
}

/// Totals for one pipeline run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Items drained from the queue
    pub processed: usize,
    /// Items that produced an outcome
    pub succeeded: usize,
    /// Items that produced an error entry
    pub failed: usize,
}

/// Event emitted by a workspace
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Item accepted into the submission queue
    ItemQueued {
        /// Item ID
        id: ItemId,
        /// Display label
        label: String,
    },

    /// Queued item removed by the user
    ItemRemoved {
        /// Item ID
        id: ItemId,
    },

    /// Queue emptied on a submission-mode switch
    QueueCleared {
        /// Number of discarded items
        discarded: usize,
    },

    /// Runner started the remote call for an item
    ItemStarted {
        /// Item ID
        id: ItemId,
        /// Operation being invoked
        operation: OperationKind,
    },

    /// Upload progress update (ephemeral, not logged)
    Progress {
        /// Item ID
        id: ItemId,
        /// Percent uploaded (0 to 100)
        percent: u8,
    },

    /// Item produced an outcome
    ItemCompleted {
        /// Item ID
        id: ItemId,
    },

    /// Item produced an error entry
    ItemFailed {
        /// Item ID
        id: ItemId,
        /// User-safe error message
        error: String,
    },

    /// Entry appended to the result log
    EntryAppended {
        /// Entry ID
        entry_id: EntryId,
    },

    /// Runner drained the queue
    RunFinished {
        /// Totals for the run
        summary: RunSummary,
    },
}
