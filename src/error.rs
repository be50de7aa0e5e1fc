//! Error types for legalytics-client
//!
//! This module provides the error taxonomy used across the crate:
//! - Validation errors, raised before anything is enqueued
//! - Authentication errors from the credential gate
//! - Remote errors, captured per work item and folded into the result log
//! - Export, queue and log lookup errors
//!
//! Every error exposes a machine-readable code via [`Error::error_code`] so an
//! embedding UI can branch on it (e.g. route `unverified_email` to the
//! verification flow instead of showing a generic failure).

use thiserror::Error;

/// Result type alias for legalytics-client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for legalytics-client
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "endpoints.backend_url")
        key: Option<String>,
    },

    /// Input rejected before it reached the submission queue
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Authentication or session error
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Submission queue operation failed
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    /// Remote operation failed
    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    /// Export failed
    #[error("export error: {0}")]
    Export(#[from] ExportError),

    /// Result log lookup failed
    #[error("result log error: {0}")]
    Log(#[from] LogError),

    /// I/O error (reading files to submit)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Input validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Neither text nor file content was provided
    #[error("submission is empty: provide text or a file")]
    EmptySubmission,

    /// File extension is not in the accepted list
    #[error("unsupported file type: {name}")]
    UnsupportedFileType {
        /// The rejected file name
        name: String,
    },

    /// A file with the same name is already waiting or being processed
    #[error("file {name} is already queued")]
    DuplicateItem {
        /// The duplicated file name
        name: String,
    },

    /// Email address is malformed
    #[error("invalid email address: {0}")]
    InvalidEmail(String),
}

/// Authentication errors surfaced by the credential gate
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Password does not meet the provider's strength requirements
    #[error("password is too weak")]
    WeakPassword,

    /// An account with this email already exists
    #[error("email address is already in use")]
    EmailInUse,

    /// Email/password combination was rejected
    #[error("invalid email or password")]
    InvalidCredentials,

    /// Credentials were valid but the email address has not been verified
    #[error("email not verified, please check your inbox")]
    UnverifiedEmail,

    /// User dismissed the federated sign-in popup
    #[error("sign-in popup was cancelled")]
    PopupCancelled,

    /// No account exists for this email
    #[error("no account found for this email")]
    UnknownEmail,

    /// Operation needs a signed-in session
    #[error("no active session")]
    NoActiveSession,

    /// Provider throttled the request
    #[error("too many attempts, try again later")]
    RateLimited,

    /// Email sign-in link is invalid or expired
    #[error("sign-in link is invalid or expired")]
    InvalidLink,

    /// Operation requires a verified session
    #[error("a verified session is required")]
    NotVerified,

    /// Transport failure talking to the identity provider
    #[error("network error: {0}")]
    Network(String),

    /// Any other provider-reported failure
    #[error("identity provider error: {0}")]
    Provider(String),
}

/// Submission queue errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// No queued item with this ID
    #[error("item {id} not found")]
    ItemNotFound {
        /// The item ID that was not found
        id: u64,
    },

    /// Item already left the queue and is being processed
    #[error("item {id} is already being processed")]
    AlreadyProcessing {
        /// The in-flight item ID
        id: u64,
    },
}

/// Failures of a single remote call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// Connection, DNS, TLS or timeout failure
    #[error("network error: {0}")]
    Network(String),

    /// Endpoint answered with a non-2xx status
    #[error("endpoint returned {status}: {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Message extracted from the error body, if any
        message: String,
    },

    /// Response body did not have the expected shape
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Operation cannot send this kind of payload (e.g. a file to the chat endpoint)
    #[error("unsupported payload: {0}")]
    UnsupportedPayload(String),

    /// Call was cancelled before it finished
    #[error("request cancelled")]
    Cancelled,
}

impl RemoteError {
    /// Message safe to show to the end user and to store in the result log
    ///
    /// Transport details (hosts, TLS errors) stay in the tracing output; the user
    /// gets a short explanation plus whatever message the endpoint itself chose to
    /// return.
    pub fn user_message(&self) -> String {
        match self {
            RemoteError::Network(_) => {
                "Could not reach the service. Please try again later.".to_string()
            }
            RemoteError::Status { message, .. } if !message.is_empty() => message.clone(),
            RemoteError::Status { status, .. } => {
                format!("The service returned an error (HTTP {}).", status)
            }
            RemoteError::MalformedResponse(_) => {
                "The service returned an unexpected response.".to_string()
            }
            RemoteError::UnsupportedPayload(_) => {
                "This operation does not accept this kind of input.".to_string()
            }
            RemoteError::Cancelled => "Request cancelled".to_string(),
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            RemoteError::MalformedResponse(e.to_string())
        } else {
            RemoteError::Network(e.to_string())
        }
    }
}

/// Export errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExportError {
    /// Format tag is not one of txt/plain/text, pdf, docx (only with the `reject` policy)
    #[error("unsupported export format: {0}")]
    UnsupportedFormat(String),

    /// Log entry carries no exportable text (echo or error entry, or bad case index)
    #[error("entry {entry_id} has no exportable text")]
    NotExportable {
        /// The log entry ID
        entry_id: u64,
    },

    /// Document converter failed
    #[error("conversion to {format} failed: {reason}")]
    Conversion {
        /// Target format
        format: String,
        /// Converter-reported reason
        reason: String,
    },
}

/// Result log lookup errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LogError {
    /// No entry with this ID
    #[error("entry {id} not found")]
    EntryNotFound {
        /// The entry ID that was not found
        id: u64,
    },
}

impl Error {
    /// Machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Validation(ValidationError::EmptySubmission) => "empty_submission",
            Error::Validation(ValidationError::UnsupportedFileType { .. }) => {
                "unsupported_file_type"
            }
            Error::Validation(ValidationError::DuplicateItem { .. }) => "duplicate_item",
            Error::Validation(ValidationError::InvalidEmail(_)) => "invalid_email",
            Error::Auth(AuthError::WeakPassword) => "weak_password",
            Error::Auth(AuthError::EmailInUse) => "email_in_use",
            Error::Auth(AuthError::InvalidCredentials) => "invalid_credentials",
            Error::Auth(AuthError::UnverifiedEmail) => "unverified_email",
            Error::Auth(AuthError::PopupCancelled) => "popup_cancelled",
            Error::Auth(AuthError::UnknownEmail) => "unknown_email",
            Error::Auth(AuthError::NoActiveSession) => "no_active_session",
            Error::Auth(AuthError::RateLimited) => "rate_limited",
            Error::Auth(AuthError::InvalidLink) => "invalid_link",
            Error::Auth(AuthError::NotVerified) => "not_verified",
            Error::Auth(AuthError::Network(_)) => "network_error",
            Error::Auth(AuthError::Provider(_)) => "provider_error",
            Error::Queue(QueueError::ItemNotFound { .. }) => "item_not_found",
            Error::Queue(QueueError::AlreadyProcessing { .. }) => "already_processing",
            Error::Remote(_) => "remote_error",
            Error::Export(ExportError::UnsupportedFormat(_)) => "unsupported_format",
            Error::Export(ExportError::NotExportable { .. }) => "not_exportable",
            Error::Export(ExportError::Conversion { .. }) => "conversion_failed",
            Error::Log(LogError::EntryNotFound { .. }) => "entry_not_found",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
        }
    }
}
