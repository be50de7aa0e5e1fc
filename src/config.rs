//! Configuration types for legalytics-client

use crate::error::{Error, Result};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Remote endpoint configuration
///
/// The backend hosts search, summarization and bail prediction; the chat
/// endpoint lives on the web frontend's API route.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Inference backend base URL (default: "http://localhost:8000")
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// Chat endpoint base URL (default: "http://localhost:3000")
    #[serde(default = "default_chat_url")]
    pub chat_url: String,

    /// Path of the case search endpoint (default: "/api/search")
    #[serde(default = "default_search_path")]
    pub search_path: String,

    /// Path of the summarization endpoint (default: "/summarize")
    #[serde(default = "default_summarize_path")]
    pub summarize_path: String,

    /// Path of the bail prediction endpoint (default: "/api/bail-prediction")
    #[serde(default = "default_predict_path")]
    pub predict_path: String,

    /// Path of the chat endpoint (default: "/api/chatbot")
    #[serde(default = "default_chat_path")]
    pub chat_path: String,

    /// Per-request timeout (default: 120 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// Upload chunk size used for progress reporting (default: 64 KiB)
    #[serde(default = "default_upload_chunk_size")]
    pub upload_chunk_size: usize,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            chat_url: default_chat_url(),
            search_path: default_search_path(),
            summarize_path: default_summarize_path(),
            predict_path: default_predict_path(),
            chat_path: default_chat_path(),
            request_timeout: default_request_timeout(),
            upload_chunk_size: default_upload_chunk_size(),
        }
    }
}

/// Identity provider and access routing configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Identity Toolkit REST base URL
    #[serde(default = "default_identity_url")]
    pub base_url: String,

    /// Project web API key (never serialized back out)
    #[serde(default, skip_serializing)]
    pub api_key: Option<SecretString>,

    /// Minimum password length checked before calling the provider (default: 6)
    #[serde(default = "default_min_password_length")]
    pub min_password_length: usize,

    /// Report unknown emails on password reset instead of pretending success (default: false)
    #[serde(default)]
    pub reveal_unknown_email: bool,

    /// Route of the login page (default: "/login")
    #[serde(default = "default_login_route")]
    pub login_route: String,

    /// Route of the email verification page (default: "/verify-email")
    #[serde(default = "default_verify_email_route")]
    pub verify_email_route: String,

    /// Route of the home page (default: "/")
    #[serde(default = "default_home_route")]
    pub home_route: String,

    /// Retry policy for idempotent identity reads
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            base_url: default_identity_url(),
            api_key: None,
            min_password_length: default_min_password_length(),
            reveal_unknown_email: false,
            login_route: default_login_route(),
            verify_email_route: default_verify_email_route(),
            home_route: default_home_route(),
            retry: RetryConfig::default(),
        }
    }
}

/// Submission pipeline configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Maximum remote calls in flight (default: 1 = strictly sequential)
    ///
    /// Values above 1 switch the result log to completion-order appends: an
    /// item's echo and outcome are appended together when its call finishes.
    #[serde(default = "default_max_concurrent_calls")]
    pub max_concurrent_calls: usize,

    /// Accepted upload extensions, lowercase without dot (default: ["pdf"])
    #[serde(default = "default_accepted_extensions")]
    pub accepted_extensions: Vec<String>,

    /// Maximum characters of text shown in an echo label (default: 48)
    #[serde(default = "default_label_max_chars")]
    pub label_max_chars: usize,

    /// Event channel capacity (default: 1000)
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_calls: default_max_concurrent_calls(),
            accepted_extensions: default_accepted_extensions(),
            label_max_chars: default_label_max_chars(),
            event_buffer: default_event_buffer(),
        }
    }
}

/// What to do with an export format tag that is not recognized
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownFormatPolicy {
    /// Export as plain text (default)
    #[default]
    FallbackToPlain,
    /// Fail with `ExportError::UnsupportedFormat`
    Reject,
}

/// Export configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Unknown format handling
    #[serde(default)]
    pub unknown_format: UnknownFormatPolicy,

    /// File stem for exported case text (default: "case_full_text")
    #[serde(default = "default_export_stem")]
    pub default_stem: String,

    /// File stem for exported summaries (default: "case_summary")
    #[serde(default = "default_summary_stem")]
    pub summary_stem: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            unknown_format: UnknownFormatPolicy::default(),
            default_stem: default_export_stem(),
            summary_stem: default_summary_stem(),
        }
    }
}

/// Retry configuration for transient failures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 10 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// Main configuration for a [`Workspace`](crate::Workspace)
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote endpoints
    #[serde(default)]
    pub endpoints: EndpointConfig,

    /// Identity provider and routing
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Submission pipeline
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Export codec
    #[serde(default)]
    pub export: ExportConfig,
}

impl Config {
    /// Parse a JSON configuration document, filling unspecified fields with defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check URLs and limits
    pub fn validate(&self) -> Result<()> {
        check_url(&self.endpoints.backend_url, "endpoints.backend_url")?;
        check_url(&self.endpoints.chat_url, "endpoints.chat_url")?;
        check_url(&self.identity.base_url, "identity.base_url")?;

        if self.pipeline.max_concurrent_calls == 0 {
            return Err(config_error(
                "max_concurrent_calls must be at least 1",
                "pipeline.max_concurrent_calls",
            ));
        }
        if self.pipeline.event_buffer == 0 {
            return Err(config_error(
                "event_buffer must be at least 1",
                "pipeline.event_buffer",
            ));
        }
        if self.endpoints.upload_chunk_size == 0 {
            return Err(config_error(
                "upload_chunk_size must be at least 1",
                "endpoints.upload_chunk_size",
            ));
        }
        if self.pipeline.accepted_extensions.is_empty() {
            return Err(config_error(
                "at least one accepted file extension is required",
                "pipeline.accepted_extensions",
            ));
        }
        Ok(())
    }
}

fn check_url(value: &str, key: &str) -> Result<()> {
    let parsed = url::Url::parse(value)
        .map_err(|e| config_error(format!("invalid URL '{}': {}", value, e), key))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(config_error(
            format!("unsupported URL scheme '{}' in '{}'", other, value),
            key,
        )),
    }
}

fn config_error(message: impl Into<String>, key: &str) -> Error {
    Error::Config {
        message: message.into(),
        key: Some(key.to_string()),
    }
}

fn default_backend_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_chat_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_search_path() -> String {
    "/api/search".to_string()
}

fn default_summarize_path() -> String {
    "/summarize".to_string()
}

fn default_predict_path() -> String {
    "/api/bail-prediction".to_string()
}

fn default_chat_path() -> String {
    "/api/chatbot".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_upload_chunk_size() -> usize {
    64 * 1024
}

fn default_identity_url() -> String {
    "https://identitytoolkit.googleapis.com/v1".to_string()
}

fn default_min_password_length() -> usize {
    6
}

fn default_login_route() -> String {
    "/login".to_string()
}

fn default_verify_email_route() -> String {
    "/verify-email".to_string()
}

fn default_home_route() -> String {
    "/".to_string()
}

fn default_max_concurrent_calls() -> usize {
    1
}

fn default_accepted_extensions() -> Vec<String> {
    vec!["pdf".to_string()]
}

fn default_label_max_chars() -> usize {
    48
}

fn default_event_buffer() -> usize {
    1000
}

fn default_export_stem() -> String {
    "case_full_text".to_string()
}

fn default_summary_stem() -> String {
    "case_summary".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(10)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
