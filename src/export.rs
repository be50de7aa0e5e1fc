//! Export codec: logged text to a downloadable artifact.
//!
//! The codec only decides format, MIME type and file name. Binary encoding for
//! PDF and DOCX is delegated to a [`DocumentConverter`]; the default
//! [`PassthroughConverter`] writes the UTF-8 text unchanged, which is what the
//! web client has always produced.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{ExportConfig, UnknownFormatPolicy};
use crate::error::{ExportError, Result};

/// Supported export formats
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// UTF-8 plain text
    Plain,
    /// PDF document
    Pdf,
    /// Word document
    Docx,
}

impl ExportFormat {
    /// Parse a format tag as used by download menus ("txt", "pdf", "docx")
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "txt" | "plain" | "text" => Some(ExportFormat::Plain),
            "pdf" => Some(ExportFormat::Pdf),
            "docx" => Some(ExportFormat::Docx),
            _ => None,
        }
    }

    /// MIME type of the artifact
    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Plain => "text/plain",
            ExportFormat::Pdf => "application/pdf",
            ExportFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
        }
    }

    /// File extension without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Plain => "txt",
            ExportFormat::Pdf => "pdf",
            ExportFormat::Docx => "docx",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// A downloadable file, ready for the host's save mechanism
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artifact {
    /// File content
    pub bytes: Vec<u8>,
    /// MIME type tag
    pub mime_type: String,
    /// File name including extension
    pub filename: String,
}

/// Converts text into the binary encoding of a document format
#[async_trait]
pub trait DocumentConverter: Send + Sync {
    /// Encode `text` as `format`
    ///
    /// Never called for [`ExportFormat::Plain`].
    async fn convert(
        &self,
        text: &str,
        format: ExportFormat,
    ) -> std::result::Result<Vec<u8>, ExportError>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Writes the text bytes unchanged regardless of format
pub struct PassthroughConverter;

#[async_trait]
impl DocumentConverter for PassthroughConverter {
    async fn convert(
        &self,
        text: &str,
        _format: ExportFormat,
    ) -> std::result::Result<Vec<u8>, ExportError> {
        Ok(text.as_bytes().to_vec())
    }

    fn name(&self) -> &'static str {
        "passthrough"
    }
}

/// Text-to-artifact codec
#[derive(Clone)]
pub struct ExportCodec {
    converter: Arc<dyn DocumentConverter>,
    policy: UnknownFormatPolicy,
    default_stem: String,
}

impl std::fmt::Debug for ExportCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportCodec")
            .field("converter", &self.converter.name())
            .field("policy", &self.policy)
            .field("default_stem", &self.default_stem)
            .finish()
    }
}

impl ExportCodec {
    /// Codec with the passthrough converter
    pub fn new(config: &ExportConfig) -> Self {
        Self::with_converter(config, Arc::new(PassthroughConverter))
    }

    /// Codec with a custom converter for PDF/DOCX
    pub fn with_converter(config: &ExportConfig, converter: Arc<dyn DocumentConverter>) -> Self {
        Self {
            converter,
            policy: config.unknown_format,
            default_stem: config.default_stem.clone(),
        }
    }

    /// Map a format tag to a format according to the unknown-format policy
    pub fn resolve_format(&self, tag: &str) -> Result<ExportFormat> {
        match (ExportFormat::from_tag(tag), self.policy) {
            (Some(format), _) => Ok(format),
            (None, UnknownFormatPolicy::FallbackToPlain) => {
                tracing::debug!(tag, "unknown export format, falling back to plain text");
                Ok(ExportFormat::Plain)
            }
            (None, UnknownFormatPolicy::Reject) => {
                Err(ExportError::UnsupportedFormat(tag.to_string()).into())
            }
        }
    }

    /// Export `text` using the default file stem
    pub async fn export(&self, text: &str, tag: &str) -> Result<Artifact> {
        self.export_named(text, tag, &self.default_stem).await
    }

    /// Export `text` as `<stem>.<ext>`
    pub async fn export_named(&self, text: &str, tag: &str, stem: &str) -> Result<Artifact> {
        let format = self.resolve_format(tag)?;
        let bytes = match format {
            ExportFormat::Plain => text.as_bytes().to_vec(),
            other => self.converter.convert(text, other).await?,
        };

        Ok(Artifact {
            bytes,
            mime_type: format.mime_type().to_string(),
            filename: format!("{}.{}", stem, format.extension()),
        })
    }
}
