//! HTTP implementation of [`RemoteOp`].

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::multipart::{Form, Part};

use super::response::{error_message, parse_success};
use super::{OperationOutput, ProgressSink, RemoteOp, percent};
use crate::config::EndpointConfig;
use crate::error::{Error, RemoteError, Result};
use crate::types::{FileUpload, OperationKind, Payload};

/// Calls one Legalytics endpoint over HTTP
///
/// Search and summarize are posted as `multipart/form-data` (a `text` field,
/// plus a streamed `file` part for uploads). Prediction and chat are posted as
/// JSON and only accept text.
#[derive(Clone, Debug)]
pub struct HttpRemoteOp {
    client: reqwest::Client,
    kind: OperationKind,
    url: String,
    chunk_size: usize,
}

impl HttpRemoteOp {
    /// Build the operation for `kind` from endpoint configuration
    ///
    /// # Errors
    /// Returns a configuration error if the HTTP client cannot be created
    pub fn new(kind: OperationKind, config: &EndpointConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("legalytics-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Config {
                message: format!("failed to create HTTP client: {}", e),
                key: Some("endpoints".to_string()),
            })?;

        let (base, path) = match kind {
            OperationKind::Search => (&config.backend_url, &config.search_path),
            OperationKind::Summarize => (&config.backend_url, &config.summarize_path),
            OperationKind::Predict => (&config.backend_url, &config.predict_path),
            OperationKind::Chat => (&config.chat_url, &config.chat_path),
        };

        Ok(Self {
            client,
            kind,
            url: join_url(base, path),
            chunk_size: config.upload_chunk_size.max(1),
        })
    }

    /// Case search endpoint
    pub fn search(config: &EndpointConfig) -> Result<Self> {
        Self::new(OperationKind::Search, config)
    }

    /// Summarization endpoint
    pub fn summarize(config: &EndpointConfig) -> Result<Self> {
        Self::new(OperationKind::Summarize, config)
    }

    /// Bail prediction endpoint
    pub fn predict(config: &EndpointConfig) -> Result<Self> {
        Self::new(OperationKind::Predict, config)
    }

    /// Chat endpoint
    pub fn chat(config: &EndpointConfig) -> Result<Self> {
        Self::new(OperationKind::Chat, config)
    }

    /// Full URL this operation posts to
    pub fn url(&self) -> &str {
        &self.url
    }

    fn request(
        &self,
        payload: &Payload,
        progress: ProgressSink,
    ) -> std::result::Result<reqwest::RequestBuilder, RemoteError> {
        if let Payload::File(file) = payload
            && !self.kind.accepts_files()
        {
            return Err(RemoteError::UnsupportedPayload(format!(
                "{} does not accept file uploads ({})",
                self.kind, file.name
            )));
        }

        let request = self.client.post(&self.url);
        match (self.kind, payload) {
            (OperationKind::Predict, Payload::Text(text)) => {
                Ok(request.json(&serde_json::json!({ "text": text })))
            }
            (OperationKind::Chat, Payload::Text(text)) => {
                Ok(request.json(&serde_json::json!({ "message": text })))
            }
            (_, Payload::Text(text)) => {
                let form = Form::new().text("text", text.clone());
                Ok(request.multipart(form))
            }
            (_, Payload::File(file)) => {
                let part = self.file_part(file, progress)?;
                let form = Form::new().text("text", String::new()).part("file", part);
                Ok(request.multipart(form))
            }
        }
    }

    /// Streamed file part reporting upload progress as chunks are consumed
    fn file_part(
        &self,
        file: &FileUpload,
        progress: ProgressSink,
    ) -> std::result::Result<Part, RemoteError> {
        let total = file.bytes.len();
        let chunks: Vec<Vec<u8>> = file
            .bytes
            .chunks(self.chunk_size)
            .map(<[u8]>::to_vec)
            .collect();

        progress.report(0);
        let mut sent = 0usize;
        let stream = futures::stream::iter(chunks).map(move |chunk| {
            sent += chunk.len();
            progress.report(percent(sent, total));
            Ok::<_, std::io::Error>(chunk)
        });

        Part::stream_with_length(reqwest::Body::wrap_stream(stream), total as u64)
            .file_name(file.name.clone())
            .mime_str(&file.mime_type)
            .map_err(|e| RemoteError::UnsupportedPayload(format!("invalid MIME type: {}", e)))
    }
}

#[async_trait]
impl RemoteOp for HttpRemoteOp {
    fn kind(&self) -> OperationKind {
        self.kind
    }

    async fn call(
        &self,
        payload: &Payload,
        progress: ProgressSink,
    ) -> std::result::Result<OperationOutput, RemoteError> {
        let request = self.request(payload, progress)?;

        tracing::debug!(operation = %self.kind, url = %self.url, "sending request");

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                tracing::warn!(operation = %self.kind, url = %self.url, "request timed out");
            } else {
                tracing::warn!(operation = %self.kind, url = %self.url, error = %e, "request failed");
            }
            RemoteError::from(e)
        })?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = error_message(&body);
            tracing::warn!(
                operation = %self.kind,
                status = status.as_u16(),
                message = %message,
                "endpoint returned error status"
            );
            return Err(RemoteError::Status {
                status: status.as_u16(),
                message,
            });
        }

        parse_success(self.kind, status.as_u16(), &body)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use wiremock::matchers::{body_json, body_string_contains, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn endpoints(server: &MockServer) -> EndpointConfig {
        EndpointConfig {
            backend_url: server.uri(),
            chat_url: server.uri(),
            request_timeout: Duration::from_secs(5),
            upload_chunk_size: 4,
            ..Default::default()
        }
    }

    #[test]
    fn test_join_url() {
        assert_eq!(
            join_url("http://localhost:8000/", "/api/search"),
            "http://localhost:8000/api/search"
        );
        assert_eq!(
            join_url("http://localhost:8000", "summarize"),
            "http://localhost:8000/summarize"
        );
    }

    #[tokio::test]
    async fn test_predict_posts_json_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/bail-prediction"))
            .and(body_json(serde_json::json!({ "text": "Accused has no prior record" })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "bail_decision": "Bail likely" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let op = HttpRemoteOp::predict(&endpoints(&server)).unwrap();
        let output = op
            .call(
                &Payload::Text("Accused has no prior record".into()),
                ProgressSink::noop(),
            )
            .await
            .unwrap();
        assert_eq!(output.text, "Bail likely");
    }

    #[tokio::test]
    async fn test_chat_posts_message_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chatbot"))
            .and(body_json(serde_json::json!({ "message": "What is anticipatory bail?" })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "response": "Bail sought before arrest." })),
            )
            .mount(&server)
            .await;

        let op = HttpRemoteOp::chat(&endpoints(&server)).unwrap();
        let output = op
            .call(
                &Payload::Text("What is anticipatory bail?".into()),
                ProgressSink::noop(),
            )
            .await
            .unwrap();
        assert_eq!(output.text, "Bail sought before arrest.");
    }

    #[tokio::test]
    async fn test_summarize_streams_file_with_progress() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/summarize"))
            .and(header_exists("content-type"))
            .and(body_string_contains("filename=\"judgment.pdf\""))
            .and(body_string_contains("%PDF-1.4 body"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "summary": "Appeal allowed." })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let sink = ProgressSink::new(move |p| seen_clone.lock().unwrap().push(p));

        let op = HttpRemoteOp::summarize(&endpoints(&server)).unwrap();
        let file = FileUpload::new("judgment.pdf", b"%PDF-1.4 body".to_vec());
        let output = op.call(&Payload::File(file), sink).await.unwrap();

        assert_eq!(output.text, "Appeal allowed.");
        let seen = seen.lock().unwrap();
        assert_eq!(seen.first(), Some(&0));
        assert_eq!(seen.last(), Some(&100));
        assert!(seen.windows(2).all(|w| w[0] <= w[1]), "progress must not decrease: {:?}", seen);
    }

    #[tokio::test]
    async fn test_search_text_is_multipart() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/search"))
            .and(body_string_contains("name=\"text\""))
            .and(body_string_contains("murder bail high court"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "retrieved_cases": [
                    {"Case ID": "A1", "Similarity Score": 0.9, "Text Preview": "p", "Full Text": "full"}
                ]
            })))
            .mount(&server)
            .await;

        let op = HttpRemoteOp::search(&endpoints(&server)).unwrap();
        let output = op
            .call(
                &Payload::Text("murder bail high court".into()),
                ProgressSink::noop(),
            )
            .await
            .unwrap();
        assert_eq!(output.cases.len(), 1);
        assert_eq!(output.cases[0].full_text, "full");
    }

    #[tokio::test]
    async fn test_error_status_carries_endpoint_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/summarize"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_json(serde_json::json!({ "error": "PDF could not be parsed" })),
            )
            .mount(&server)
            .await;

        let op = HttpRemoteOp::summarize(&endpoints(&server)).unwrap();
        let err = op
            .call(
                &Payload::File(FileUpload::new("a.pdf", b"%PDF".to_vec())),
                ProgressSink::noop(),
            )
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RemoteError::Status {
                status: 500,
                message: "PDF could not be parsed".into()
            }
        );
    }

    #[tokio::test]
    async fn test_file_rejected_by_text_only_operation() {
        let server = MockServer::start().await;
        let op = HttpRemoteOp::chat(&endpoints(&server)).unwrap();
        let err = op
            .call(
                &Payload::File(FileUpload::new("a.pdf", b"%PDF".to_vec())),
                ProgressSink::noop(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::UnsupportedPayload(_)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_network_error() {
        let config = EndpointConfig {
            backend_url: "http://127.0.0.1:1".to_string(),
            request_timeout: Duration::from_secs(2),
            ..Default::default()
        };
        let op = HttpRemoteOp::predict(&config).unwrap();
        let err = op
            .call(&Payload::Text("x".into()), ProgressSink::noop())
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::Network(_)));
    }
}
