//! Mock Legalytics backend and identity provider on a single wiremock server

use legalytics_client::{Config, RetryConfig};
use secrecy::SecretString;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// API key the mock identity provider expects on every call
pub const API_KEY: &str = "test-key";

/// A wiremock server playing both the analysis backend and the identity provider
pub struct MockBackend {
    pub server: MockServer,
}

impl MockBackend {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// Client configuration pointing every endpoint at this server
    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config.endpoints.backend_url = self.uri();
        config.endpoints.chat_url = self.uri();
        config.endpoints.request_timeout = Duration::from_secs(5);
        config.endpoints.upload_chunk_size = 8;
        config.identity.base_url = format!("{}/v1", self.uri());
        config.identity.api_key = Some(SecretString::new(API_KEY.to_string()));
        config.identity.retry = RetryConfig {
            max_attempts: 2,
            initial_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(20),
            backoff_multiplier: 2.0,
            jitter: false,
        };
        config
    }

    fn accounts(&self, action: &str) -> wiremock::MockBuilder {
        Mock::given(method("POST"))
            .and(path(format!("/v1/accounts:{}", action)))
            .and(query_param("key", API_KEY))
    }

    pub async fn mount_sign_up(&self, email: &str) {
        self.accounts("signUp")
            .and(body_partial_json(json!({ "email": email })))
            .respond_with(token_response("uid-1", email))
            .mount(&self.server)
            .await;
    }

    pub async fn mount_sign_in(&self, email: &str) {
        self.accounts("signInWithPassword")
            .and(body_partial_json(json!({ "email": email })))
            .respond_with(token_response("uid-1", email))
            .mount(&self.server)
            .await;
    }

    /// `sendOobCode` for the given request type, answered with the given status
    pub async fn mount_oob_code(&self, request_type: &str, error: Option<&str>) {
        let response = match error {
            Some(message) => provider_error(message),
            None => ResponseTemplate::new(200).set_body_json(json!({ "kind": "identitytoolkit#GetOobConfirmationCodeResponse" })),
        };
        self.accounts("sendOobCode")
            .and(body_partial_json(json!({ "requestType": request_type })))
            .respond_with(response)
            .mount(&self.server)
            .await;
    }

    /// Account lookup reporting unverified for the first `unverified_times`
    /// calls and verified afterwards
    pub async fn mount_lookup(&self, email: &str, unverified_times: u64) {
        if unverified_times > 0 {
            self.accounts("lookup")
                .respond_with(lookup_response(email, false))
                .up_to_n_times(unverified_times)
                .with_priority(1)
                .mount(&self.server)
                .await;
        }
        self.accounts("lookup")
            .respond_with(lookup_response(email, true))
            .mount(&self.server)
            .await;
    }

    /// Summarize endpoint answering uploads named `filename`
    pub async fn mount_summary(&self, filename: &str, response: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path("/summarize"))
            .and(body_string_contains(format!("filename=\"{}\"", filename)))
            .respond_with(response)
            .mount(&self.server)
            .await;
    }

    pub async fn mount_prediction(&self, decision: &str) {
        Mock::given(method("POST"))
            .and(path("/api/bail-prediction"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "bail_decision": decision })),
            )
            .mount(&self.server)
            .await;
    }
}

fn token_response(local_id: &str, email: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "localId": local_id,
        "email": email,
        "idToken": format!("id-token-{}", local_id),
        "refreshToken": "refresh-token",
        "expiresIn": "3600"
    }))
}

fn lookup_response(email: &str, verified: bool) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "users": [{ "localId": "uid-1", "email": email, "emailVerified": verified }]
    }))
}

/// Identity provider error envelope
pub fn provider_error(message: &str) -> ResponseTemplate {
    ResponseTemplate::new(400).set_body_json(json!({
        "error": { "code": 400, "message": message, "errors": [] }
    }))
}

/// Minimal PDF-looking upload body
pub fn pdf_bytes(label: &str) -> Vec<u8> {
    format!("%PDF-1.7\n{}\n%%EOF", label).into_bytes()
}
