//! Shared test helpers: a scriptable identity provider, a scriptable remote
//! operation and workspace builders.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;
use tokio::sync::broadcast;

use super::Workspace;
use crate::config::{Config, RetryConfig};
use crate::error::{AuthError, RemoteError};
use crate::identity::{Identity, IdentityProvider, SignInMethod};
use crate::remote::{OperationOutput, ProgressSink, RemoteOp};
use crate::types::{FileUpload, OperationKind, Payload};

pub(crate) const TEST_EMAIL: &str = "advocate@example.com";
pub(crate) const TEST_PASSWORD: &str = "s3cret-pass";
pub(crate) const ROTATED_ID_TOKEN: &str = "rotated-id-token";

pub(crate) fn test_identity(email: &str, verified: bool, method: SignInMethod) -> Identity {
    Identity {
        id: format!("uid-{}", email),
        email: email.to_string(),
        email_verified: verified,
        method,
        id_token: SecretString::new("test-id-token".to_string()),
        refresh_token: Some(SecretString::new("test-refresh-token".to_string())),
    }
}

/// In-memory identity provider with switchable behavior
///
/// - `taken@example.com` is already registered
/// - password `wrong` is rejected
/// - addresses starting with `unknown` have no account
pub(crate) struct MockIdentityProvider {
    pub(crate) verified_on_sign_in: AtomicBool,
    pub(crate) verified_on_reload: AtomicBool,
    pub(crate) popup_cancelled: AtomicBool,
    pub(crate) fail_sign_out: AtomicBool,
    pub(crate) fail_verification_email: AtomicBool,
    /// Number of reloads that fail with a network error before succeeding
    pub(crate) reload_failures: AtomicU32,
    pub(crate) reload_calls: AtomicUsize,
    pub(crate) sign_out_calls: AtomicUsize,
    pub(crate) verification_emails: AtomicUsize,
    pub(crate) reset_emails: AtomicUsize,
    changes: Option<broadcast::Sender<Option<Identity>>>,
}

impl MockIdentityProvider {
    pub(crate) fn new() -> Self {
        Self {
            verified_on_sign_in: AtomicBool::new(true),
            verified_on_reload: AtomicBool::new(false),
            popup_cancelled: AtomicBool::new(false),
            fail_sign_out: AtomicBool::new(false),
            fail_verification_email: AtomicBool::new(false),
            reload_failures: AtomicU32::new(0),
            reload_calls: AtomicUsize::new(0),
            sign_out_calls: AtomicUsize::new(0),
            verification_emails: AtomicUsize::new(0),
            reset_emails: AtomicUsize::new(0),
            changes: None,
        }
    }

    /// Provider with a push-notification channel
    pub(crate) fn with_changes() -> (Self, broadcast::Sender<Option<Identity>>) {
        let (tx, _rx) = broadcast::channel(16);
        let mut provider = Self::new();
        provider.changes = Some(tx.clone());
        (provider, tx)
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn create_account(&self, email: &str, _password: &str) -> Result<Identity, AuthError> {
        if email == "taken@example.com" {
            return Err(AuthError::EmailInUse);
        }
        Ok(test_identity(email, false, SignInMethod::Password))
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        if password == "wrong" || email.starts_with("unknown") {
            return Err(AuthError::InvalidCredentials);
        }
        let verified = self.verified_on_sign_in.load(Ordering::SeqCst);
        Ok(test_identity(email, verified, SignInMethod::Password))
    }

    async fn authenticate_with_provider(&self) -> Result<Identity, AuthError> {
        if self.popup_cancelled.load(Ordering::SeqCst) {
            return Err(AuthError::PopupCancelled);
        }
        // Federated identities may report unverified; the gate treats them as verified
        Ok(test_identity("counsel@example.com", false, SignInMethod::Federated))
    }

    async fn authenticate_with_email_link(
        &self,
        email: &str,
        link: &str,
    ) -> Result<Identity, AuthError> {
        if !link.contains("oobCode=") {
            return Err(AuthError::InvalidLink);
        }
        Ok(test_identity(email, false, SignInMethod::EmailLink))
    }

    async fn send_verification_email(&self, _identity: &Identity) -> Result<(), AuthError> {
        if self.fail_verification_email.load(Ordering::SeqCst) {
            return Err(AuthError::RateLimited);
        }
        self.verification_emails.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), AuthError> {
        if email.starts_with("unknown") {
            return Err(AuthError::UnknownEmail);
        }
        self.reset_emails.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn reload(&self, identity: &Identity) -> Result<Identity, AuthError> {
        self.reload_calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.reload_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.reload_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(AuthError::Network("connection reset".to_string()));
        }
        let mut reloaded = identity.clone();
        reloaded.email_verified = self.verified_on_reload.load(Ordering::SeqCst);
        // A reload hands back a fresh ID token
        reloaded.id_token = SecretString::new(ROTATED_ID_TOKEN.to_string());
        Ok(reloaded)
    }

    async fn sign_out(&self, _identity: &Identity) -> Result<(), AuthError> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_sign_out.load(Ordering::SeqCst) {
            return Err(AuthError::Network("offline".to_string()));
        }
        Ok(())
    }

    fn identity_changes(&self) -> Option<broadcast::Receiver<Option<Identity>>> {
        self.changes.as_ref().map(|tx| tx.subscribe())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Scripted reply for one payload key
#[derive(Clone)]
pub(crate) struct Script {
    pub(crate) result: Result<OperationOutput, RemoteError>,
    pub(crate) delay: Duration,
}

/// Remote operation answering from a script keyed by file name or text
///
/// Unscripted payloads succeed with `"<kind>: <key>"`. File uploads report
/// 0, 50 and 100 percent progress. Call order and the peak number of
/// overlapping calls are recorded.
pub(crate) struct ScriptedOp {
    kind: OperationKind,
    scripts: Mutex<HashMap<String, Script>>,
    pub(crate) calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

/// Decrements the in-flight count even when the call future is dropped
struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ScriptedOp {
    pub(crate) fn new(kind: OperationKind) -> Self {
        Self {
            kind,
            scripts: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Highest number of calls that were running at the same time
    pub(crate) fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn succeed(self, key: &str, text: &str) -> Self {
        self.script(key, Ok(OperationOutput::text(text)), Duration::ZERO)
    }

    pub(crate) fn fail(self, key: &str, error: RemoteError) -> Self {
        self.script(key, Err(error), Duration::ZERO)
    }

    pub(crate) fn script(
        self,
        key: &str,
        result: Result<OperationOutput, RemoteError>,
        delay: Duration,
    ) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(key.to_string(), Script { result, delay });
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

fn payload_key(payload: &Payload) -> String {
    match payload {
        Payload::Text(text) => text.clone(),
        Payload::File(file) => file.name.clone(),
    }
}

#[async_trait]
impl RemoteOp for ScriptedOp {
    fn kind(&self) -> OperationKind {
        self.kind
    }

    async fn call(
        &self,
        payload: &Payload,
        progress: ProgressSink,
    ) -> Result<OperationOutput, RemoteError> {
        let key = payload_key(payload);
        self.calls.lock().unwrap().push(key.clone());

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);
        let _guard = InFlightGuard(&self.in_flight);

        if matches!(payload, Payload::File(_)) {
            progress.report(0);
            progress.report(50);
            progress.report(100);
        }

        let script = self.scripts.lock().unwrap().get(&key).cloned();
        match script {
            Some(script) => {
                if !script.delay.is_zero() {
                    tokio::time::sleep(script.delay).await;
                }
                script.result
            }
            None => Ok(OperationOutput::text(format!("{}: {}", self.kind, key))),
        }
    }
}

/// Config with fast retries for tests
pub(crate) fn test_config() -> Config {
    let mut config = Config::default();
    config.identity.retry = RetryConfig {
        max_attempts: 3,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        backoff_multiplier: 2.0,
        jitter: false,
    };
    config
}

/// Workspace signed in with a verified session
pub(crate) async fn create_verified_workspace_with(
    config: Config,
) -> (Workspace, Arc<MockIdentityProvider>) {
    let provider = Arc::new(MockIdentityProvider::new());
    let workspace = Workspace::new(config, provider.clone()).unwrap();
    workspace
        .gate()
        .sign_in(TEST_EMAIL, TEST_PASSWORD)
        .await
        .unwrap();
    (workspace, provider)
}

pub(crate) async fn create_verified_workspace() -> (Workspace, Arc<MockIdentityProvider>) {
    create_verified_workspace_with(test_config()).await
}

pub(crate) fn pdf(name: &str) -> FileUpload {
    FileUpload::new(name, format!("%PDF-1.4 {}", name).into_bytes())
}
