//! Credential gate: the session state machine in front of the workspace.
//!
//! ```text
//! Anonymous ──► Authenticating ──► AuthenticatedUnverified ──► AuthenticatedVerified
//!     ▲               │                      │                          │
//!     └───────────────┴──────── sign_out / failed exchange ─────────────┘
//! ```
//!
//! State lives behind one `RwLock`; every transition and its [`SessionEvent`]
//! happen while the write guard is held, so subscribers observe transitions
//! in the order they were applied.

mod access;

pub use access::{AccessPolicy, GateDecision};

use std::sync::{Arc, OnceLock};

use regex::Regex;
use tokio::sync::{RwLock, broadcast};
use tokio::task::JoinHandle;

use crate::config::IdentityConfig;
use crate::error::{AuthError, Result, ValidationError};
use crate::identity::{Identity, IdentityProvider};
use crate::retry::with_retry;

/// The identity the gate holds while signed in
pub type Session = Identity;

const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";
const SESSION_EVENT_BUFFER: usize = 64;

/// Authentication state of the client
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    /// No session
    #[default]
    Anonymous,
    /// A credential exchange is in progress
    Authenticating,
    /// Signed in, email not verified yet
    AuthenticatedUnverified(Session),
    /// Signed in with a verified email
    AuthenticatedVerified(Session),
}

impl SessionState {
    /// The session, if signed in
    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::AuthenticatedUnverified(s) | SessionState::AuthenticatedVerified(s) => {
                Some(s)
            }
            SessionState::Anonymous | SessionState::Authenticating => None,
        }
    }

    /// True only for a verified session
    pub fn is_verified(&self) -> bool {
        matches!(self, SessionState::AuthenticatedVerified(_))
    }

    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Anonymous => "anonymous",
            SessionState::Authenticating => "authenticating",
            SessionState::AuthenticatedUnverified(_) => "authenticated_unverified",
            SessionState::AuthenticatedVerified(_) => "authenticated_verified",
        }
    }

    fn for_identity(identity: Identity) -> Self {
        if identity.email_verified {
            SessionState::AuthenticatedVerified(identity)
        } else {
            SessionState::AuthenticatedUnverified(identity)
        }
    }
}

/// Notification sent to gate subscribers
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    /// The session state changed
    StateChanged {
        /// Previous state
        from: SessionState,
        /// New state
        to: SessionState,
    },
}

/// Wraps an [`IdentityProvider`] and owns the session state
///
/// Cheap to clone; clones share state and subscribers.
#[derive(Clone)]
pub struct CredentialGate {
    provider: Arc<dyn IdentityProvider>,
    config: Arc<IdentityConfig>,
    state: Arc<RwLock<SessionState>>,
    event_tx: broadcast::Sender<SessionEvent>,
}

impl std::fmt::Debug for CredentialGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialGate")
            .field("provider", &self.provider.name())
            .finish_non_exhaustive()
    }
}

impl CredentialGate {
    /// Create a gate in the `Anonymous` state
    pub fn new(provider: Arc<dyn IdentityProvider>, config: IdentityConfig) -> Self {
        let (event_tx, _rx) = broadcast::channel(SESSION_EVENT_BUFFER);
        Self {
            provider,
            config: Arc::new(config),
            state: Arc::new(RwLock::new(SessionState::Anonymous)),
            event_tx,
        }
    }

    /// Identity configuration (routes, password policy)
    pub fn config(&self) -> &IdentityConfig {
        &self.config
    }

    /// Current state (snapshot)
    pub async fn state(&self) -> SessionState {
        self.state.read().await.clone()
    }

    /// Current session, if signed in
    pub async fn session(&self) -> Option<Session> {
        self.state.read().await.session().cloned()
    }

    /// Subscribe to state changes
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    /// Create an account and send the verification email
    ///
    /// The gate ends in `AuthenticatedUnverified`. A failed verification email
    /// is logged; the user can ask for another with [`resend_verification`](Self::resend_verification).
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Session> {
        validate_email(email)?;
        if password.chars().count() < self.config.min_password_length {
            return Err(AuthError::WeakPassword.into());
        }

        self.transition(SessionState::Authenticating).await;
        let identity = match self.provider.create_account(email, password).await {
            Ok(identity) => identity,
            Err(e) => {
                self.transition(SessionState::Anonymous).await;
                return Err(e.into());
            }
        };

        if let Err(e) = self.provider.send_verification_email(&identity).await {
            tracing::warn!(user_id = %identity.id, error = %e, "failed to send verification email");
        }

        tracing::info!(user_id = %identity.id, "account created");
        self.transition(SessionState::for_identity(identity.clone()))
            .await;
        Ok(identity)
    }

    /// Sign in with email and password
    ///
    /// Unverified identities are signed out again immediately and the call fails
    /// with [`AuthError::UnverifiedEmail`]; the gate ends in `Anonymous`.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        validate_email(email)?;

        self.transition(SessionState::Authenticating).await;
        let identity = match self.provider.authenticate(email, password).await {
            Ok(identity) => identity,
            Err(e) => {
                tracing::debug!(error = %e, "sign-in rejected");
                self.transition(SessionState::Anonymous).await;
                return Err(e.into());
            }
        };

        if !identity.email_verified {
            if let Err(e) = self.provider.sign_out(&identity).await {
                tracing::warn!(user_id = %identity.id, error = %e, "failed to tear down unverified session");
            }
            self.transition(SessionState::Anonymous).await;
            tracing::info!(user_id = %identity.id, "sign-in refused, email not verified");
            return Err(AuthError::UnverifiedEmail.into());
        }

        tracing::info!(user_id = %identity.id, "signed in");
        self.transition(SessionState::AuthenticatedVerified(identity.clone()))
            .await;
        Ok(identity)
    }

    /// Federated sign-in; federated identities count as verified
    pub async fn sign_in_with_provider(&self) -> Result<Session> {
        self.transition(SessionState::Authenticating).await;
        match self.provider.authenticate_with_provider().await {
            Ok(mut identity) => {
                identity.email_verified = true;
                tracing::info!(user_id = %identity.id, provider = self.provider.name(), "signed in with federated provider");
                self.transition(SessionState::AuthenticatedVerified(identity.clone()))
                    .await;
                Ok(identity)
            }
            Err(e) => {
                self.transition(SessionState::Anonymous).await;
                Err(e.into())
            }
        }
    }

    /// Passwordless sign-in from an emailed link; the link proves the address
    pub async fn sign_in_with_email_link(&self, email: &str, link: &str) -> Result<Session> {
        validate_email(email)?;

        self.transition(SessionState::Authenticating).await;
        match self.provider.authenticate_with_email_link(email, link).await {
            Ok(mut identity) => {
                identity.email_verified = true;
                tracing::info!(user_id = %identity.id, "signed in with email link");
                self.transition(SessionState::AuthenticatedVerified(identity.clone()))
                    .await;
                Ok(identity)
            }
            Err(e) => {
                self.transition(SessionState::Anonymous).await;
                Err(e.into())
            }
        }
    }

    /// Ask the provider to send a password-reset email
    ///
    /// Unknown addresses succeed silently unless `reveal_unknown_email` is set.
    pub async fn request_password_reset(&self, email: &str) -> Result<()> {
        validate_email(email)?;

        match self.provider.send_password_reset(email).await {
            Ok(()) => Ok(()),
            Err(AuthError::UnknownEmail) if !self.config.reveal_unknown_email => {
                tracing::debug!("password reset requested for unknown address");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Re-send the verification email for the current session
    pub async fn resend_verification(&self) -> Result<()> {
        let session = self.session().await.ok_or(AuthError::NoActiveSession)?;
        self.provider.send_verification_email(&session).await?;
        tracing::info!(user_id = %session.id, "verification email sent");
        Ok(())
    }

    /// Reload the identity and promote the session once the email is verified
    ///
    /// Returns `Ok(false)` without a session. Transient provider failures are
    /// retried with backoff.
    pub async fn refresh_verification_status(&self) -> Result<bool> {
        let Some(session) = self.session().await else {
            return Ok(false);
        };
        if session.email_verified {
            return Ok(true);
        }

        let reloaded = with_retry(&self.config.retry, || self.provider.reload(&session)).await?;

        let mut state = self.state.write().await;
        // A sign-out or another sign-in may have happened during the reload
        if state.session().map(|s| s.id.as_str()) != Some(reloaded.id.as_str()) {
            return Ok(false);
        }
        let verified = reloaded.email_verified;
        self.replace_locked(&mut state, SessionState::for_identity(reloaded));
        if verified {
            tracing::info!(user_id = %session.id, "email verified");
        }
        Ok(verified)
    }

    /// Sign out; always succeeds locally
    pub async fn sign_out(&self) -> Result<()> {
        if let Some(session) = self.session().await {
            if let Err(e) = self.provider.sign_out(&session).await {
                tracing::warn!(user_id = %session.id, error = %e, "provider sign-out failed, clearing local session anyway");
            }
            tracing::info!(user_id = %session.id, "signed out");
        }
        self.transition(SessionState::Anonymous).await;
        Ok(())
    }

    /// Apply a provider push notification
    ///
    /// Ignored while a credential exchange is in progress; that exchange decides
    /// the outcome.
    pub async fn apply_identity_change(&self, change: Option<Identity>) {
        let mut state = self.state.write().await;
        if matches!(*state, SessionState::Authenticating) {
            tracing::debug!("ignoring identity change during credential exchange");
            return;
        }
        let next = match change {
            Some(identity) => SessionState::for_identity(identity),
            None => SessionState::Anonymous,
        };
        self.replace_locked(&mut state, next);
    }

    /// Forward provider push notifications into the gate
    ///
    /// Returns `None` if the provider has no notification channel.
    pub fn start_identity_listener(&self) -> Option<JoinHandle<()>> {
        let mut changes = self.provider.identity_changes()?;
        let gate = self.clone();
        Some(tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(change) => gate.apply_identity_change(change).await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "identity listener lagged behind provider notifications");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::debug!("identity notification channel closed");
                        break;
                    }
                }
            }
        }))
    }

    /// Decide whether a page at `current_path` may be shown under `policy`
    pub async fn check_access(&self, policy: AccessPolicy, current_path: &str) -> GateDecision {
        let state = self.state.read().await;
        access::decide(&state, policy, current_path)
    }

    /// Fail with [`AuthError::NotVerified`] unless the session is verified
    pub(crate) async fn require_verified(&self) -> Result<()> {
        if self.state.read().await.is_verified() {
            Ok(())
        } else {
            Err(AuthError::NotVerified.into())
        }
    }

    async fn transition(&self, to: SessionState) {
        let mut state = self.state.write().await;
        self.replace_locked(&mut state, to);
    }

    fn replace_locked(&self, state: &mut SessionState, to: SessionState) {
        // Equality ignores tokens; the new value is stored even when no event fires
        let from = std::mem::replace(state, to.clone());
        if from == to {
            return;
        }
        tracing::debug!(from = from.name(), to = to.name(), "session state changed");
        // No subscribers is fine
        self.event_tx
            .send(SessionEvent::StateChanged { from, to })
            .ok();
    }
}

/// Check an email address against `local@domain.tld`
pub(crate) fn validate_email(email: &str) -> std::result::Result<(), ValidationError> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    let valid = match PATTERN.get_or_init(|| Regex::new(EMAIL_PATTERN).ok()) {
        Some(re) => re.is_match(email.trim()),
        None => email.contains('@'),
    };
    if valid {
        Ok(())
    } else {
        Err(ValidationError::InvalidEmail(email.to_string()))
    }
}
