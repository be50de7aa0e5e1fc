//! Identity provider seam.
//!
//! The credential gate never talks to an identity service directly; it goes
//! through [`IdentityProvider`]. [`RestIdentityProvider`] implements the trait
//! over the Identity Toolkit REST API.

mod rest;

pub use rest::RestIdentityProvider;

use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::error::AuthError;

/// How an identity was established
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignInMethod {
    /// Email and password
    Password,
    /// Federated OAuth provider (popup flow)
    Federated,
    /// Passwordless email link
    EmailLink,
}

/// An authenticated identity as reported by the provider
///
/// Tokens are wrapped in [`SecretString`] so `Debug` output never contains them.
#[derive(Clone, Debug)]
pub struct Identity {
    /// Provider-assigned user ID
    pub id: String,
    /// Account email
    pub email: String,
    /// Whether the email address has been verified
    pub email_verified: bool,
    /// How the identity signed in
    pub method: SignInMethod,
    /// Short-lived ID token
    pub id_token: SecretString,
    /// Refresh token, when the provider issues one
    pub refresh_token: Option<SecretString>,
}

impl PartialEq for Identity {
    // Tokens rotate on every reload; identity equality ignores them
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.email == other.email
            && self.email_verified == other.email_verified
            && self.method == other.method
    }
}

impl Eq for Identity {}

/// OAuth credential obtained from a federated sign-in popup
#[derive(Clone, Debug)]
pub struct FederatedCredential {
    /// Provider identifier, e.g. `google.com`
    pub provider_id: String,
    /// OAuth ID token issued by that provider
    pub id_token: SecretString,
}

/// Source of federated OAuth credentials (the popup)
///
/// Returns `Ok(None)` when the user dismissed the popup.
#[async_trait]
pub trait FederatedTokenSource: Send + Sync {
    /// Run the interactive flow and return the provider's credential
    async fn obtain_credential(&self) -> Result<Option<FederatedCredential>, AuthError>;
}

/// External identity provider
///
/// Implementations map their own failure codes onto [`AuthError`]. The gate
/// owns all state transitions; providers only exchange credentials.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create an account; the returned identity is normally unverified
    async fn create_account(&self, email: &str, password: &str) -> Result<Identity, AuthError>;

    /// Exchange email and password for an identity
    async fn authenticate(&self, email: &str, password: &str) -> Result<Identity, AuthError>;

    /// Federated popup sign-in
    async fn authenticate_with_provider(&self) -> Result<Identity, AuthError>;

    /// Complete a passwordless sign-in from the link delivered by email
    async fn authenticate_with_email_link(
        &self,
        email: &str,
        link: &str,
    ) -> Result<Identity, AuthError>;

    /// Send (or re-send) the verification email
    async fn send_verification_email(&self, identity: &Identity) -> Result<(), AuthError>;

    /// Send a password-reset email
    async fn send_password_reset(&self, email: &str) -> Result<(), AuthError>;

    /// Re-read the identity, picking up a verification flip
    async fn reload(&self, identity: &Identity) -> Result<Identity, AuthError>;

    /// Invalidate the identity on the provider side
    async fn sign_out(&self, identity: &Identity) -> Result<(), AuthError>;

    /// Push notifications of identity changes, if the provider has any
    fn identity_changes(&self) -> Option<broadcast::Receiver<Option<Identity>>> {
        None
    }

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
