//! Identity Toolkit REST client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use super::{FederatedTokenSource, Identity, IdentityProvider, SignInMethod};
use crate::config::IdentityConfig;
use crate::error::{AuthError, Error, Result};

const REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_REQUEST_URI: &str = "http://localhost";

/// Which call produced a provider error; the same code can mean different things
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Flow {
    SignUp,
    SignIn,
    PasswordReset,
    Verification,
    EmailLink,
    Federated,
    Lookup,
}

/// [`IdentityProvider`] over the Identity Toolkit `accounts:*` REST endpoints
pub struct RestIdentityProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
    federated: Option<Arc<dyn FederatedTokenSource>>,
    request_uri: String,
}

impl std::fmt::Debug for RestIdentityProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestIdentityProvider")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("federated", &self.federated.is_some())
            .finish()
    }
}

impl RestIdentityProvider {
    /// Create a client from identity configuration
    ///
    /// # Errors
    /// Returns a configuration error if the HTTP client cannot be created
    pub fn new(config: &IdentityConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Config {
                message: format!("failed to create HTTP client: {}", e),
                key: Some("identity".to_string()),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            federated: None,
            request_uri: DEFAULT_REQUEST_URI.to_string(),
        })
    }

    /// Enable federated sign-in using `source` for the popup
    pub fn with_federated_source(mut self, source: Arc<dyn FederatedTokenSource>) -> Self {
        self.federated = Some(source);
        self
    }

    /// Override the `requestUri` sent with federated sign-in
    pub fn with_request_uri(mut self, uri: impl Into<String>) -> Self {
        self.request_uri = uri.into();
        self
    }

    async fn post<T: DeserializeOwned>(
        &self,
        method: &str,
        body: serde_json::Value,
        flow: Flow,
    ) -> std::result::Result<T, AuthError> {
        let url = format!("{}/accounts:{}", self.base_url, method);
        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.query(&[("key", key.expose_secret().as_str())]);
        }

        let response = request.send().await.map_err(|e| {
            tracing::warn!(method, error = %e, "identity provider unreachable");
            AuthError::Network(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = provider_message(&body);
            tracing::debug!(method, status = status.as_u16(), message = %message, "identity provider rejected request");
            return Err(map_provider_error(&message, flow));
        }

        response.json::<T>().await.map_err(|e| {
            if e.is_decode() {
                AuthError::Provider(format!("unexpected response from {}: {}", method, e))
            } else {
                AuthError::Network(e.to_string())
            }
        })
    }

    async fn lookup(&self, id_token: &SecretString) -> std::result::Result<LookupUser, AuthError> {
        let response: LookupResponse = self
            .post(
                "lookup",
                json!({ "idToken": id_token.expose_secret() }),
                Flow::Lookup,
            )
            .await?;
        response
            .users
            .into_iter()
            .next()
            .ok_or(AuthError::NoActiveSession)
    }
}

#[async_trait]
impl IdentityProvider for RestIdentityProvider {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
    ) -> std::result::Result<Identity, AuthError> {
        let response: TokenResponse = self
            .post(
                "signUp",
                json!({ "email": email, "password": password, "returnSecureToken": true }),
                Flow::SignUp,
            )
            .await?;
        Ok(response.into_identity(email, SignInMethod::Password, false))
    }

    async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> std::result::Result<Identity, AuthError> {
        let response: TokenResponse = self
            .post(
                "signInWithPassword",
                json!({ "email": email, "password": password, "returnSecureToken": true }),
                Flow::SignIn,
            )
            .await?;

        // signInWithPassword does not report the verification flag
        let mut identity = response.into_identity(email, SignInMethod::Password, false);
        let user = self.lookup(&identity.id_token).await?;
        identity.email_verified = user.email_verified;
        Ok(identity)
    }

    async fn authenticate_with_provider(&self) -> std::result::Result<Identity, AuthError> {
        let source = self.federated.as_ref().ok_or_else(|| {
            AuthError::Provider("federated sign-in is not configured".to_string())
        })?;
        let credential = source
            .obtain_credential()
            .await?
            .ok_or(AuthError::PopupCancelled)?;

        let post_body = format!(
            "id_token={}&providerId={}",
            urlencoding::encode(credential.id_token.expose_secret()),
            urlencoding::encode(&credential.provider_id)
        );
        let response: TokenResponse = self
            .post(
                "signInWithIdp",
                json!({
                    "postBody": post_body,
                    "requestUri": self.request_uri,
                    "returnSecureToken": true,
                    "returnIdpCredential": true,
                }),
                Flow::Federated,
            )
            .await?;
        Ok(response.into_identity("", SignInMethod::Federated, true))
    }

    async fn authenticate_with_email_link(
        &self,
        email: &str,
        link: &str,
    ) -> std::result::Result<Identity, AuthError> {
        let code = oob_code_from_link(link).ok_or(AuthError::InvalidLink)?;
        let response: TokenResponse = self
            .post(
                "signInWithEmailLink",
                json!({ "email": email, "oobCode": code }),
                Flow::EmailLink,
            )
            .await?;
        Ok(response.into_identity(email, SignInMethod::EmailLink, true))
    }

    async fn send_verification_email(
        &self,
        identity: &Identity,
    ) -> std::result::Result<(), AuthError> {
        let _: serde_json::Value = self
            .post(
                "sendOobCode",
                json!({
                    "requestType": "VERIFY_EMAIL",
                    "idToken": identity.id_token.expose_secret(),
                }),
                Flow::Verification,
            )
            .await?;
        Ok(())
    }

    async fn send_password_reset(&self, email: &str) -> std::result::Result<(), AuthError> {
        let _: serde_json::Value = self
            .post(
                "sendOobCode",
                json!({ "requestType": "PASSWORD_RESET", "email": email }),
                Flow::PasswordReset,
            )
            .await?;
        Ok(())
    }

    async fn reload(&self, identity: &Identity) -> std::result::Result<Identity, AuthError> {
        let user = self.lookup(&identity.id_token).await?;
        let mut reloaded = identity.clone();
        reloaded.email_verified = user.email_verified;
        if !user.email.is_empty() {
            reloaded.email = user.email;
        }
        Ok(reloaded)
    }

    async fn sign_out(&self, identity: &Identity) -> std::result::Result<(), AuthError> {
        // ID tokens are stateless; dropping them locally is the sign-out
        tracing::debug!(user_id = %identity.id, "discarding identity tokens");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "identity-toolkit"
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    local_id: String,
    #[serde(default)]
    email: String,
    id_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    email_verified: Option<bool>,
}

impl TokenResponse {
    fn into_identity(self, email: &str, method: SignInMethod, verified: bool) -> Identity {
        let email = if self.email.is_empty() {
            email.to_string()
        } else {
            self.email
        };
        Identity {
            id: self.local_id,
            email,
            email_verified: self.email_verified.unwrap_or(verified) || verified,
            method,
            id_token: SecretString::new(self.id_token),
            refresh_token: self.refresh_token.map(SecretString::new),
        }
    }
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    #[serde(default)]
    email: String,
    #[serde(default)]
    email_verified: bool,
}

/// `error.message` from `{"error": {"code": 400, "message": "EMAIL_EXISTS"}}`
fn provider_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_default()
}

fn map_provider_error(message: &str, flow: Flow) -> AuthError {
    // Messages may carry a detail suffix: "WEAK_PASSWORD : Password should be at least 6 characters"
    let code = message.split(" : ").next().unwrap_or_default().trim();
    match (code, flow) {
        ("EMAIL_EXISTS", _) => AuthError::EmailInUse,
        (c, _) if c.starts_with("WEAK_PASSWORD") => AuthError::WeakPassword,
        ("EMAIL_NOT_FOUND", Flow::PasswordReset) => AuthError::UnknownEmail,
        ("INVALID_PASSWORD" | "EMAIL_NOT_FOUND" | "INVALID_LOGIN_CREDENTIALS", _) => {
            AuthError::InvalidCredentials
        }
        ("TOO_MANY_ATTEMPTS_TRY_LATER", _) => AuthError::RateLimited,
        ("INVALID_OOB_CODE" | "EXPIRED_OOB_CODE", _) => AuthError::InvalidLink,
        ("INVALID_ID_TOKEN" | "TOKEN_EXPIRED" | "USER_NOT_FOUND", _) => AuthError::NoActiveSession,
        ("", _) => AuthError::Provider("identity provider returned an error".to_string()),
        (other, _) => AuthError::Provider(other.to_string()),
    }
}

/// Extract `oobCode` from an email sign-in link
///
/// Some links wrap the real action URL in a `link` query parameter; both forms
/// are accepted.
fn oob_code_from_link(link: &str) -> Option<String> {
    let url = url::Url::parse(link).ok()?;
    let find = |url: &url::Url, key: &str| {
        url.query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    };
    find(&url, "oobCode").or_else(|| {
        let inner = find(&url, "link")?;
        find(&url::Url::parse(&inner).ok()?, "oobCode")
    })
}
