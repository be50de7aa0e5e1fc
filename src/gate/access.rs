//! Page access decisions.

use serde::{Deserialize, Serialize};

use super::SessionState;
use crate::config::IdentityConfig;

/// Who may see a page
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessPolicy {
    /// Only verified sessions (workspace pages)
    Verified,
    /// Only visitors without a verified session (login, signup)
    AnonymousOnly,
    /// Everyone
    Any,
}

/// What the host should do for a page request
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum GateDecision {
    /// Render the page
    Allow,
    /// A credential exchange is in progress; show a placeholder
    Loading,
    /// Send the user to the login page, coming back to `return_to` afterwards
    RedirectToLogin {
        /// Path of the page that was requested
        return_to: String,
    },
    /// Signed in but not verified yet
    RedirectToVerifyEmail,
    /// Already signed in; leave the anonymous-only page
    RedirectHome,
}

impl GateDecision {
    /// Target URL for redirect decisions, `None` for [`Allow`](Self::Allow) and
    /// [`Loading`](Self::Loading)
    ///
    /// The login URL carries the requested path in the `r` query parameter.
    pub fn location(&self, config: &IdentityConfig) -> Option<String> {
        match self {
            GateDecision::Allow | GateDecision::Loading => None,
            GateDecision::RedirectToLogin { return_to } => Some(format!(
                "{}?r={}",
                config.login_route,
                urlencoding::encode(return_to)
            )),
            GateDecision::RedirectToVerifyEmail => Some(config.verify_email_route.clone()),
            GateDecision::RedirectHome => Some(config.home_route.clone()),
        }
    }
}

/// Decide access for `state` under `policy`
pub(crate) fn decide(state: &SessionState, policy: AccessPolicy, current_path: &str) -> GateDecision {
    match (policy, state) {
        (AccessPolicy::Any, _) => GateDecision::Allow,
        (_, SessionState::Authenticating) => GateDecision::Loading,

        (AccessPolicy::Verified, SessionState::AuthenticatedVerified(_)) => GateDecision::Allow,
        (AccessPolicy::Verified, SessionState::AuthenticatedUnverified(_)) => {
            GateDecision::RedirectToVerifyEmail
        }
        (AccessPolicy::Verified, SessionState::Anonymous) => GateDecision::RedirectToLogin {
            return_to: current_path.to_string(),
        },

        (AccessPolicy::AnonymousOnly, SessionState::AuthenticatedVerified(_)) => {
            GateDecision::RedirectHome
        }
        (AccessPolicy::AnonymousOnly, _) => GateDecision::Allow,
    }
}
