//! Authorization request construction
//!
//! Builds the redirect to the provider's consent screen: CSRF state, a PKCE
//! challenge, and the optional Google-style extension parameters that
//! Google-compatible providers understand.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{AuthError, AuthResult};

/// Maximum age of an authorization state before the callback is refused.
pub const DEFAULT_STATE_MAX_AGE_SECS: i64 = 600;

/// PKCE challenge method sent with every request.
pub const CODE_CHALLENGE_METHOD: &str = "S256";

/// Optional extension parameters for the authorization request.
///
/// Only parameters that are set end up in the URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationParams {
    /// `access_type` ("online" / "offline")
    pub access_type: Option<String>,
    /// `prompt` (e.g. "consent", "select_account")
    pub prompt: Option<String>,
    /// `login_hint`
    pub login_hint: Option<String>,
    /// `include_granted_scopes=true` for incremental authorization
    pub include_granted_scopes: bool,
    /// `display` mode of the consent page
    pub display: Option<String>,
    /// `hd`, restricts sign-in to a hosted domain
    pub hosted_domain: Option<String>,
    /// `request_visible_actions`, space separated
    pub request_visible_actions: Option<String>,
    /// `openid.realm`, for OpenID 2.0 migrations
    pub openid_realm: Option<String>,
    /// `approval_prompt` (legacy)
    pub approval_prompt: Option<String>,
    /// `user_id` (legacy alias of `login_hint`)
    pub user_id: Option<String>,
}

impl AuthorizationParams {
    /// Returns the set parameters as query pairs.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let include_granted_scopes = self.include_granted_scopes.then(|| "true".to_string());

        [
            ("access_type", self.access_type.clone()),
            ("prompt", self.prompt.clone()),
            ("login_hint", self.login_hint.clone()),
            ("include_granted_scopes", include_granted_scopes),
            ("display", self.display.clone()),
            ("hd", self.hosted_domain.clone()),
            ("request_visible_actions", self.request_visible_actions.clone()),
            ("openid.realm", self.openid_realm.clone()),
            ("approval_prompt", self.approval_prompt.clone()),
            ("user_id", self.user_id.clone()),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.filter(|v| !v.is_empty()).map(|v| (key, v)))
        .collect()
    }
}

/// Per-request state kept by the caller between redirect and callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationState {
    /// CSRF token echoed back by the provider
    pub state: String,

    /// PKCE code verifier
    pub code_verifier: String,

    /// Timestamp when this state was created
    pub created_at: i64,
}

impl AuthorizationState {
    /// Create new authorization state
    pub fn new() -> Self {
        Self {
            state: generate_random_string(32),
            code_verifier: generate_code_verifier(),
            created_at: chrono::Utc::now().timestamp(),
        }
    }

    /// Check if this state is older than `max_age_secs`
    pub fn is_expired(&self, max_age_secs: i64) -> bool {
        let now = chrono::Utc::now().timestamp();
        now.saturating_sub(self.created_at) > max_age_secs
    }

    /// PKCE code challenge (S256) for the stored verifier
    pub fn code_challenge(&self) -> String {
        let hash = Sha256::digest(self.code_verifier.as_bytes());
        URL_SAFE_NO_PAD.encode(hash)
    }

    /// Checks the `state` value returned on the callback.
    pub fn verify_callback(&self, returned_state: &str, max_age_secs: i64) -> AuthResult<()> {
        if self.state != returned_state {
            return Err(AuthError::InvalidState("state mismatch".to_string()));
        }
        if self.is_expired(max_age_secs) {
            return Err(AuthError::InvalidState("state expired".to_string()));
        }
        Ok(())
    }
}

impl Default for AuthorizationState {
    fn default() -> Self {
        Self::new()
    }
}

fn generate_random_string(len: usize) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::rng();
    (0..len)
        .map(|_| CHARSET[rng.random_range(0..CHARSET.len())] as char)
        .collect()
}

fn generate_code_verifier() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
