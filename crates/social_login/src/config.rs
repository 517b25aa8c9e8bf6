//! Provider configuration
//!
//! Credentials and per-provider settings are read from the environment once and
//! are immutable afterwards.

use serde::{ser::SerializeStruct, Deserialize, Serialize, Serializer};

use crate::{AuthError, AuthResult, TokenPlacement};

/// Environment variable holding the public base URL of the server.
pub const DOMAIN_SERVER_ENV: &str = "DOMAIN_SERVER";

/// Environment variable that enables sign-up through social providers.
pub const ALLOW_SOCIAL_REGISTRATION_ENV: &str = "ALLOW_SOCIAL_REGISTRATION";

/// OAuth2 client credentials and endpoints for one provider.
///
/// Deserialization goes through [`Credentials::new`]; serialization omits the
/// client secret.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "CredentialsFile")]
pub struct Credentials {
    client_id: String,
    client_secret: String,
    callback_url: String,
    authorization_url: String,
    token_url: String,
    userinfo_url: String,
}

#[derive(Deserialize)]
struct CredentialsFile {
    client_id: String,
    client_secret: String,
    callback_url: String,
    authorization_url: String,
    token_url: String,
    userinfo_url: String,
}

impl TryFrom<CredentialsFile> for Credentials {
    type Error = AuthError;

    fn try_from(file: CredentialsFile) -> AuthResult<Self> {
        Self::new(
            file.client_id,
            file.client_secret,
            file.callback_url,
            file.authorization_url,
            file.token_url,
            file.userinfo_url,
        )
    }
}

impl Serialize for Credentials {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Credentials", 5)?;
        state.serialize_field("client_id", &self.client_id)?;
        state.serialize_field("callback_url", &self.callback_url)?;
        state.serialize_field("authorization_url", &self.authorization_url)?;
        state.serialize_field("token_url", &self.token_url)?;
        state.serialize_field("userinfo_url", &self.userinfo_url)?;
        state.end()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("callback_url", &self.callback_url)
            .field("authorization_url", &self.authorization_url)
            .field("token_url", &self.token_url)
            .field("userinfo_url", &self.userinfo_url)
            .finish_non_exhaustive()
    }
}

impl Credentials {
    /// Creates credentials, rejecting empty values.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        callback_url: impl Into<String>,
        authorization_url: impl Into<String>,
        token_url: impl Into<String>,
        userinfo_url: impl Into<String>,
    ) -> AuthResult<Self> {
        let credentials = Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            callback_url: callback_url.into(),
            authorization_url: authorization_url.into(),
            token_url: token_url.into(),
            userinfo_url: userinfo_url.into(),
        };

        for (field, value) in [
            ("client_id", &credentials.client_id),
            ("client_secret", &credentials.client_secret),
            ("callback_url", &credentials.callback_url),
            ("authorization_url", &credentials.authorization_url),
            ("token_url", &credentials.token_url),
            ("userinfo_url", &credentials.userinfo_url),
        ] {
            if value.trim().is_empty() {
                return Err(AuthError::Configuration(format!("{} is empty", field)));
            }
        }

        Ok(credentials)
    }

    /// OAuth2 client ID
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// OAuth2 client secret
    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    /// Redirect URL registered with the provider
    pub fn callback_url(&self) -> &str {
        &self.callback_url
    }

    /// Authorization endpoint
    pub fn authorization_url(&self) -> &str {
        &self.authorization_url
    }

    /// Token endpoint
    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    /// User-info endpoint
    pub fn userinfo_url(&self) -> &str {
        &self.userinfo_url
    }
}

/// Default endpoint paths, joined onto the issuer URL when no explicit
/// endpoint is configured.
#[derive(Debug, Clone, Copy)]
pub struct EndpointPaths {
    /// Path of the authorization endpoint.
    pub authorization: &'static str,
    /// Path of the token endpoint.
    pub token: &'static str,
    /// Path of the user-info endpoint.
    pub userinfo: &'static str,
}

/// Settings for one provider strategy.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Provider name stamped onto every profile (e.g. "steedos").
    pub provider: String,

    /// Client credentials and endpoints.
    pub credentials: Credentials,

    /// Scopes to request (defaults to ["openid", "email", "profile"])
    pub scopes: Vec<String>,

    /// How the access token is presented to the user-info endpoint.
    pub token_placement: TokenPlacement,

    /// Whether unknown users may be registered on first sign-in.
    pub allow_registration: bool,
}

fn default_scopes() -> Vec<String> {
    vec![
        "openid".to_string(),
        "email".to_string(),
        "profile".to_string(),
    ]
}

impl ProviderConfig {
    /// Creates a provider configuration with default scopes and header auth.
    pub fn new(provider: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            provider: provider.into(),
            credentials,
            scopes: default_scopes(),
            token_placement: TokenPlacement::default(),
            allow_registration: false,
        }
    }

    /// Set custom scopes
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Set how the access token is sent
    pub fn with_token_placement(mut self, placement: TokenPlacement) -> Self {
        self.token_placement = placement;
        self
    }

    /// Allow or forbid social registration
    pub fn with_registration(mut self, allow: bool) -> Self {
        self.allow_registration = allow;
        self
    }

    /// Load from environment variables
    ///
    /// Keys are derived from `prefix`, e.g. `STEEDOS_CLIENT_ID`.
    pub fn from_env(
        provider: impl Into<String>,
        prefix: &str,
        paths: EndpointPaths,
    ) -> AuthResult<Self> {
        Self::from_lookup(provider, prefix, paths, |key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup.
    ///
    /// Reads `{prefix}_CLIENT_ID`, `{prefix}_CLIENT_SECRET`,
    /// `{prefix}_CALLBACK_URL` (appended to `DOMAIN_SERVER`), and either the
    /// explicit `{prefix}_AUTHORIZATION_URL` / `{prefix}_TOKEN_URL` /
    /// `{prefix}_USER_PROFILE_URL` or `{prefix}_ISSUER_URL` joined with `paths`.
    pub fn from_lookup<F>(
        provider: impl Into<String>,
        prefix: &str,
        paths: EndpointPaths,
        lookup: F,
    ) -> AuthResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: String| -> Option<String> {
            lookup(&key).filter(|value| !value.trim().is_empty())
        };
        let require = |key: String| -> AuthResult<String> {
            get(key.clone()).ok_or_else(|| AuthError::Configuration(format!("{} not set", key)))
        };

        let client_id = require(format!("{prefix}_CLIENT_ID"))?;
        let client_secret = require(format!("{prefix}_CLIENT_SECRET"))?;
        let domain = require(DOMAIN_SERVER_ENV.to_string())?;
        let callback_path = require(format!("{prefix}_CALLBACK_URL"))?;

        let issuer = get(format!("{prefix}_ISSUER_URL"));
        let endpoint = |key: String, path: &str| -> AuthResult<String> {
            match (get(key.clone()), issuer.as_deref()) {
                (Some(url), _) => Ok(url),
                (None, Some(issuer)) => Ok(format!("{}{}", issuer.trim_end_matches('/'), path)),
                (None, None) => Err(AuthError::Configuration(format!(
                    "{} not set and {}_ISSUER_URL not set",
                    key, prefix
                ))),
            }
        };

        let authorization_url = endpoint(format!("{prefix}_AUTHORIZATION_URL"), paths.authorization)?;
        let token_url = endpoint(format!("{prefix}_TOKEN_URL"), paths.token)?;
        let userinfo_url = endpoint(format!("{prefix}_USER_PROFILE_URL"), paths.userinfo)?;

        let credentials = Credentials::new(
            client_id,
            client_secret,
            format!("{}{}", domain, callback_path),
            authorization_url,
            token_url,
            userinfo_url,
        )?;

        let scopes = get(format!("{prefix}_SCOPES"))
            .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
            .unwrap_or_else(default_scopes);

        let allow_registration = get(ALLOW_SOCIAL_REGISTRATION_ENV.to_string())
            .map(|v| is_enabled(&v))
            .unwrap_or(false);

        Ok(Self {
            provider: provider.into(),
            credentials,
            scopes,
            token_placement: TokenPlacement::default(),
            allow_registration,
        })
    }
}

fn is_enabled(value: &str) -> bool {
    let value = value.trim();
    value.eq_ignore_ascii_case("true") || value == "1"
}
