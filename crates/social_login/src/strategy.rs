//! OAuth2 provider strategy
//!
//! A strategy is a generic OAuth2 client (credentials + transport) combined
//! with a pluggable profile normalizer. Provider-specific strategies are just
//! constructors that fill in the provider name and endpoints.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::{
    classify_token_failure, classify_userinfo_failure, parse_profile, AuthError, AuthResult,
    AuthorizationParams, AuthorizationState, CanonicalProfile, HttpTransport, ProfileNormalizer,
    ProviderConfig, StandardNormalizer, TransportError, UserInfoTransport, CODE_CHALLENGE_METHOD,
    STEEDOS_ENDPOINTS, STEEDOS_ENV_PREFIX, STEEDOS_PROVIDER,
};

/// Token response from the provider
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    /// The access token
    pub access_token: String,

    /// Token type (usually "Bearer")
    #[serde(default)]
    pub token_type: Option<String>,

    /// When the token expires (in seconds)
    #[serde(default)]
    pub expires_in: Option<u64>,

    /// The refresh token (if granted)
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// The ID token (if the provider speaks OIDC)
    #[serde(default)]
    pub id_token: Option<String>,

    /// Scopes granted
    #[serde(default)]
    pub scope: Option<String>,
}

/// OAuth2 strategy for one provider.
///
/// Immutable after construction; share it behind an `Arc` across requests.
pub struct OAuth2Strategy<T = HttpTransport> {
    config: ProviderConfig,
    transport: T,
    normalizer: Arc<dyn ProfileNormalizer>,
}

impl<T> std::fmt::Debug for OAuth2Strategy<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuth2Strategy")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl OAuth2Strategy<HttpTransport> {
    /// Creates a strategy that talks HTTP through `reqwest`.
    pub fn new(config: ProviderConfig) -> Self {
        Self::with_transport(config, HttpTransport::new())
    }

    /// Steedos strategy configured from `STEEDOS_*` environment variables.
    pub fn steedos_from_env() -> AuthResult<Self> {
        let config = ProviderConfig::from_env(STEEDOS_PROVIDER, STEEDOS_ENV_PREFIX, STEEDOS_ENDPOINTS)?;
        Ok(Self::new(config))
    }
}

impl<T: UserInfoTransport> OAuth2Strategy<T> {
    /// Creates a strategy with a custom transport and the standard normalizer.
    pub fn with_transport(config: ProviderConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            normalizer: Arc::new(StandardNormalizer),
        }
    }

    /// Replaces the profile normalizer.
    pub fn with_normalizer(mut self, normalizer: impl ProfileNormalizer + 'static) -> Self {
        self.normalizer = Arc::new(normalizer);
        self
    }

    /// Provider name stamped onto profiles
    pub fn provider(&self) -> &str {
        &self.config.provider
    }

    /// Get the current configuration
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Build the authorization URL
    ///
    /// `state` must be kept by the caller until the callback arrives.
    pub fn authorization_url(
        &self,
        state: &AuthorizationState,
        params: &AuthorizationParams,
    ) -> AuthResult<String> {
        let credentials = &self.config.credentials;
        let mut url = url::Url::parse(credentials.authorization_url())?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("response_type", "code");
            query.append_pair("client_id", credentials.client_id());
            query.append_pair("redirect_uri", credentials.callback_url());
            query.append_pair("scope", &self.config.scopes.join(" "));
            query.append_pair("state", &state.state);
            query.append_pair("code_challenge", &state.code_challenge());
            query.append_pair("code_challenge_method", CODE_CHALLENGE_METHOD);

            for (key, value) in params.to_pairs() {
                query.append_pair(key, &value);
            }
        }

        Ok(url.to_string())
    }

    /// Form parameters for the authorization-code exchange.
    pub fn token_request_params(
        &self,
        code: &str,
        state: &AuthorizationState,
    ) -> Vec<(String, String)> {
        let credentials = &self.config.credentials;
        vec![
            ("grant_type".to_string(), "authorization_code".to_string()),
            ("code".to_string(), code.to_string()),
            ("redirect_uri".to_string(), credentials.callback_url().to_string()),
            ("client_id".to_string(), credentials.client_id().to_string()),
            ("client_secret".to_string(), credentials.client_secret().to_string()),
            ("code_verifier".to_string(), state.code_verifier.clone()),
        ]
    }

    /// Exchanges an authorization code for tokens.
    pub async fn exchange_code(
        &self,
        code: &str,
        state: &AuthorizationState,
    ) -> AuthResult<TokenResponse> {
        let endpoint = self.config.credentials.token_url();
        let params = self.token_request_params(code, state);

        let body = self
            .transport
            .post_form(endpoint, &params)
            .await
            .map_err(|e| self.failed("Token exchange failed", classify_token_failure(e)))?;

        let json: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| AuthError::Parse(format!("token response: {}", e)))?;

        // Some providers answer token errors with 200.
        if json.get("access_token").is_none() && json.get("error").is_some() {
            let err = classify_token_failure(TransportError::status(200, body));
            return Err(self.failed("Token exchange failed", err));
        }

        serde_json::from_value(json).map_err(|e| AuthError::Parse(format!("token response: {}", e)))
    }

    /// Fetches the user profile for `access_token` and normalizes it.
    pub async fn authenticate(&self, access_token: &str) -> AuthResult<CanonicalProfile> {
        let endpoint = self.config.credentials.userinfo_url();
        debug!(provider = %self.config.provider, endpoint, "Authenticating access token");

        let body = self
            .transport
            .fetch_user_info(endpoint, access_token, self.config.token_placement)
            .await
            .map_err(|e| self.failed("User profile request failed", classify_userinfo_failure(e)))?;

        parse_profile(&self.config.provider, &body, self.normalizer.as_ref())
            .map_err(|e| self.failed("User profile could not be normalized", e))
    }

    /// Completes the callback leg: code exchange followed by profile fetch.
    pub async fn sign_in(
        &self,
        code: &str,
        state: &AuthorizationState,
    ) -> AuthResult<(TokenResponse, CanonicalProfile)> {
        let tokens = self.exchange_code(code, state).await?;
        let profile = self.authenticate(&tokens.access_token).await?;
        Ok((tokens, profile))
    }

    fn failed(&self, what: &str, err: AuthError) -> AuthError {
        warn!(provider = %self.config.provider, error = %err, "{}", what);
        err
    }
}
