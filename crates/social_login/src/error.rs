//! Authentication error types.

use thiserror::Error;

/// Errors that can occur while signing a user in through a provider.
///
/// Every variant is terminal for the current attempt. Callers decide whether
/// to restart the login flow.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Network failure or non-2xx response without a recognizable error body.
    #[error("Failed to fetch user profile: {message}")]
    Transport {
        /// Underlying failure description.
        message: String,
        /// HTTP status, when a response was received.
        status: Option<u16>,
    },

    /// Structured provider API error (`{"error": {"message", "code"}}`).
    #[error("Provider API error: {message}")]
    ProviderApi {
        /// Error message reported by the provider.
        message: String,
        /// Numeric error code reported by the provider.
        code: Option<i64>,
    },

    /// OAuth2-style user-info error (`{"error", "error_description"}`).
    #[error("User info error: {description}")]
    UserInfo {
        /// The `error_description` value.
        description: String,
        /// The `error` value, if present.
        error_code: Option<String>,
    },

    /// OAuth2 token endpoint error.
    #[error("Token error: {description}")]
    Token {
        /// The `error_description` value, or the `error` value if no description was sent.
        description: String,
        /// The `error` value, if present.
        error_code: Option<String>,
    },

    /// A successful response carried a body that is not valid JSON.
    #[error("Failed to parse {0}")]
    Parse(String),

    /// The normalized profile has no usable identifier.
    #[error("Profile has no identifier")]
    MissingIdentifier,

    /// Callback state did not match or expired.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Social registration is turned off and no account matched.
    #[error("Social registration is disabled for {email}")]
    RegistrationDisabled {
        /// Email of the profile that could not be matched.
        email: String,
    },

    /// User directory failure.
    #[error("User directory error: {0}")]
    Directory(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl AuthError {
    /// Message that is safe to show to the end user.
    ///
    /// The `Display` output carries provider detail and belongs in logs only.
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::RegistrationDisabled { .. } => "Registration is not allowed for this account",
            Self::Configuration(_) => "Sign-in with this provider is not available",
            Self::Transport { .. }
            | Self::ProviderApi { .. }
            | Self::UserInfo { .. }
            | Self::Token { .. }
            | Self::Parse(_)
            | Self::MissingIdentifier
            | Self::InvalidState(_)
            | Self::Directory(_) => "Authentication failed",
        }
    }
}

impl From<url::ParseError> for AuthError {
    fn from(e: url::ParseError) -> Self {
        AuthError::Configuration(format!("Invalid URL: {}", e))
    }
}

/// Result type for authentication operations.
pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_message_hides_detail() {
        let err = AuthError::ProviderApi {
            message: "token revoked for user 42".to_string(),
            code: Some(401),
        };

        assert!(err.to_string().contains("token revoked"));
        assert_eq!(err.public_message(), "Authentication failed");
    }

    #[test]
    fn test_url_error_is_configuration() {
        let err: AuthError = url::Url::parse("not a url").unwrap_err().into();
        assert!(matches!(err, AuthError::Configuration(_)));
    }
}
