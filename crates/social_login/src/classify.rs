//! Error-body classification
//!
//! Providers report failures in two JSON shapes. The first match wins:
//!
//! 1. `{"error": {"message": .., "code": ..}}` (provider API style)
//! 2. `{"error": .., "error_description": ..}` (OAuth2 style)
//!
//! Both shapes need a truthy `error`; empty strings count as absent.
//! Anything else, including an unparseable body, is a plain transport failure.

use serde_json::Value;

use crate::{profile::is_truthy, AuthError, TransportError};

/// Structured error found in a response body.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ErrorEnvelope {
    Api {
        message: String,
        code: Option<i64>,
    },
    OAuth {
        description: String,
        error_code: Option<String>,
    },
    /// Only `error` was present as a string.
    Bare { error_code: String },
}

fn parse_envelope(body: Option<&str>) -> Option<ErrorEnvelope> {
    let json: Value = serde_json::from_str(body?).ok()?;
    let error = json.get("error").filter(|e| is_truthy(e))?;

    if let Some(message) = non_empty_str(error.get("message")) {
        return Some(ErrorEnvelope::Api {
            message,
            code: error.get("code").and_then(code_value),
        });
    }

    let error_code = non_empty_str(Some(error));

    if let Some(description) = non_empty_str(json.get("error_description")) {
        return Some(ErrorEnvelope::OAuth {
            description,
            error_code,
        });
    }

    error_code.map(|error_code| ErrorEnvelope::Bare { error_code })
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn code_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn generic(err: TransportError) -> AuthError {
    AuthError::Transport {
        message: err.message,
        status: err.status,
    }
}

/// Classifies a failed user-info fetch.
///
/// Never fails: a body that is missing or not JSON degrades to
/// [`AuthError::Transport`].
pub fn classify_userinfo_failure(err: TransportError) -> AuthError {
    match parse_envelope(err.body.as_deref()) {
        Some(ErrorEnvelope::Api { message, code }) => AuthError::ProviderApi { message, code },
        Some(ErrorEnvelope::OAuth {
            description,
            error_code,
        }) => AuthError::UserInfo {
            description,
            error_code,
        },
        Some(ErrorEnvelope::Bare { .. }) | None => generic(err),
    }
}

/// Classifies a failed token exchange.
///
/// Token endpoints may omit `error_description`, so a bare `error` string is
/// also reported as [`AuthError::Token`].
pub fn classify_token_failure(err: TransportError) -> AuthError {
    match parse_envelope(err.body.as_deref()) {
        Some(ErrorEnvelope::Api { message, code }) => AuthError::ProviderApi { message, code },
        Some(ErrorEnvelope::OAuth {
            description,
            error_code,
        }) => AuthError::Token {
            description,
            error_code,
        },
        Some(ErrorEnvelope::Bare { error_code }) => AuthError::Token {
            description: error_code.clone(),
            error_code: Some(error_code),
        },
        None => generic(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(body: &str) -> TransportError {
        TransportError::status(400, body)
    }

    #[test]
    fn test_provider_api_error() {
        let err = classify_userinfo_failure(failure(
            r#"{"error":{"message":"bad token","code":401}}"#,
        ));

        match err {
            AuthError::ProviderApi { message, code } => {
                assert_eq!(message, "bad token");
                assert_eq!(code, Some(401));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_oauth_style_error() {
        let err = classify_userinfo_failure(failure(
            r#"{"error":"invalid_grant","error_description":"token expired"}"#,
        ));

        match err {
            AuthError::UserInfo {
                description,
                error_code,
            } => {
                assert_eq!(description, "token expired");
                assert_eq!(error_code.as_deref(), Some("invalid_grant"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_api_shape_wins_over_description() {
        let err = classify_userinfo_failure(failure(
            r#"{"error":{"message":"quota","code":"429"},"error_description":"ignored"}"#,
        ));

        assert!(matches!(
            err,
            AuthError::ProviderApi { ref message, code: Some(429) } if message == "quota"
        ));
    }

    #[test]
    fn test_unparseable_body_is_generic() {
        let err = classify_userinfo_failure(failure("<html>Bad Gateway</html>"));

        assert!(matches!(
            err,
            AuthError::Transport { status: Some(400), .. }
        ));
    }

    #[test]
    fn test_missing_body_is_generic() {
        let err = classify_userinfo_failure(TransportError::network("connection refused"));

        match err {
            AuthError::Transport { message, status } => {
                assert_eq!(message, "connection refused");
                assert_eq!(status, None);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_bare_error_is_generic_for_userinfo() {
        let err = classify_userinfo_failure(failure(r#"{"error":"invalid_token"}"#));
        assert!(matches!(err, AuthError::Transport { .. }));
    }

    #[test]
    fn test_bare_error_is_token_error_for_exchange() {
        let err = classify_token_failure(failure(r#"{"error":"invalid_client"}"#));

        match err {
            AuthError::Token {
                description,
                error_code,
            } => {
                assert_eq!(description, "invalid_client");
                assert_eq!(error_code.as_deref(), Some("invalid_client"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_error_message_not_string_falls_through() {
        let err = classify_userinfo_failure(failure(r#"{"error":{"message":42}}"#));
        assert!(matches!(err, AuthError::Transport { .. }));
    }

    #[test]
    fn test_description_without_error_is_generic() {
        let err = classify_userinfo_failure(failure(r#"{"error_description":"x"}"#));
        assert!(matches!(err, AuthError::Transport { status: Some(400), .. }));

        let err = classify_token_failure(failure(r#"{"error":null,"error_description":"x"}"#));
        assert!(matches!(err, AuthError::Transport { .. }));
    }

    #[test]
    fn test_empty_api_message_falls_back_to_description() {
        let err = classify_userinfo_failure(failure(
            r#"{"error":{"message":""},"error_description":"d"}"#,
        ));

        match err {
            AuthError::UserInfo {
                description,
                error_code,
            } => {
                assert_eq!(description, "d");
                assert_eq!(error_code, None);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_error_object_without_message_uses_description() {
        let err = classify_userinfo_failure(failure(
            r#"{"error":{"code":5},"error_description":"d"}"#,
        ));

        assert!(matches!(
            err,
            AuthError::UserInfo { ref description, error_code: None } if description == "d"
        ));
    }

    #[test]
    fn test_empty_description_is_ignored() {
        let err = classify_userinfo_failure(failure(
            r#"{"error":"invalid_token","error_description":""}"#,
        ));
        assert!(matches!(err, AuthError::Transport { .. }));
    }
}
