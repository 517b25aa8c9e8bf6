//! Profile normalization
//!
//! Provider user-info payloads come in two shapes. Which one applies is decided
//! by [`ProfilePayload::detect`], then each shape is mapped onto the same
//! [`CanonicalProfile`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{AuthError, AuthResult};

/// Provider-agnostic user identity produced by a successful sign-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalProfile {
    /// Provider that issued the profile
    pub provider: String,

    /// Stable identifier at the provider (the email when none is given)
    pub id: String,

    /// Email address (empty if the provider sent none)
    pub email: String,

    /// Whether the provider verified the email
    pub email_verified: bool,

    /// Username / handle
    pub username: String,

    /// Display name
    pub name: String,

    /// URL of the user's picture
    pub avatar_url: String,

    /// Response body exactly as received
    #[serde(skip)]
    pub raw: String,

    /// Parsed response body
    #[serde(skip)]
    pub json: Value,
}

/// Identity fields extracted from a payload, before provider stamping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileDetails {
    /// Identifier at the provider; empty means the payload is unusable
    pub id: String,
    /// Email address, or empty
    pub email: String,
    /// Whether the provider verified the email
    pub email_verified: bool,
    /// Username / handle, or empty
    pub username: String,
    /// Display name, or empty
    pub name: String,
    /// Picture URL, or empty
    pub avatar_url: String,
}

/// Social-network style profile: `{id, emails: [..], photos: [..], name: {givenName, familyName}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SocialProfile {
    /// Top-level `id`, stringified when numeric
    pub id: String,
    /// `emails[0].value`
    pub email: Option<String>,
    /// `emails[0].verified`
    pub email_verified: bool,
    /// `photos[0].value`
    pub photo: Option<String>,
    /// `name.givenName`
    pub given_name: Option<String>,
    /// `name.familyName`
    pub family_name: Option<String>,
}

/// Flat OpenID Connect userinfo claims.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OidcUserInfo {
    /// `email` claim
    pub email: Option<String>,
    /// `email_verified` claim
    pub email_verified: bool,
    /// `picture` claim
    pub picture: Option<String>,
    /// `preferred_username` claim
    pub preferred_username: Option<String>,
    /// `name` claim
    pub name: Option<String>,
}

/// A user-info payload, classified by shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfilePayload {
    /// Payload has a truthy `id`.
    NestedSocial(SocialProfile),
    /// Payload has no usable `id`.
    FlatOidc(OidcUserInfo),
}

impl ProfilePayload {
    /// Picks the shape of a parsed payload.
    pub fn detect(json: &Value) -> Self {
        match json.get("id").filter(|id| is_truthy(id)) {
            Some(id) => Self::NestedSocial(SocialProfile::from_json(id, json)),
            None => Self::FlatOidc(OidcUserInfo::from_json(json)),
        }
    }

    /// Maps the payload onto canonical fields.
    pub fn into_details(self) -> ProfileDetails {
        match self {
            Self::NestedSocial(profile) => {
                let name = [profile.given_name.as_deref(), profile.family_name.as_deref()]
                    .into_iter()
                    .flatten()
                    .filter(|part| !part.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ");

                ProfileDetails {
                    id: profile.id,
                    email: profile.email.unwrap_or_default(),
                    email_verified: profile.email_verified,
                    username: profile.given_name.unwrap_or_default(),
                    name,
                    avatar_url: profile.photo.unwrap_or_default(),
                }
            }
            // No stable subject on this shape, so the email doubles as the id.
            Self::FlatOidc(info) => {
                let email = info.email.unwrap_or_default();
                ProfileDetails {
                    id: email.clone(),
                    email,
                    email_verified: info.email_verified,
                    username: info.preferred_username.unwrap_or_default(),
                    name: info.name.unwrap_or_default(),
                    avatar_url: info.picture.unwrap_or_default(),
                }
            }
        }
    }
}

impl SocialProfile {
    fn from_json(id: &Value, json: &Value) -> Self {
        Self {
            id: id_string(id),
            email: string_at(json, "/emails/0/value"),
            email_verified: json.pointer("/emails/0/verified").is_some_and(flag),
            photo: string_at(json, "/photos/0/value"),
            given_name: string_at(json, "/name/givenName"),
            family_name: string_at(json, "/name/familyName"),
        }
    }
}

impl OidcUserInfo {
    fn from_json(json: &Value) -> Self {
        Self {
            email: string_at(json, "/email"),
            email_verified: json.get("email_verified").is_some_and(flag),
            picture: string_at(json, "/picture"),
            preferred_username: string_at(json, "/preferred_username"),
            name: string_at(json, "/name"),
        }
    }
}

pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn id_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn string_at(json: &Value, pointer: &str) -> Option<String> {
    json.pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Some providers send `"true"` instead of `true`.
fn flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

/// Turns a parsed payload into identity fields.
///
/// Strategies are parameterized by a normalizer so providers with unusual
/// payloads can plug in their own mapping.
pub trait ProfileNormalizer: Send + Sync {
    /// Extracts identity fields from the parsed body.
    fn details(&self, json: &Value) -> ProfileDetails;
}

impl<F> ProfileNormalizer for F
where
    F: Fn(&Value) -> ProfileDetails + Send + Sync,
{
    fn details(&self, json: &Value) -> ProfileDetails {
        self(json)
    }
}

/// Default normalizer: dispatches on [`ProfilePayload::detect`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardNormalizer;

impl ProfileNormalizer for StandardNormalizer {
    fn details(&self, json: &Value) -> ProfileDetails {
        ProfilePayload::detect(json).into_details()
    }
}

/// Parses a user-info body and stamps the result with `provider`.
///
/// Malformed JSON is fatal, as is a profile that ends up with no identifier.
pub fn parse_profile(
    provider: &str,
    body: &str,
    normalizer: &dyn ProfileNormalizer,
) -> AuthResult<CanonicalProfile> {
    let json: Value = serde_json::from_str(body)
        .map_err(|e| AuthError::Parse(format!("user profile: {}", e)))?;

    let details = normalizer.details(&json);
    if details.id.is_empty() {
        return Err(AuthError::MissingIdentifier);
    }

    Ok(CanonicalProfile {
        provider: provider.to_string(),
        id: details.id,
        email: details.email,
        email_verified: details.email_verified,
        username: details.username,
        name: details.name,
        avatar_url: details.avatar_url,
        raw: body.to_string(),
        json,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn parse(body: &str) -> AuthResult<CanonicalProfile> {
        parse_profile("steedos", body, &StandardNormalizer)
    }

    #[test]
    fn test_nested_social_profile() {
        let body = json!({
            "id": "10769150350006150715",
            "displayName": "John Doe",
            "name": { "givenName": "John", "familyName": "Doe" },
            "emails": [{ "value": "john@example.com", "verified": true }],
            "photos": [{ "value": "https://img.example.com/john.png" }]
        })
        .to_string();

        let profile = parse(&body).unwrap();

        assert_eq!(profile.provider, "steedos");
        assert_eq!(profile.id, "10769150350006150715");
        assert_eq!(profile.email, "john@example.com");
        assert!(profile.email_verified);
        assert_eq!(profile.avatar_url, "https://img.example.com/john.png");
        assert_eq!(profile.username, "John");
        assert_eq!(profile.name, "John Doe");
        assert_eq!(profile.raw, body);
        assert_eq!(profile.json["displayName"], "John Doe");
    }

    #[test]
    fn test_numeric_id_is_stringified() {
        let profile = parse(r#"{"id": 583231, "emails": [{"value": "octo@example.com"}]}"#).unwrap();

        assert_eq!(profile.id, "583231");
        assert_eq!(profile.email, "octo@example.com");
        assert!(!profile.email_verified);
        assert_eq!(profile.name, "");
    }

    #[test]
    fn test_flat_oidc_profile() {
        let body = json!({
            "sub": "248289761001",
            "email": "jane@example.com",
            "email_verified": true,
            "name": "Jane Doe",
            "preferred_username": "jane",
            "picture": "https://img.example.com/jane.png"
        })
        .to_string();

        let profile = parse(&body).unwrap();

        assert_eq!(profile.id, "jane@example.com");
        assert_eq!(profile.email, "jane@example.com");
        assert!(profile.email_verified);
        assert_eq!(profile.username, "jane");
        assert_eq!(profile.name, "Jane Doe");
        assert_eq!(profile.avatar_url, "https://img.example.com/jane.png");
    }

    #[test]
    fn test_falsy_id_uses_flat_shape() {
        let profile = parse(r#"{"id": "", "email": "empty@example.com", "email_verified": "true"}"#).unwrap();

        assert_eq!(profile.id, "empty@example.com");
        assert!(profile.email_verified);
    }

    #[test]
    fn test_detect_shapes() {
        assert!(matches!(
            ProfilePayload::detect(&json!({"id": 7})),
            ProfilePayload::NestedSocial(_)
        ));
        assert!(matches!(
            ProfilePayload::detect(&json!({"id": 0, "email": "a@b.c"})),
            ProfilePayload::FlatOidc(_)
        ));
        assert!(matches!(
            ProfilePayload::detect(&json!({"email": "a@b.c"})),
            ProfilePayload::FlatOidc(_)
        ));
    }

    #[test]
    fn test_malformed_json() {
        let err = parse("{not json").unwrap_err();
        assert!(matches!(err, AuthError::Parse(_)));
    }

    #[test]
    fn test_flat_profile_without_email_has_no_identifier() {
        let err = parse(r#"{"name": "Nobody"}"#).unwrap_err();
        assert!(matches!(err, AuthError::MissingIdentifier));
    }

    #[test]
    fn test_custom_normalizer() {
        let normalizer = |json: &Value| ProfileDetails {
            id: json["login"].as_str().unwrap_or_default().to_string(),
            username: json["login"].as_str().unwrap_or_default().to_string(),
            ..ProfileDetails::default()
        };

        let profile = parse_profile("github", r#"{"login": "octocat"}"#, &normalizer).unwrap();

        assert_eq!(profile.provider, "github");
        assert_eq!(profile.id, "octocat");
        assert_eq!(profile.username, "octocat");
    }

    #[test]
    fn test_serialized_profile_uses_camel_case() {
        let profile = parse(r#"{"email": "jane@example.com", "picture": "p.png"}"#).unwrap();
        let value = serde_json::to_value(&profile).unwrap();

        assert_eq!(value["avatarUrl"], "p.png");
        assert_eq!(value["emailVerified"], false);
        assert!(value.get("raw").is_none());
    }

    #[test]
    fn test_single_name_part_has_no_stray_space() {
        let given = parse(r#"{"id": "1", "name": {"givenName": "Ada"}}"#).unwrap();
        assert_eq!(given.name, "Ada");
        assert_eq!(given.username, "Ada");

        let family = parse(r#"{"id": "2", "name": {"familyName": "Lovelace"}}"#).unwrap();
        assert_eq!(family.name, "Lovelace");
        assert_eq!(family.username, "");
    }

    #[test]
    fn test_nested_profile_with_flat_fields() {
        let profile = parse(r#"{"id": "1", "name": "Jane", "email": "j@x"}"#).unwrap();

        assert_eq!(profile.id, "1");
        assert_eq!(profile.email, "");
        assert_eq!(profile.username, "");
        assert_eq!(profile.name, "");
        assert!(!profile.email_verified);
    }
}
