//! User records created or matched by social sign-in

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::CanonicalProfile;

/// Query-string marker on avatars the user uploaded themselves.
pub const MANUAL_AVATAR_MARKER: &str = "?manual=true";

/// A local user account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    /// Local user ID
    pub id: Uuid,

    /// Provider the account was created through
    pub provider: String,

    /// Identifier at that provider
    pub provider_id: String,

    /// Email address
    pub email: String,

    /// Whether the email is verified
    pub email_verified: bool,

    /// Username
    pub username: String,

    /// Display name
    pub name: String,

    /// Avatar URL
    pub avatar: String,

    /// Creation timestamp (unix seconds)
    pub created_at: i64,
}

impl UserRecord {
    /// Builds a new account from a provider profile
    pub fn from_profile(profile: &CanonicalProfile) -> Self {
        Self {
            id: Uuid::new_v4(),
            provider: profile.provider.clone(),
            provider_id: profile.id.clone(),
            email: profile.email.trim().to_string(),
            email_verified: profile.email_verified,
            username: profile.username.clone(),
            name: profile.name.clone(),
            avatar: profile.avatar_url.clone(),
            created_at: chrono::Utc::now().timestamp(),
        }
    }

    /// Returns the display name, falling back to username or email
    pub fn display_name(&self) -> &str {
        [&self.name, &self.username, &self.email]
            .into_iter()
            .find(|s| !s.is_empty())
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Checks if the avatar was uploaded by the user
    pub fn has_manual_avatar(&self) -> bool {
        self.avatar.contains(MANUAL_AVATAR_MARKER)
    }
}
