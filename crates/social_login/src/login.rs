//! Find-or-create hand-off after a provider has vouched for a user.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{AuthError, AuthResult, CanonicalProfile, UserDirectory, UserRecord};

/// Maps a normalized profile onto a local account.
#[derive(Clone)]
pub struct SocialLogin {
    directory: Arc<dyn UserDirectory>,
    allow_registration: bool,
}

impl std::fmt::Debug for SocialLogin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocialLogin")
            .field("allow_registration", &self.allow_registration)
            .finish_non_exhaustive()
    }
}

impl SocialLogin {
    /// Creates the hand-off over a user directory.
    pub fn new(directory: Arc<dyn UserDirectory>, allow_registration: bool) -> Self {
        Self {
            directory,
            allow_registration,
        }
    }

    /// Returns the account for `profile`, creating it when allowed.
    ///
    /// Existing accounts are matched by email. Their avatar is refreshed from
    /// the provider unless the user uploaded one themselves.
    pub async fn login(&self, profile: &CanonicalProfile) -> AuthResult<UserRecord> {
        let email = profile.email.trim();
        if email.is_empty() || profile.id.is_empty() {
            warn!(provider = %profile.provider, "Profile is missing email or id");
            return Err(AuthError::MissingIdentifier);
        }

        if let Some(user) = self.directory.find_by_email(email).await? {
            debug!(provider = %profile.provider, user_id = %user.id, "Matched existing user");
            return self.refresh_avatar(user, profile).await;
        }

        if !self.allow_registration {
            warn!(provider = %profile.provider, "Social registration is disabled");
            return Err(AuthError::RegistrationDisabled {
                email: email.to_string(),
            });
        }

        let user = self.directory.create(UserRecord::from_profile(profile)).await?;
        info!(provider = %profile.provider, user_id = %user.id, "Registered user via social login");
        Ok(user)
    }

    async fn refresh_avatar(
        &self,
        user: UserRecord,
        profile: &CanonicalProfile,
    ) -> AuthResult<UserRecord> {
        if profile.avatar_url.is_empty()
            || user.has_manual_avatar()
            || user.avatar == profile.avatar_url
        {
            return Ok(user);
        }
        self.directory.update_avatar(user.id, &profile.avatar_url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryUserDirectory;

    fn profile(email: &str, avatar: &str) -> CanonicalProfile {
        CanonicalProfile {
            provider: "steedos".to_string(),
            id: "42".to_string(),
            email: email.to_string(),
            email_verified: true,
            username: "ada".to_string(),
            name: "Ada Lovelace".to_string(),
            avatar_url: avatar.to_string(),
            raw: String::new(),
            json: serde_json::Value::Null,
        }
    }

    #[tokio::test]
    async fn test_registers_new_user() {
        let directory = Arc::new(MemoryUserDirectory::new());
        let login = SocialLogin::new(directory.clone(), true);

        let user = login.login(&profile(" ada@example.com ", "a.png")).await.unwrap();

        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.provider_id, "42");
        assert_eq!(directory.len().await, 1);
    }

    #[tokio::test]
    async fn test_registration_disabled() {
        let login = SocialLogin::new(Arc::new(MemoryUserDirectory::new()), false);

        let err = login.login(&profile("ada@example.com", "")).await.unwrap_err();
        assert!(matches!(err, AuthError::RegistrationDisabled { ref email } if email == "ada@example.com"));
    }

    #[tokio::test]
    async fn test_existing_user_gets_new_avatar() {
        let directory = Arc::new(MemoryUserDirectory::new());
        let login = SocialLogin::new(directory.clone(), true);
        let first = login.login(&profile("ada@example.com", "old.png")).await.unwrap();

        let again = SocialLogin::new(directory.clone(), false)
            .login(&profile("ADA@example.com", "new.png"))
            .await
            .unwrap();

        assert_eq!(again.id, first.id);
        assert_eq!(again.avatar, "new.png");
        assert_eq!(directory.len().await, 1);
    }

    #[tokio::test]
    async fn test_manual_avatar_is_kept() {
        let directory = Arc::new(MemoryUserDirectory::new());
        let login = SocialLogin::new(directory.clone(), true);
        let first = login
            .login(&profile("ada@example.com", "/images/ada.png?manual=true"))
            .await
            .unwrap();

        let again = login.login(&profile("ada@example.com", "new.png")).await.unwrap();

        assert_eq!(again.id, first.id);
        assert_eq!(again.avatar, "/images/ada.png?manual=true");
    }

    #[tokio::test]
    async fn test_missing_email_rejected() {
        let login = SocialLogin::new(Arc::new(MemoryUserDirectory::new()), true);

        let err = login.login(&profile("  ", "")).await.unwrap_err();
        assert!(matches!(err, AuthError::MissingIdentifier));
    }
}
