//! Social sign-in through OAuth2 identity providers.
//!
//! This crate provides:
//! - OAuth2 provider strategies (authorization URL, code exchange, profile fetch)
//! - Classification of provider error bodies
//! - Normalization of provider profiles into a canonical shape
//! - Find-or-create hand-off to a user directory

mod authorize;
mod classify;
mod config;
mod directory;
mod error;
mod login;
mod profile;
mod strategy;
mod transport;
mod user;

pub use authorize::*;
pub use classify::*;
pub use config::*;
pub use directory::*;
pub use error::*;
pub use login::*;
pub use profile::*;
pub use strategy::*;
pub use transport::*;
pub use user::*;

/// Provider name of the Steedos identity service.
pub const STEEDOS_PROVIDER: &str = "steedos";

/// Environment variable prefix for Steedos settings.
pub const STEEDOS_ENV_PREFIX: &str = "STEEDOS";

/// Steedos endpoint paths relative to `STEEDOS_ISSUER_URL`.
pub const STEEDOS_ENDPOINTS: EndpointPaths = EndpointPaths {
    authorization: "/auth",
    token: "/token",
    userinfo: "/me",
};
