#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod navigation;
#[cfg(feature = "http")]
pub mod oauth;
pub mod session;
pub mod token;
pub mod types;

// Re-exports for convenient access
pub use config::ClientConfig;
pub use error::Error;
#[cfg(feature = "http")]
pub use navigation::{ApiClient, AuthInterceptor};
pub use navigation::{
    AdminGuard, AuthGuard, GuardOutcome, GuestGuard, NavigationConfig, NavigationRequest,
    Navigator, Redirect, RoleGuard, RouteGuard,
};
#[cfg(feature = "http")]
pub use oauth::{AuthClient, ClientCredentials, OAuthConfig, TokenResponse};
pub use session::{CredentialStorage, FileStorage, MemoryStorage, SessionState, SessionStore};
pub use token::{DecodeError, DecodedCredential, IdentityClaims, decode};
pub use types::Credential;
