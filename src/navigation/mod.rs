//! Route guards and authenticated API access.
//!
//! Guards decide whether a navigation may proceed by reading the
//! [`SessionStore`](crate::session::SessionStore); the interceptor attaches
//! the session credential to API calls and clears the session when the
//! server rejects it.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use troc_session::navigation::{AuthGuard, GuardOutcome, NavigationConfig, NavigationRequest, RouteGuard};
//!
//! let guard = AuthGuard::new(session.clone(), NavigationConfig::default());
//! match guard.can_activate(&NavigationRequest::new("/users")) {
//!     GuardOutcome::Proceed => show_users(),
//!     GuardOutcome::Redirect(redirect) => router.go(&redirect.to_url()),
//! }
//! ```

mod config;
mod guards;
#[cfg(feature = "http")]
mod interceptor;
mod redirect;

pub use config::NavigationConfig;
pub use guards::{AdminGuard, AuthGuard, GuestGuard, RoleGuard, RouteGuard, evaluate};
#[cfg(feature = "http")]
pub use interceptor::{ApiClient, AuthInterceptor, DEFAULT_EXCLUDED_ENDPOINTS};
pub use redirect::{GuardOutcome, NavigationRequest, Navigator, Redirect};
