//! Client-side session state.
//!
//! [`SessionStore`] owns the bearer credential and the claims decoded from it,
//! persists both through a [`CredentialStorage`], and publishes changes on
//! watch channels that replay the latest value to every new subscriber.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use troc_session::session::{FileStorage, SessionStore};
//!
//! let session = Arc::new(SessionStore::new(Arc::new(FileStorage::new(".session"))));
//! session.login(access_token);
//! assert!(session.is_authenticated());
//! ```

mod clock;
mod storage;
mod store;

pub use clock::{Clock, SystemClock};
pub use storage::{CredentialStorage, FileStorage, MemoryStorage};
pub use store::{SessionState, SessionStore};
