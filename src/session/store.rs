use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

use super::clock::{Clock, SystemClock};
use super::storage::CredentialStorage;
use crate::token::{self, IdentityClaims};
use crate::types::{CLAIMS_KEY, CREDENTIAL_KEY, Credential};

/// Snapshot of the session at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub credential: Option<Credential>,
    pub claims: Option<IdentityClaims>,
    pub authenticated: bool,
}

/// Single source of truth for authentication state.
///
/// Construct one per application and share it as `Arc<SessionStore>` with the
/// guards and the request interceptor. Every mutation happens under one lock
/// and publishes to the watch channels before returning, so subscribers never
/// miss a change and new subscribers always see the latest value.
pub struct SessionStore {
    storage: Arc<dyn CredentialStorage>,
    clock: Arc<dyn Clock>,
    credential: Mutex<Option<Credential>>,
    authenticated: watch::Sender<bool>,
    claims: watch::Sender<Option<IdentityClaims>>,
}

impl SessionStore {
    /// Create a store backed by `storage`, restoring any persisted session.
    #[must_use]
    pub fn new(storage: Arc<dyn CredentialStorage>) -> Self {
        Self::with_clock(storage, Arc::new(SystemClock))
    }

    /// Like [`new`](Self::new) with a custom time source for expiry checks.
    #[must_use]
    pub fn with_clock(storage: Arc<dyn CredentialStorage>, clock: Arc<dyn Clock>) -> Self {
        let (credential, claims) = restore(storage.as_ref());
        let authenticated = credential
            .as_ref()
            .is_some_and(|c| is_valid_at(c, clock.now()));

        Self {
            storage,
            clock,
            credential: Mutex::new(credential),
            authenticated: watch::channel(authenticated).0,
            claims: watch::channel(claims).0,
        }
    }

    /// Store a freshly issued credential and publish the new state.
    ///
    /// A credential whose claims cannot be decoded is still stored, with no
    /// claims. The published authenticated flag reflects the credential's
    /// expiry, so an already expired credential is stored but not trusted.
    pub fn login(&self, credential: impl Into<Credential>) -> SessionState {
        let credential = credential.into();
        let mut current = self.lock();

        let decoded = match token::decode(credential.as_str()) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                tracing::warn!(error = %e, "Credential claims could not be decoded; storing without claims");
                None
            }
        };
        let authenticated = decoded
            .as_ref()
            .is_some_and(|d| !d.is_expired_at(self.clock.now()));
        let claims = decoded.map(|d| d.claims);

        self.persist(&credential, claims.as_ref());

        *current = Some(credential.clone());
        self.claims.send_replace(claims.clone());
        self.authenticated.send_replace(authenticated);

        tracing::info!(
            subject = claims.as_ref().map(IdentityClaims::subject),
            authenticated,
            "Session established"
        );

        SessionState {
            credential: Some(credential),
            claims,
            authenticated,
        }
    }

    /// Clear the credential and claims and publish the cleared state.
    ///
    /// Idempotent. Returns `true` only for the call that actually changed
    /// something; later calls leave subscribers undisturbed.
    pub fn logout(&self) -> bool {
        let mut current = self.lock();

        for key in [CREDENTIAL_KEY, CLAIMS_KEY] {
            if let Err(e) = self.storage.remove(key) {
                tracing::warn!(error = %e, key, "Failed to remove persisted session entry");
            }
        }

        let had_credential = current.take().is_some();
        let had_claims = self.claims.send_if_modified(|claims| claims.take().is_some());
        let was_authenticated =
            self.authenticated
                .send_if_modified(|authenticated| std::mem::replace(authenticated, false));

        let cleared = had_credential || had_claims || was_authenticated;
        if cleared {
            tracing::info!("Session cleared");
        }
        cleared
    }

    /// Whether a non-expired credential is stored.
    ///
    /// Recomputed on every call against the persisted credential, so entries
    /// edited or removed outside this store are picked up here. If the answer
    /// differs from the last published flag (typically because the credential
    /// expired since), the corrected flag is published before returning.
    pub fn is_authenticated(&self) -> bool {
        let mut current = self.lock();
        self.resync(&mut current);

        let valid = current
            .as_ref()
            .is_some_and(|c| is_valid_at(c, self.clock.now()));

        let corrected = self.authenticated.send_if_modified(|authenticated| {
            if *authenticated == valid {
                return false;
            }
            *authenticated = valid;
            true
        });
        if corrected {
            tracing::debug!(authenticated = valid, "Republished corrected authentication state");
        }
        valid
    }

    /// True iff the claims' authority is `ROLE_<ROLE>`; `role` is matched case-insensitively.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        let expected = format!("ROLE_{}", role.to_uppercase());
        self.claims
            .borrow()
            .as_ref()
            .is_some_and(|claims| claims.authority() == expected)
    }

    /// Issuer-asserted administrator flag. Independent of [`has_role`](Self::has_role).
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.claims
            .borrow()
            .as_ref()
            .is_some_and(IdentityClaims::is_admin)
    }

    /// Copy of the stored credential.
    #[must_use]
    pub fn credential(&self) -> Option<Credential> {
        self.lock().clone()
    }

    /// Copy of the current claims.
    #[must_use]
    pub fn claims(&self) -> Option<IdentityClaims> {
        self.claims.borrow().clone()
    }

    /// Consistent snapshot of credential, claims and the last published flag.
    #[must_use]
    pub fn state(&self) -> SessionState {
        let current = self.lock();
        SessionState {
            credential: current.clone(),
            claims: self.claims.borrow().clone(),
            authenticated: *self.authenticated.borrow(),
        }
    }

    /// Stream of the authenticated flag. The latest value is readable immediately.
    #[must_use]
    pub fn subscribe_authenticated(&self) -> watch::Receiver<bool> {
        self.authenticated.subscribe()
    }

    /// Stream of the current claims. The latest value is readable immediately.
    #[must_use]
    pub fn subscribe_claims(&self) -> watch::Receiver<Option<IdentityClaims>> {
        self.claims.subscribe()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Credential>> {
        self.credential.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, credential: &Credential, claims: Option<&IdentityClaims>) {
        if let Err(e) = self.storage.store(CREDENTIAL_KEY, credential.as_str()) {
            tracing::warn!(error = %e, "Failed to persist credential");
        }
        self.persist_claims(claims);
    }

    fn persist_claims(&self, claims: Option<&IdentityClaims>) {
        let result = match claims.map(serde_json::to_string) {
            Some(Ok(json)) => self.storage.store(CLAIMS_KEY, &json),
            Some(Err(e)) => Err(e.into()),
            None => self.storage.remove(CLAIMS_KEY),
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to persist identity claims");
        }
    }

    /// Aligns the in-memory credential with the persisted one.
    ///
    /// A read failure keeps the in-memory credential. A removed entry clears
    /// the session; a replaced one is adopted and its claims re-derived.
    fn resync(&self, current: &mut Option<Credential>) {
        let stored = match self.storage.load(CREDENTIAL_KEY) {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read persisted credential; using in-memory session");
                return;
            }
        };
        if stored.as_deref() == current.as_ref().map(Credential::as_str) {
            return;
        }

        let claims = match stored {
            Some(raw) => {
                tracing::warn!("Persisted credential changed outside the session; reloading");
                let claims = match token::decode(&raw) {
                    Ok(decoded) => Some(decoded.claims),
                    Err(e) => {
                        tracing::warn!(error = %e, "Persisted credential claims could not be decoded");
                        None
                    }
                };
                *current = Some(Credential::from(raw));
                claims
            }
            None => {
                tracing::warn!("Persisted credential removed outside the session; clearing");
                *current = None;
                None
            }
        };

        self.persist_claims(claims.as_ref());
        self.claims.send_if_modified(|published| {
            if *published == claims {
                return false;
            }
            *published = claims;
            true
        });
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

fn is_valid_at(credential: &Credential, now: i64) -> bool {
    token::decode(credential.as_str()).is_ok_and(|d| !d.is_expired_at(now))
}

/// Reads both persisted keys. Claims are always re-derived from the stored
/// credential; a claims entry that disagrees with it, or has no credential, is
/// rewritten or dropped.
fn restore(storage: &dyn CredentialStorage) -> (Option<Credential>, Option<IdentityClaims>) {
    let load = |key: &str| {
        storage.load(key).unwrap_or_else(|e| {
            tracing::warn!(error = %e, key, "Failed to read persisted session entry");
            None
        })
    };

    let stored_claims = load(CLAIMS_KEY);
    let Some(credential) = load(CREDENTIAL_KEY).map(Credential::from) else {
        if stored_claims.is_some() {
            tracing::warn!("Dropping persisted claims without a credential");
            if let Err(e) = storage.remove(CLAIMS_KEY) {
                tracing::warn!(error = %e, "Failed to remove orphaned claims");
            }
        }
        return (None, None);
    };

    let claims = match token::decode(credential.as_str()) {
        Ok(decoded) => Some(decoded.claims),
        Err(e) => {
            tracing::warn!(error = %e, "Persisted credential claims could not be decoded");
            None
        }
    };

    let expected = claims.as_ref().and_then(|c| serde_json::to_string(c).ok());
    if stored_claims != expected {
        let result = match &expected {
            Some(json) => storage.store(CLAIMS_KEY, json),
            None => storage.remove(CLAIMS_KEY),
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to resync persisted claims");
        }
    }

    (Some(credential), claims)
}
