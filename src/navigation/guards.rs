use std::sync::Arc;

use super::config::NavigationConfig;
use super::redirect::{GuardOutcome, NavigationRequest, Redirect};
use crate::session::SessionStore;

/// Predicate consulted before a navigation completes.
///
/// Guards only read the session; they never change it and never touch the
/// network. Evaluation always resolves to exactly one outcome.
pub trait RouteGuard: Send + Sync {
    fn can_activate(&self, request: &NavigationRequest) -> GuardOutcome;
}

/// Evaluate `guards` in order; the first redirect wins.
pub fn evaluate(guards: &[&dyn RouteGuard], request: &NavigationRequest) -> GuardOutcome {
    guards
        .iter()
        .map(|guard| guard.can_activate(request))
        .find(|outcome| !outcome.is_proceed())
        .unwrap_or(GuardOutcome::Proceed)
}

/// Passes authenticated subjects; others go to login with a return target.
#[derive(Debug, Clone)]
pub struct AuthGuard {
    session: Arc<SessionStore>,
    config: NavigationConfig,
}

impl AuthGuard {
    #[must_use]
    pub fn new(session: Arc<SessionStore>, config: NavigationConfig) -> Self {
        Self { session, config }
    }
}

impl RouteGuard for AuthGuard {
    fn can_activate(&self, request: &NavigationRequest) -> GuardOutcome {
        if self.session.is_authenticated() {
            return GuardOutcome::Proceed;
        }

        // One value from the stream, then the receiver is dropped.
        let authenticated = *self.session.subscribe_authenticated().borrow_and_update();
        if authenticated {
            return GuardOutcome::Proceed;
        }

        tracing::debug!(url = request.url(), "Unauthenticated navigation redirected to login");
        GuardOutcome::Redirect(Redirect::login(&self.config, Some(request.url())))
    }
}

/// Passes authenticated administrators; others go to login with a return target.
#[derive(Debug, Clone)]
pub struct AdminGuard {
    session: Arc<SessionStore>,
    config: NavigationConfig,
}

impl AdminGuard {
    #[must_use]
    pub fn new(session: Arc<SessionStore>, config: NavigationConfig) -> Self {
        Self { session, config }
    }
}

impl RouteGuard for AdminGuard {
    fn can_activate(&self, request: &NavigationRequest) -> GuardOutcome {
        if self.session.is_authenticated() && self.session.is_admin() {
            return GuardOutcome::Proceed;
        }

        let authenticated = *self.session.subscribe_authenticated().borrow_and_update();
        let is_admin = self
            .session
            .subscribe_claims()
            .borrow_and_update()
            .as_ref()
            .is_some_and(|claims| claims.is_admin());
        if authenticated && is_admin {
            return GuardOutcome::Proceed;
        }

        tracing::debug!(url = request.url(), "Non-administrator navigation redirected to login");
        GuardOutcome::Redirect(Redirect::login(&self.config, Some(request.url())))
    }
}

/// Passes subjects holding at least one of the request's required roles.
///
/// Unauthenticated subjects go to login; authenticated subjects lacking every
/// required role go to the unauthorized screen.
#[derive(Debug, Clone)]
pub struct RoleGuard {
    session: Arc<SessionStore>,
    config: NavigationConfig,
}

impl RoleGuard {
    #[must_use]
    pub fn new(session: Arc<SessionStore>, config: NavigationConfig) -> Self {
        Self { session, config }
    }
}

impl RouteGuard for RoleGuard {
    fn can_activate(&self, request: &NavigationRequest) -> GuardOutcome {
        if !self.session.is_authenticated() {
            return GuardOutcome::Redirect(Redirect::login(&self.config, None));
        }

        let required = request.required_roles();
        if required.is_empty() || required.iter().any(|role| self.session.has_role(role)) {
            return GuardOutcome::Proceed;
        }

        tracing::debug!(url = request.url(), ?required, "Navigation lacks a required role");
        GuardOutcome::Redirect(Redirect::unauthorized(&self.config))
    }
}

/// Keeps authenticated subjects away from the login and registration screens.
///
/// They are sent on to the request's return target, or home when there is none.
#[derive(Debug, Clone)]
pub struct GuestGuard {
    session: Arc<SessionStore>,
    config: NavigationConfig,
}

impl GuestGuard {
    #[must_use]
    pub fn new(session: Arc<SessionStore>, config: NavigationConfig) -> Self {
        Self { session, config }
    }
}

impl RouteGuard for GuestGuard {
    fn can_activate(&self, request: &NavigationRequest) -> GuardOutcome {
        if !self.session.is_authenticated() {
            return GuardOutcome::Proceed;
        }

        let target = request
            .query_param(&self.config.return_param)
            .filter(|target| target.starts_with('/') && !target.starts_with("//"))
            .unwrap_or_else(|| self.config.home_path.clone());
        GuardOutcome::Redirect(Redirect::to(&self.config, target))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::session::MemoryStorage;
    use crate::token::testing::{credential, now, valid_credential};

    fn session() -> Arc<SessionStore> {
        Arc::new(SessionStore::new(Arc::new(MemoryStorage::new())))
    }

    fn logged_in(authority: &str, is_admin: bool) -> Arc<SessionStore> {
        let session = session();
        session.login(valid_credential(authority, is_admin));
        session
    }

    fn login_redirect(return_to: Option<&str>) -> GuardOutcome {
        GuardOutcome::Redirect(Redirect::login(&NavigationConfig::default(), return_to))
    }

    #[test]
    fn auth_guard_redirects_anonymous_with_return_url() {
        let guard = AuthGuard::new(session(), NavigationConfig::default());

        let outcome = guard.can_activate(&NavigationRequest::new("/users/details/bob"));

        assert_eq!(outcome, login_redirect(Some("/users/details/bob")));
        assert_eq!(
            outcome.redirect().unwrap().to_url(),
            "/auth/login?returnUrl=%2Fusers%2Fdetails%2Fbob"
        );
    }

    #[test]
    fn auth_guard_passes_authenticated() {
        let guard = AuthGuard::new(logged_in("ROLE_USER", false), NavigationConfig::default());
        assert!(guard.can_activate(&NavigationRequest::new("/dashboard")).is_proceed());
    }

    #[test]
    fn auth_guard_rejects_expired_credential() {
        let session = session();
        session.login(credential(&json!({"sub": "alice", "exp": now() - 1})));
        let guard = AuthGuard::new(session.clone(), NavigationConfig::default());

        let outcome = guard.can_activate(&NavigationRequest::new("/dashboard"));

        assert_eq!(outcome, login_redirect(Some("/dashboard")));
        assert!(!*session.subscribe_authenticated().borrow());
    }

    #[test]
    fn admin_guard_passes_admin() {
        let guard = AdminGuard::new(logged_in("ROLE_ADMIN", true), NavigationConfig::default());
        assert!(guard.can_activate(&NavigationRequest::new("/users")).is_proceed());
    }

    #[test]
    fn admin_guard_uses_flag_not_authority() {
        let guard = AdminGuard::new(logged_in("ROLE_ADMIN", false), NavigationConfig::default());
        assert_eq!(
            guard.can_activate(&NavigationRequest::new("/users")),
            login_redirect(Some("/users"))
        );
    }

    #[test]
    fn admin_guard_redirects_anonymous() {
        let guard = AdminGuard::new(session(), NavigationConfig::default());
        assert_eq!(
            guard.can_activate(&NavigationRequest::new("/users/create")),
            login_redirect(Some("/users/create"))
        );
    }

    #[test]
    fn role_guard_redirects_anonymous_to_login_without_return() {
        let guard = RoleGuard::new(session(), NavigationConfig::default());
        let request = NavigationRequest::new("/users").with_required_roles(["admin"]);
        assert_eq!(guard.can_activate(&request), login_redirect(None));
    }

    #[test]
    fn role_guard_passes_when_no_roles_required() {
        let guard = RoleGuard::new(logged_in("ROLE_USER", false), NavigationConfig::default());
        assert!(guard.can_activate(&NavigationRequest::new("/dashboard")).is_proceed());
    }

    #[test]
    fn role_guard_requires_any_of_the_roles() {
        let guard = RoleGuard::new(logged_in("ROLE_MODERATOR", false), NavigationConfig::default());
        let request = NavigationRequest::new("/moderation").with_required_roles(["admin", "Moderator"]);
        assert!(guard.can_activate(&request).is_proceed());
    }

    #[test]
    fn admin_passes_admin_guard_but_not_unrelated_role_guard() {
        let session = session();
        session.login(credential(&json!({
            "sub": "alice",
            "authority": "ROLE_ADMIN",
            "isAdmin": true,
            "exp": now() + 3600,
        })));
        let config = NavigationConfig::default();

        let admin = AdminGuard::new(session.clone(), config.clone());
        assert!(admin.can_activate(&NavigationRequest::new("/users")).is_proceed());

        let role = RoleGuard::new(session, config.clone());
        let request = NavigationRequest::new("/moderation").with_required_roles(["moderator"]);
        assert_eq!(
            role.can_activate(&request),
            GuardOutcome::Redirect(Redirect::unauthorized(&config))
        );
    }

    #[test]
    fn guest_guard_lets_anonymous_reach_login() {
        let guard = GuestGuard::new(session(), NavigationConfig::default());
        assert!(guard.can_activate(&NavigationRequest::new("/auth/login")).is_proceed());
    }

    #[test]
    fn guest_guard_sends_authenticated_to_return_url_or_home() {
        let guard = GuestGuard::new(logged_in("ROLE_USER", false), NavigationConfig::default());

        let outcome = guard.can_activate(&NavigationRequest::new("/auth/login?returnUrl=%2Fusers"));
        assert_eq!(outcome.redirect().unwrap().to_url(), "/users");

        let outcome = guard.can_activate(&NavigationRequest::new("/auth/login"));
        assert_eq!(outcome.redirect().unwrap().to_url(), "/dashboard");
    }

    #[test]
    fn guest_guard_ignores_external_return_url() {
        let guard = GuestGuard::new(logged_in("ROLE_USER", false), NavigationConfig::default());
        let request = NavigationRequest::new("/auth/login?returnUrl=https%3A%2F%2Fevil.example");
        assert_eq!(guard.can_activate(&request).redirect().unwrap().to_url(), "/dashboard");
    }

    #[test]
    fn evaluate_returns_first_redirect() {
        let session = logged_in("ROLE_USER", false);
        let config = NavigationConfig::default();
        let auth = AuthGuard::new(session.clone(), config.clone());
        let role = RoleGuard::new(session.clone(), config.clone());
        let admin = AdminGuard::new(session, config.clone());
        let request = NavigationRequest::new("/users").with_required_roles(["admin"]);

        assert_eq!(
            evaluate(&[&auth, &role, &admin], &request),
            GuardOutcome::Redirect(Redirect::unauthorized(&config))
        );
        assert!(evaluate(&[&auth], &request).is_proceed());
        assert!(evaluate(&[], &request).is_proceed());
    }
}
