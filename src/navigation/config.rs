/// Destinations used by guards and the request interceptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationConfig {
    pub(crate) login_path: String,
    pub(crate) unauthorized_path: String,
    pub(crate) home_path: String,
    pub(crate) return_param: String,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            login_path: "/auth/login".into(),
            unauthorized_path: "/unauthorized".into(),
            home_path: "/dashboard".into(),
            return_param: "returnUrl".into(),
        }
    }
}

impl NavigationConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = path.into();
        self
    }

    #[must_use]
    pub fn with_unauthorized_path(mut self, path: impl Into<String>) -> Self {
        self.unauthorized_path = path.into();
        self
    }

    #[must_use]
    pub fn with_home_path(mut self, path: impl Into<String>) -> Self {
        self.home_path = path.into();
        self
    }

    /// Query parameter carrying the return target (default: `returnUrl`).
    #[must_use]
    pub fn with_return_param(mut self, name: impl Into<String>) -> Self {
        self.return_param = name.into();
        self
    }

    #[must_use]
    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    #[must_use]
    pub fn unauthorized_path(&self) -> &str {
        &self.unauthorized_path
    }

    /// Landing destination after login when no return target is known.
    #[must_use]
    pub fn home_path(&self) -> &str {
        &self.home_path
    }

    #[must_use]
    pub fn return_param(&self) -> &str {
        &self.return_param
    }
}
