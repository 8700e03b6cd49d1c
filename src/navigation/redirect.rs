use url::form_urlencoded;

use super::config::NavigationConfig;

/// A navigation about to happen: the requested URL and the roles its route requires.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigationRequest {
    url: String,
    required_roles: Vec<String>,
}

impl NavigationRequest {
    /// `url` is the path plus query string, e.g. `/users/details/bob?tab=2`.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            required_roles: Vec::new(),
        }
    }

    /// Roles from the destination's route configuration (any one suffices).
    #[must_use]
    pub fn with_required_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_roles = roles.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn required_roles(&self) -> &[String] {
        &self.required_roles
    }

    /// First value of a query parameter in the requested URL.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<String> {
        let (_, query) = self.url.split_once('?')?;
        form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }
}

/// Where to send the subject instead of the requested destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    destination: String,
    return_to: Option<String>,
    return_param: String,
}

impl Redirect {
    /// Redirect to the login screen, remembering `return_to` when given.
    #[must_use]
    pub fn login(config: &NavigationConfig, return_to: Option<&str>) -> Self {
        Self {
            destination: config.login_path.clone(),
            return_to: return_to.map(str::to_owned),
            return_param: config.return_param.clone(),
        }
    }

    /// Redirect to the screen shown for authorization failures.
    #[must_use]
    pub fn unauthorized(config: &NavigationConfig) -> Self {
        Self::to(config, &config.unauthorized_path)
    }

    /// Redirect to an arbitrary destination with no return target.
    #[must_use]
    pub fn to(config: &NavigationConfig, destination: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            return_to: None,
            return_param: config.return_param.clone(),
        }
    }

    #[must_use]
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Originally requested URL to resume after re-authenticating.
    #[must_use]
    pub fn return_to(&self) -> Option<&str> {
        self.return_to.as_deref()
    }

    /// Destination with the return target encoded as a query parameter.
    #[must_use]
    pub fn to_url(&self) -> String {
        match &self.return_to {
            Some(target) => format!(
                "{}?{}={}",
                self.destination,
                self.return_param,
                urlencoding::encode(target)
            ),
            None => self.destination.clone(),
        }
    }
}

/// Result of evaluating a route guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    Proceed,
    Redirect(Redirect),
}

impl GuardOutcome {
    #[must_use]
    pub fn is_proceed(&self) -> bool {
        matches!(self, Self::Proceed)
    }

    #[must_use]
    pub fn redirect(&self) -> Option<&Redirect> {
        match self {
            Self::Proceed => None,
            Self::Redirect(redirect) => Some(redirect),
        }
    }
}

/// Routing layer hook used when a redirect must happen outside a guard
/// evaluation, e.g. after the server rejected the credential.
pub trait Navigator: Send + Sync + 'static {
    fn navigate(&self, redirect: &Redirect);
}
