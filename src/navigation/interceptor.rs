use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::{Method, Request, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use super::config::NavigationConfig;
use super::redirect::{Navigator, Redirect};
use crate::error::Error;
use crate::session::SessionStore;

const REGISTER_PATH: &str = "/profil/register";
const ADMIN_CREATE_PATH: &str = "/profil/admin/create";

/// Endpoints that never receive the bearer credential.
pub const DEFAULT_EXCLUDED_ENDPOINTS: &[&str] =
    &["/authorize/token", REGISTER_PATH, ADMIN_CREATE_PATH];

/// Attaches the session credential to outgoing requests and reacts to
/// authorization failures in the responses.
pub struct AuthInterceptor {
    session: Arc<SessionStore>,
    navigator: Arc<dyn Navigator>,
    config: NavigationConfig,
    excluded: Vec<String>,
}

impl AuthInterceptor {
    #[must_use]
    pub fn new(
        session: Arc<SessionStore>,
        navigator: Arc<dyn Navigator>,
        config: NavigationConfig,
    ) -> Self {
        Self {
            session,
            navigator,
            config,
            excluded: DEFAULT_EXCLUDED_ENDPOINTS
                .iter()
                .map(|&e| e.to_owned())
                .collect(),
        }
    }

    /// Replace the exclusion list. Entries match anywhere in the URL path.
    #[must_use]
    pub fn with_excluded_endpoints<I, S>(mut self, endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded = endpoints.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn is_excluded(&self, url: &Url) -> bool {
        let path = url.path();
        self.excluded.iter().any(|endpoint| path.contains(endpoint.as_str()))
    }

    /// Add `Authorization: Bearer <credential>` unless the endpoint is excluded
    /// or no credential is stored. Returns whether the header was added.
    pub fn authorize(&self, request: &mut Request) -> bool {
        if self.is_excluded(request.url()) {
            return false;
        }
        let Some(credential) = self.session.credential() else {
            return false;
        };

        match HeaderValue::from_str(&format!("Bearer {}", credential.as_str())) {
            Ok(mut value) => {
                value.set_sensitive(true);
                request.headers_mut().insert(AUTHORIZATION, value);
                true
            }
            Err(_) => {
                tracing::warn!(url = %request.url(), "Stored credential is not a valid header value; sending request without it");
                false
            }
        }
    }

    /// Translate authorization failures for a request sent to `url`.
    ///
    /// 401 clears the session and redirects to login; only the response that
    /// actually cleared it triggers the redirect. 403 is surfaced as
    /// [`Error::Forbidden`] and leaves the session alone. Responses from
    /// excluded endpoints are passed through untouched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] or [`Error::Forbidden`] as described above.
    pub fn inspect(&self, url: &Url, response: Response) -> Result<Response, Error> {
        if self.is_excluded(url) {
            return Ok(response);
        }

        match response.status() {
            StatusCode::UNAUTHORIZED => {
                if self.session.logout() {
                    tracing::warn!(url = %url, "Credential rejected by server; session cleared");
                    self.navigator.navigate(&Redirect::login(&self.config, None));
                }
                Err(Error::Unauthorized { url: url.to_string() })
            }
            StatusCode::FORBIDDEN => {
                tracing::warn!(url = %url, "Permission denied by server");
                Err(Error::Forbidden { url: url.to_string() })
            }
            _ => Ok(response),
        }
    }
}

/// HTTP client for the auction API that runs every call through an [`AuthInterceptor`].
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    interceptor: AuthInterceptor,
}

impl ApiClient {
    #[must_use]
    pub fn new(base_url: Url, interceptor: AuthInterceptor) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            interceptor,
        }
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    #[must_use]
    pub fn interceptor(&self) -> &AuthInterceptor {
        &self.interceptor
    }

    /// Resolve `path` against the API base URL, keeping any base path prefix.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the result is not a valid URL.
    pub fn url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
            .parse()
            .map_err(|e| Error::Config(format!("invalid API path {path:?}: {e}")))
    }

    /// Send a prepared request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or the interceptor's
    /// [`Error::Unauthorized`] / [`Error::Forbidden`].
    pub async fn execute(&self, mut request: Request) -> Result<Response, Error> {
        let url = request.url().clone();
        if self.interceptor.authorize(&mut request) {
            tracing::debug!(url = %url, "Attached bearer credential");
        }
        let response = self.http.execute(request).await?;
        self.interceptor.inspect(&url, response)
    }

    /// `GET` a JSON resource.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute); non-success statuses become [`Error::Api`].
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let request = self.http.get(self.url(path)?).build()?;
        let response = Self::ensure_success(self.execute(request).await?).await?;
        response.json::<T>().await.map_err(Into::into)
    }

    /// `POST` a JSON body and decode a JSON response.
    ///
    /// # Errors
    ///
    /// See [`get_json`](Self::get_json).
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, Error>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.http.post(self.url(path)?).json(body).build()?;
        let response = Self::ensure_success(self.execute(request).await?).await?;
        response.json::<T>().await.map_err(Into::into)
    }

    /// Create an account through the public sign-up endpoint.
    ///
    /// The endpoint is excluded from credential attachment, so this works
    /// with or without a session.
    ///
    /// # Errors
    ///
    /// See [`get_json`](Self::get_json).
    pub async fn register<B>(&self, account: &B) -> Result<serde_json::Value, Error>
    where
        B: Serialize + ?Sized,
    {
        self.post_json(REGISTER_PATH, account).await
    }

    /// Create an account from the administration screens.
    ///
    /// # Errors
    ///
    /// See [`get_json`](Self::get_json).
    pub async fn create_user_as_admin<B>(&self, account: &B) -> Result<serde_json::Value, Error>
    where
        B: Serialize + ?Sized,
    {
        self.post_json(ADMIN_CREATE_PATH, account).await
    }

    /// Send a body-less request and discard the response body.
    ///
    /// # Errors
    ///
    /// See [`get_json`](Self::get_json).
    pub async fn send(&self, method: Method, path: &str) -> Result<(), Error> {
        let request = self.http.request(method, self.url(path)?).build()?;
        Self::ensure_success(self.execute(request).await?).await?;
        Ok(())
    }

    async fn ensure_success(response: Response) -> Result<Response, Error> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let detail = response.text().await.unwrap_or_default();
        Err(Error::Api { status, detail })
    }
}
