use serde::Deserialize;
use url::Url;

use crate::error::Error;
use crate::session::SessionStore;

/// Token endpoint configuration for the auction API.
///
/// ```rust,ignore
/// use troc_session::OAuthConfig;
///
/// let config = OAuthConfig::new("http://localhost:8080".parse()?);
/// assert_eq!(config.token_url().as_str(), "http://localhost:8080/authorize/token");
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct OAuthConfig {
    pub(crate) token_url: Url,
    pub(crate) scope: String,
}

impl OAuthConfig {
    /// Derive the token endpoint (`<base>/authorize/token`) from the API base URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `api_base_url` cannot be a base URL.
    pub fn new(api_base_url: &Url) -> Result<Self, Error> {
        let token_url = format!(
            "{}/authorize/token",
            api_base_url.as_str().trim_end_matches('/')
        )
        .parse()
        .map_err(|e| Error::Config(format!("token URL: {e}")))?;

        Ok(Self {
            token_url,
            scope: "access".into(),
        })
    }

    /// Override the token endpoint.
    #[must_use]
    pub fn with_token_url(mut self, url: Url) -> Self {
        self.token_url = url;
        self
    }

    /// Override the requested scope (default: `access`).
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    #[must_use]
    pub fn token_url(&self) -> &Url {
        &self.token_url
    }

    #[must_use]
    pub fn scope(&self) -> &str {
        &self.scope
    }
}

/// Client id and secret typed into the login form.
#[derive(Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl ClientCredentials {
    #[must_use]
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .finish()
    }
}

/// Token response from the `/authorize/token` endpoint.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Client-credentials token client.
pub struct AuthClient {
    config: OAuthConfig,
    http: reqwest::Client,
}

impl AuthClient {
    #[must_use]
    pub fn new(config: OAuthConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    #[must_use]
    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Form parameters sent to the token endpoint.
    fn token_params<'a>(&'a self, credentials: &'a ClientCredentials) -> [(&'static str, &'a str); 4] {
        [
            ("grant_type", "client_credentials"),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("scope", self.config.scope.as_str()),
        ]
    }

    /// Exchange client credentials for an access token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or
    /// [`Error::OAuth`] if the token endpoint returns an error.
    pub async fn request_token(&self, credentials: &ClientCredentials) -> Result<TokenResponse, Error> {
        let response = self
            .http
            .post(self.config.token_url.clone())
            .form(&self.token_params(credentials))
            .send()
            .await?;

        let response = Self::ensure_success(response, "token request").await?;
        response.json::<TokenResponse>().await.map_err(Into::into)
    }

    /// Request a token and open a session with it.
    ///
    /// Any failure clears `session` before the error is returned, so a failed
    /// login never leaves a previous subject signed in.
    ///
    /// # Errors
    ///
    /// See [`request_token`](Self::request_token).
    pub async fn login(
        &self,
        session: &SessionStore,
        credentials: &ClientCredentials,
    ) -> Result<TokenResponse, Error> {
        match self.request_token(credentials).await {
            Ok(token) => {
                session.login(token.access_token.as_str());
                Ok(token)
            }
            Err(e) => {
                tracing::warn!(error = %e, client_id = %credentials.client_id, "Login failed");
                session.logout();
                Err(e)
            }
        }
    }

    /// Checks HTTP response status; returns the response on success or an error with details.
    async fn ensure_success(
        response: reqwest::Response,
        operation: &'static str,
    ) -> Result<reqwest::Response, Error> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(Error::OAuth {
            operation,
            status: Some(status),
            detail: body,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::session::MemoryStorage;
    use crate::token::testing::valid_credential;

    fn base() -> Url {
        "http://localhost:8080".parse().unwrap()
    }

    #[test]
    fn test_config_derives_token_url() {
        let config = OAuthConfig::new(&base()).unwrap();
        assert_eq!(config.token_url().as_str(), "http://localhost:8080/authorize/token");
        assert_eq!(config.scope(), "access");

        let prefixed = OAuthConfig::new(&"https://api.example.com/v1/".parse().unwrap()).unwrap();
        assert_eq!(
            prefixed.token_url().as_str(),
            "https://api.example.com/v1/authorize/token"
        );
    }

    #[test]
    fn test_config_with_overrides() {
        let config = OAuthConfig::new(&base())
            .unwrap()
            .with_token_url("https://auth.example.com/token".parse().unwrap())
            .with_scope("access admin");

        assert_eq!(config.token_url().as_str(), "https://auth.example.com/token");
        assert_eq!(config.scope(), "access admin");
    }

    #[test]
    fn test_token_params_use_client_credentials_grant() {
        let client = AuthClient::new(OAuthConfig::new(&base()).unwrap());
        let credentials = ClientCredentials::new("alice", "s3cret");

        let params = client.token_params(&credentials);

        assert_eq!(
            params,
            [
                ("grant_type", "client_credentials"),
                ("client_id", "alice"),
                ("client_secret", "s3cret"),
                ("scope", "access"),
            ]
        );
    }

    #[test]
    fn test_credentials_debug_hides_secret() {
        let debug = format!("{:?}", ClientCredentials::new("alice", "s3cret"));
        assert!(debug.contains("alice"));
        assert!(!debug.contains("s3cret"));
    }

    #[test]
    fn test_token_response_deserializes() {
        let token: TokenResponse = serde_json::from_str(
            r#"{"access_token":"a.b.c","token_type":"Bearer","expires_in":3600,"scope":"access"}"#,
        )
        .unwrap();
        assert_eq!(token.access_token, "a.b.c");
        assert_eq!(token.expires_in, Some(3600));
        assert_eq!(token.scope.as_deref(), Some("access"));
    }

    #[tokio::test]
    async fn test_failed_login_clears_previous_session() {
        let session = SessionStore::new(Arc::new(MemoryStorage::new()));
        session.login(valid_credential("ROLE_USER", false));

        // Reserve a loopback port and release it so the connection is refused.
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let base = format!("http://127.0.0.1:{port}").parse().unwrap();
        let config = OAuthConfig::new(&base).unwrap();
        let http = reqwest::Client::builder().no_proxy().build().unwrap();
        let result = AuthClient::new(config)
            .with_http_client(http)
            .login(&session, &ClientCredentials::new("alice", "wrong"))
            .await;

        assert!(matches!(result, Err(Error::Http(_))));
        assert!(!session.is_authenticated());
        assert!(session.credential().is_none());
    }
}
