#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The authorization server answered a token request with a non-success status.
    #[error("{operation} failed (status {status:?}): {detail}")]
    OAuth {
        operation: &'static str,
        status: Option<u16>,
        detail: String,
    },
    #[cfg(feature = "http")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// An API call returned a non-success status other than 401/403.
    #[error("API request failed (status {status}): {detail}")]
    Api { status: u16, detail: String },
    /// The server rejected the credential; the session has been cleared.
    #[error("Credential rejected by server: {url}")]
    Unauthorized { url: String },
    /// The server refused the request for the current subject; the session is untouched.
    #[error("Permission denied by server: {url}")]
    Forbidden { url: String },
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// HTTP status code carried by this error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::OAuth { status, .. } => *status,
            Self::Api { status, .. } => Some(*status),
            Self::Unauthorized { .. } => Some(401),
            Self::Forbidden { .. } => Some(403),
            _ => None,
        }
    }
}
