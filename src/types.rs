use derive_more::{From, Into};

/// Durable storage key holding the raw credential string.
pub const CREDENTIAL_KEY: &str = "oauth2_token";

/// Durable storage key holding the serialized identity claims.
pub const CLAIMS_KEY: &str = "user_info";

/// Opaque bearer credential issued by the authorization server.
///
/// The raw value never shows up in `Debug` output, so a `Credential` can sit
/// inside logged structures without leaking the token.
#[derive(Clone, PartialEq, Eq, Hash, From, Into)]
pub struct Credential(String);

impl Credential {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Credential {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_is_redacted() {
        let credential = Credential::from("header.payload.signature");
        assert_eq!(format!("{credential:?}"), "Credential(***)");
    }

    #[test]
    fn converts_to_and_from_string() {
        let credential = Credential::from("abc".to_string());
        assert_eq!(credential.as_str(), "abc");
        let raw: String = credential.into();
        assert_eq!(raw, "abc");
    }
}
