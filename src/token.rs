use base64::Engine;
use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use serde::Serialize;
use serde_json::Value as JsonValue;

/// Why a credential's claims segment could not be read.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("expected 3 segments, found {0}")]
    SegmentCount(usize),
    #[error("claims segment is not valid base64")]
    Base64,
    #[error("claims segment is not valid JSON: {0}")]
    Json(String),
    #[error("claims segment is not a JSON object")]
    NotAnObject,
}

/// Identity claims read from a credential payload.
///
/// Only [`decode`] produces these. The signature is never checked client-side,
/// so the values are exactly as trustworthy as the server that issued the
/// credential, and no more.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityClaims {
    #[serde(rename = "clientId")]
    subject: String,
    scope: String,
    authority: String,
    is_admin: bool,
}

impl IdentityClaims {
    /// Subject identifier (`client_id`, falling back to `sub`).
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Raw space-delimited grant list.
    #[must_use]
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Individual grants from [`scope`](Self::scope).
    pub fn scopes(&self) -> impl Iterator<Item = &str> {
        self.scope.split_whitespace()
    }

    /// Single role name, conventionally `ROLE_<NAME>`.
    #[must_use]
    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Administrator flag asserted by the issuer.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.is_admin
    }
}

/// Result of decoding a credential: its claims plus the expiry timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedCredential {
    pub claims: IdentityClaims,
    /// `exp` claim in Unix seconds. `None` when absent or not a number.
    pub expires_at: Option<i64>,
}

impl DecodedCredential {
    /// True unless `exp` is present and strictly after `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at.is_none_or(|exp| exp <= now)
    }
}

/// Decodes the claims segment of a `header.payload.signature` credential.
///
/// No signature verification happens here.
///
/// # Errors
///
/// Returns [`DecodeError`] if the credential does not have three segments, the
/// middle segment is not base64, or it does not hold a JSON object.
pub fn decode(credential: &str) -> Result<DecodedCredential, DecodeError> {
    let payload = decode_payload(credential)?;

    let subject = string_claim(&payload, "client_id")
        .or_else(|| string_claim(&payload, "sub"))
        .unwrap_or_default();

    let claims = IdentityClaims {
        subject,
        scope: string_claim(&payload, "scope").unwrap_or_default(),
        authority: string_claim(&payload, "authority").unwrap_or_default(),
        is_admin: payload
            .get("isAdmin")
            .and_then(JsonValue::as_bool)
            .unwrap_or(false),
    };

    Ok(DecodedCredential {
        claims,
        expires_at: expiry_claim(&payload),
    })
}

fn decode_payload(credential: &str) -> Result<JsonValue, DecodeError> {
    let parts: Vec<&str> = credential.trim().split('.').collect();
    if parts.len() != 3 {
        return Err(DecodeError::SegmentCount(parts.len()));
    }

    let segment = parts[1].trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .or_else(|_| STANDARD_NO_PAD.decode(segment))
        .map_err(|_| DecodeError::Base64)?;

    let payload: JsonValue =
        serde_json::from_slice(&bytes).map_err(|e| DecodeError::Json(e.to_string()))?;
    if !payload.is_object() {
        return Err(DecodeError::NotAnObject);
    }
    Ok(payload)
}

fn string_claim(payload: &JsonValue, key: &str) -> Option<String> {
    payload.get(key).and_then(JsonValue::as_str).map(str::to_owned)
}

#[allow(clippy::cast_possible_truncation)]
fn expiry_claim(payload: &JsonValue) -> Option<i64> {
    let exp = payload.get("exp")?;
    exp.as_i64()
        .or_else(|| exp.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
}
