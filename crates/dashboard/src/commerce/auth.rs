//! Commerce API authentication.
//!
//! The platform issues the application secret as a bcrypt salt string
//! (`$2a$NN$<22 chars>`). Each token request signs `{client_id}_{timestamp}`
//! by hashing it with that salt and submits the full hash string re-encoded
//! as standard Base64.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use base64::{alphabet, engine};
use bcrypt::Version;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::instrument;

use super::{API_BASE, CommerceError};

/// Token endpoint path.
const TOKEN_ENDPOINT: &str = "/v1/oauth2/token";

/// Signature timestamps are backdated to absorb clock skew against the
/// platform.
const CLOCK_SKEW_MS: i64 = 10_000;

/// Decoder for the bcrypt flavor of radix-64 used in salt strings. A 22-char
/// salt carries 16 bytes plus two trailing bits, which must be tolerated.
const BCRYPT_B64: engine::GeneralPurpose = engine::GeneralPurpose::new(
    &alphabet::BCRYPT,
    engine::GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(engine::DecodePaddingMode::RequireNone)
        .with_decode_allow_trailing_bits(true),
);

/// Bearer token issued by the token endpoint.
#[derive(Debug, Clone)]
pub struct AccessToken {
    /// Opaque bearer token for API requests.
    pub token: SecretString,
    /// Unix timestamp when the token expires.
    pub expires_at: i64,
}

impl AccessToken {
    /// Check if the token has expired (60 second safety margin).
    #[must_use]
    pub fn is_expired(&self) -> bool {
        let now = chrono::Utc::now().timestamp();
        now >= self.expires_at - 60
    }
}

/// Response from the token endpoint.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    /// Token lifetime in seconds. When the field is missing the token is
    /// treated as already expired and every call re-authenticates.
    #[serde(default)]
    expires_in: i64,
}

/// Decomposed bcrypt salt string.
#[derive(Debug)]
struct SaltParts {
    version: Version,
    cost: u32,
    salt: [u8; 16],
}

fn invalid_secret(detail: impl Into<String>) -> CommerceError {
    CommerceError::InvalidClientSecret(detail.into())
}

/// Split a `$2a$NN$<salt>` secret into its bcrypt pieces.
fn parse_client_secret(secret: &str) -> Result<SaltParts, CommerceError> {
    let rest = secret
        .strip_prefix('$')
        .ok_or_else(|| invalid_secret("missing '$' prefix"))?;
    let mut fields = rest.split('$');

    let version = match fields.next() {
        Some("2a") => Version::TwoA,
        Some("2b") => Version::TwoB,
        Some("2x") => Version::TwoX,
        Some("2y") => Version::TwoY,
        Some(other) => return Err(invalid_secret(format!("unsupported version '{other}'"))),
        None => return Err(invalid_secret("missing version field")),
    };

    let cost = fields
        .next()
        .ok_or_else(|| invalid_secret("missing cost field"))?
        .parse::<u32>()
        .map_err(|e| invalid_secret(format!("bad cost field: {e}")))?;

    let salt_b64 = fields
        .next()
        .ok_or_else(|| invalid_secret("missing salt field"))?
        .get(..22)
        .ok_or_else(|| invalid_secret("salt shorter than 22 characters"))?;

    let decoded = BCRYPT_B64
        .decode(salt_b64)
        .map_err(|e| invalid_secret(format!("salt is not bcrypt base64: {e}")))?;
    let salt: [u8; 16] = decoded
        .try_into()
        .map_err(|_| invalid_secret("salt does not decode to 16 bytes"))?;

    Ok(SaltParts { version, cost, salt })
}

/// Sign `{client_id}_{timestamp_ms}` with the client secret.
///
/// # Errors
///
/// Returns `CommerceError::InvalidClientSecret` when the secret does not
/// parse as a bcrypt salt string or its cost is out of range.
pub(crate) fn sign_token_request(
    client_id: &str,
    timestamp_ms: i64,
    client_secret: &SecretString,
) -> Result<String, CommerceError> {
    let parts = parse_client_secret(client_secret.expose_secret())?;
    let subject = format!("{client_id}_{timestamp_ms}");

    let hashed = bcrypt::hash_with_salt(&subject, parts.cost, parts.salt)
        .map_err(|e| invalid_secret(format!("hashing failed: {e}")))?;

    Ok(STANDARD.encode(hashed.format_for_version(parts.version)))
}

/// Exchange a signed request for a bearer token.
///
/// # Errors
///
/// Returns `CommerceError::InvalidClientSecret` without a network call when
/// the secret is malformed, and `CommerceError::AuthenticationFailed` when
/// the endpoint rejects the request or the response carries no token.
#[instrument(skip(client, client_secret), fields(client_id = %client_id))]
pub async fn authenticate(
    client: &reqwest::Client,
    client_id: &str,
    client_secret: &SecretString,
) -> Result<AccessToken, CommerceError> {
    let now = chrono::Utc::now();
    let timestamp_ms = now.timestamp_millis() - CLOCK_SKEW_MS;
    let signature = sign_token_request(client_id, timestamp_ms, client_secret)?;

    let timestamp = timestamp_ms.to_string();
    let params = [
        ("grant_type", "client_credentials"),
        ("client_id", client_id),
        ("timestamp", timestamp.as_str()),
        ("client_secret_sign", signature.as_str()),
        ("type", "SELF"),
    ];

    let response = client
        .post(format!("{API_BASE}{TOKEN_ENDPOINT}"))
        .form(&params)
        .send()
        .await?;

    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(CommerceError::AuthenticationFailed(format!(
            "HTTP {status}: {body}"
        )));
    }

    let token: TokenResponse = serde_json::from_str(&body).map_err(|e| {
        CommerceError::AuthenticationFailed(format!("unreadable token response: {e}"))
    })?;

    if token.access_token.is_empty() {
        return Err(CommerceError::AuthenticationFailed(
            "empty access token in response".to_string(),
        ));
    }

    Ok(AccessToken {
        token: SecretString::from(token.access_token),
        expires_at: now.timestamp() + token.expires_in,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // Cost 4 keeps the hash cheap in tests.
    const TEST_SECRET: &str = "$2a$04$N9qo8uLOickgx2ZMRZoMye";

    #[test]
    fn test_parse_client_secret_valid() {
        let parts = parse_client_secret(TEST_SECRET).unwrap();
        assert_eq!(parts.cost, 4);
        assert!(matches!(parts.version, Version::TwoA));
    }

    #[test]
    fn test_parse_client_secret_rejects_plain_string() {
        let err = parse_client_secret("not-a-bcrypt-salt").unwrap_err();
        assert!(matches!(err, CommerceError::InvalidClientSecret(_)));
    }

    #[test]
    fn test_parse_client_secret_rejects_unknown_version() {
        let err = parse_client_secret("$2z$04$N9qo8uLOickgx2ZMRZoMye").unwrap_err();
        assert!(err.to_string().contains("unsupported version"));
    }

    #[test]
    fn test_parse_client_secret_rejects_bad_cost() {
        let err = parse_client_secret("$2a$xx$N9qo8uLOickgx2ZMRZoMye").unwrap_err();
        assert!(err.to_string().contains("bad cost"));
    }

    #[test]
    fn test_parse_client_secret_rejects_short_salt() {
        let err = parse_client_secret("$2a$04$tooshort").unwrap_err();
        assert!(err.to_string().contains("22 characters"));
    }

    #[test]
    fn test_signature_is_deterministic() {
        let secret = SecretString::from(TEST_SECRET);
        let first = sign_token_request("client-id", 1_700_000_000_000, &secret).unwrap();
        let second = sign_token_request("client-id", 1_700_000_000_000, &secret).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_signature_changes_with_timestamp() {
        let secret = SecretString::from(TEST_SECRET);
        let first = sign_token_request("client-id", 1_700_000_000_000, &secret).unwrap();
        let second = sign_token_request("client-id", 1_700_000_000_001, &secret).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_signature_wraps_full_hash_string() {
        let secret = SecretString::from(TEST_SECRET);
        let signature = sign_token_request("client-id", 1_700_000_000_000, &secret).unwrap();

        // The Base64 payload is the bcrypt hash string itself, salt included.
        let decoded = STANDARD.decode(signature).unwrap();
        let hash = String::from_utf8(decoded).unwrap();
        assert!(hash.starts_with("$2a$04$"));
        assert_eq!(hash.len(), 60);
    }

    #[test]
    fn test_access_token_is_expired() {
        let now = chrono::Utc::now().timestamp();

        let expired = AccessToken {
            token: SecretString::from("test"),
            expires_at: now - 3600,
        };
        assert!(expired.is_expired());

        let valid = AccessToken {
            token: SecretString::from("test"),
            expires_at: now + 3600,
        };
        assert!(!valid.is_expired());

        // 30 seconds left counts as expired due to the 60s margin.
        let almost = AccessToken {
            token: SecretString::from("test"),
            expires_at: now + 30,
        };
        assert!(almost.is_expired());
    }
}
