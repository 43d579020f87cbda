//! auth::jwt
//!
//! RS256 JWT assertions for the JWT-bearer grant.
//!
//! The assertion is `base64url(header).base64url(claims).base64url(sig)`,
//! where the signature is RSASSA-PKCS1-v1_5 over the SHA-256 digest of the
//! first two parts.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use rsa::pkcs8::DecodePrivateKey;
use rsa::{Pkcs1v15Sign, RsaPrivateKey};
use serde::Serialize;
use sha2::{Digest, Sha256};

use super::errors::AuthError;
use super::key::ServiceAccountKey;

/// Lifetime requested for each assertion, in seconds.
pub const ASSERTION_LIFETIME_SECS: i64 = 3600;

#[derive(Serialize)]
struct Header<'a> {
    alg: &'static str,
    typ: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    kid: Option<&'a str>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub(crate) struct Claims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

/// Build a signed assertion for `scope`, issued at `now`.
///
/// # Errors
///
/// Returns [`AuthError::InvalidKey`] if the private key is not PKCS#8 PEM,
/// or [`AuthError::Signing`] if signing fails.
pub fn build_assertion(
    key: &ServiceAccountKey,
    scope: &str,
    now: DateTime<Utc>,
) -> Result<String, AuthError> {
    let header = Header {
        alg: "RS256",
        typ: "JWT",
        kid: key.private_key_id.as_deref(),
    };
    let iat = now.timestamp();
    let claims = Claims {
        iss: key.client_email.clone(),
        scope: scope.to_string(),
        aud: key.token_uri().to_string(),
        iat,
        exp: iat + ASSERTION_LIFETIME_SECS,
    };

    let signing_input = format!("{}.{}", encode_json(&header)?, encode_json(&claims)?);

    let private_key = RsaPrivateKey::from_pkcs8_pem(&key.private_key)
        .map_err(|e| AuthError::InvalidKey(format!("private_key: {}", e)))?;
    let digest = Sha256::digest(signing_input.as_bytes());
    let signature = private_key
        .sign(Pkcs1v15Sign::new::<Sha256>(), &digest)
        .map_err(|e| AuthError::Signing(e.to_string()))?;

    Ok(format!("{}.{}", signing_input, URL_SAFE_NO_PAD.encode(signature)))
}

fn encode_json<T: Serialize>(value: &T) -> Result<String, AuthError> {
    let json = serde_json::to_vec(value).map_err(|e| AuthError::Signing(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}
