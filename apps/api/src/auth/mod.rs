//! Bearer-token authentication gate.
//!
//! Every protected route runs `AuthGate::authorize` on the raw `Authorization`
//! header before any handler logic. Tokens are HMAC-signed JWTs verified
//! against the secret from `AuthConfig`; expiry is enforced only when the
//! token carries an `exp` claim, and a present `nbf` must not be in the future.
//!
//! All failures surface as HTTP 401. The precise cause is logged, never returned.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::AuthConfig;

pub mod middleware;

/// Claim set embedded in a verified token.
pub type Claims = Map<String, Value>;

const BEARER_SCHEME: &str = "Bearer";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no credential provided")]
    NoCredential,

    #[error("malformed credential: {0}")]
    MalformedCredential(String),

    #[error("credential verification failed: {0}")]
    InvalidCredential(#[from] jsonwebtoken::errors::Error),

    #[allow(dead_code)]
    #[error("failed to sign token: {0}")]
    Signing(jsonwebtoken::errors::Error),
}

impl AuthError {
    /// The message returned to the caller. Verification failures share one message.
    pub fn public_message(&self) -> &'static str {
        match self {
            AuthError::NoCredential => "No token provided",
            AuthError::MalformedCredential(_) => "Malformed token",
            AuthError::InvalidCredential(_) | AuthError::Signing(_) => "Invalid or expired token",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.public_message() }));
        (StatusCode::UNAUTHORIZED, body).into_response()
    }
}

/// A verified bearer credential. Lives for one request.
#[derive(Debug, Clone)]
pub struct Credential {
    claims: Claims,
}

impl Credential {
    #[allow(dead_code)]
    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }

    /// Best-effort identity for log lines: `sub`, then `id`, then `email`.
    pub fn subject(&self) -> Option<&str> {
        ["sub", "id", "email"]
            .iter()
            .find_map(|name| self.claim(name).and_then(Value::as_str))
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let exp = self.claims.get("exp")?.as_i64()?;
        Utc.timestamp_opt(exp, 0).single()
    }
}

/// Verifies bearer tokens against the configured secret.
pub struct AuthGate {
    require_bearer_scheme: bool,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl AuthGate {
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        // exp/nbf are checked when present but not required; no clock tolerance.
        validation.required_spec_claims.clear();
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.leeway = 0;
        validation.validate_aud = false;

        Self {
            require_bearer_scheme: config.require_bearer_scheme,
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
        }
    }

    /// Authorizes a request from its raw `Authorization` header value.
    ///
    /// The header must hold exactly two space-separated tokens. Signature
    /// verification runs only once the shape check has passed.
    pub fn authorize(&self, header_value: Option<&str>) -> Result<Credential, AuthError> {
        let result = self
            .extract_token(header_value)
            .and_then(|token| self.verify(token));

        match &result {
            Ok(credential) => debug!(
                "Authenticated request for subject {}",
                credential.subject().unwrap_or("<unknown>")
            ),
            Err(e) => warn!("Rejected request: {e}"),
        }

        result
    }

    fn extract_token<'a>(&self, header_value: Option<&'a str>) -> Result<&'a str, AuthError> {
        let header_value = match header_value {
            Some(v) if !v.is_empty() => v,
            _ => return Err(AuthError::NoCredential),
        };

        let parts: Vec<&str> = header_value.split(' ').collect();
        let [scheme, token] = parts[..] else {
            return Err(AuthError::MalformedCredential(format!(
                "expected 2 space-separated parts, found {}",
                parts.len()
            )));
        };

        if self.require_bearer_scheme && !scheme.eq_ignore_ascii_case(BEARER_SCHEME) {
            return Err(AuthError::MalformedCredential(format!(
                "unsupported scheme '{scheme}'"
            )));
        }

        Ok(token)
    }

    fn verify(&self, token: &str) -> Result<Credential, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        check_time_claims(&data.claims, Utc::now().timestamp())?;
        Ok(Credential {
            claims: data.claims,
        })
    }

    /// Signs a claim set with the configured secret (HS256).
    #[allow(dead_code)]
    pub fn issue(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(&Header::default(), claims, &self.encoding_key).map_err(AuthError::Signing)
    }
}

/// Re-checks `exp` and `nbf` on the decoded claims.
///
/// The decoder only validates time claims that parse as `u64` and silently
/// skips any other shape when the claim is optional. A present claim must be
/// a JSON number; `exp` must lie in the future and `nbf` must not.
fn check_time_claims(claims: &Claims, now: i64) -> Result<(), AuthError> {
    let now = now as f64;

    if let Some(exp) = claims.get("exp") {
        let exp = exp.as_f64().ok_or_else(|| invalid(ErrorKind::InvalidToken))?;
        if exp <= now {
            return Err(invalid(ErrorKind::ExpiredSignature));
        }
    }

    if let Some(nbf) = claims.get("nbf") {
        let nbf = nbf.as_f64().ok_or_else(|| invalid(ErrorKind::InvalidToken))?;
        if nbf > now {
            return Err(invalid(ErrorKind::ImmatureSignature));
        }
    }

    Ok(())
}

fn invalid(kind: ErrorKind) -> AuthError {
    AuthError::InvalidCredential(kind.into())
}
