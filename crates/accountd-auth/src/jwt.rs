//! Session token issuance and verification (HS256 JWT)

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fixed validity window for session tokens
pub const SESSION_TTL_HOURS: i64 = 24;

/// Scheme label expected in the `Authorization` header
const BEARER_PREFIX: &str = "Bearer ";

/// Session token errors
#[derive(Debug, Error)]
pub enum TokenError {
    /// No signing secret configured, or the configured secret is empty
    #[error("signing secret is missing or empty")]
    MissingSecret,

    /// Wrong signing algorithm, or the signature does not verify
    #[error("token signature is invalid")]
    InvalidSignature,

    /// The expiry claim is in the past
    #[error("token is expired")]
    Expired,

    /// The subject-id claim is absent
    #[error("token has no subject claim")]
    MissingSubject,

    /// The presented string is not structurally a token
    #[error("token is malformed")]
    Malformed,

    /// The token could not be encoded
    #[error("token encoding failed: {0}")]
    Encoding(jsonwebtoken::errors::Error),
}

/// Signed claims carried by a session token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionClaims {
    /// Subject (user id). Optional so an absent claim is a typed
    /// rejection rather than a generic decode failure.
    pub sub: Option<i64>,
    /// Subject email
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Issued at (epoch seconds)
    pub iat: i64,
    /// Expiration time (epoch seconds)
    pub exp: i64,
}

impl SessionClaims {
    pub fn new(user_id: i64, email: &str, validity: Duration) -> Self {
        let now = Utc::now();

        Self {
            sub: Some(user_id),
            email: Some(email.to_owned()),
            iat: now.timestamp(),
            exp: (now + validity).timestamp(),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// A freshly issued session token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// Compact JWS string
    pub token: String,
    /// When the token stops being accepted
    pub expires_at: DateTime<Utc>,
}

/// Identity extracted from a valid session token
#[derive(Debug, Clone, PartialEq)]
pub struct TokenIdentity {
    pub user_id: i64,
    pub email: Option<String>,
}

/// Issues HS256 session tokens under a process-wide secret.
///
/// Pure function of identity, clock, and secret; holds no mutable state.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
}

impl TokenIssuer {
    /// Create an issuer. The secret must be non-empty; an absent secret is
    /// a startup-time configuration failure, not a per-request one.
    pub fn new(secret: &str) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::MissingSecret);
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
        })
    }

    /// Issue a token for the given identity, valid for 24 hours.
    pub fn issue(&self, user_id: i64, email: &str) -> Result<IssuedToken, TokenError> {
        self.issue_with_validity(user_id, email, Duration::hours(SESSION_TTL_HOURS))
    }

    /// Issue a token with an explicit validity window.
    ///
    /// A negative duration produces an already-expired token, which is how
    /// expiry handling is exercised in tests.
    pub fn issue_with_validity(
        &self,
        user_id: i64,
        email: &str,
        validity: Duration,
    ) -> Result<IssuedToken, TokenError> {
        let claims = SessionClaims::new(user_id, email, validity);
        let header = Header::new(Algorithm::HS256);

        let token =
            encode(&header, &claims, &self.encoding_key).map_err(TokenError::Encoding)?;

        let expires_at = DateTime::<Utc>::from_timestamp(claims.exp, 0).unwrap_or_else(Utc::now);

        Ok(IssuedToken { token, expires_at })
    }
}

/// Validates presented session tokens.
///
/// Checks signature (HS256 under the configured secret), expiry, and the
/// presence of a subject claim. Performs no authorization; the caller
/// decides what the returned identity may do.
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &str) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::MissingSecret);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.validate_aud = false;
        validation.validate_nbf = false;
        // Expiry must be strictly in the future, no grace window
        validation.leeway = 0;

        Ok(Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    /// Validate a token body (prefix already stripped by the caller).
    pub fn validate(&self, token: &str) -> Result<TokenIdentity, TokenError> {
        let data = decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature
                | ErrorKind::InvalidAlgorithm
                | ErrorKind::InvalidAlgorithmName => TokenError::InvalidSignature,
                _ => TokenError::Malformed,
            })?;

        if data.claims.is_expired() {
            return Err(TokenError::Expired);
        }

        let user_id = data.claims.sub.ok_or(TokenError::MissingSubject)?;

        Ok(TokenIdentity {
            user_id,
            email: data.claims.email,
        })
    }
}

/// Strip the `"Bearer "` scheme label from an `Authorization` header value.
///
/// Empty input, input shorter than the prefix, or an empty remainder is a
/// typed `Malformed` rejection; the input is never sliced by raw index.
pub fn strip_bearer(header: &str) -> Result<&str, TokenError> {
    match header.strip_prefix(BEARER_PREFIX) {
        Some(token) if !token.is_empty() => Ok(token),
        _ => Err(TokenError::Malformed),
    }
}
