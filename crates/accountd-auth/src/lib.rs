//! Credential and session-token core for the account service

pub mod jwt;
pub mod password;

pub use jwt::{
    strip_bearer, IssuedToken, SessionClaims, TokenError, TokenIdentity, TokenIssuer,
    TokenVerifier, SESSION_TTL_HOURS,
};
pub use password::{hash_password, verify_password, PasswordError};
