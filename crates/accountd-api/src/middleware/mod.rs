//! API middleware

pub mod auth;

pub use auth::{require_auth, AuthUser};
