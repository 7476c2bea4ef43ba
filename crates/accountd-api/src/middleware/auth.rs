//! Bearer-token authentication middleware
//!
//! Validates the session token from the `Authorization` header and makes
//! the caller identity available to handlers via request extensions.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use accountd_auth::strip_bearer;

use crate::handlers::token_rejection;
use crate::models::ErrorResponse;
use crate::AppState;

/// Authenticated caller identity extracted from a session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    /// Numeric user id
    pub user_id: i64,
    /// Email claim, if the token carries one
    pub email: Option<String>,
}

/// Middleware guarding protected routes.
///
/// Requires `Authorization: Bearer <token>`; the token must carry a valid
/// signature, a future expiry, and a subject claim. On success an
/// [`AuthUser`] is inserted into the request extensions. The middleware
/// authenticates only; handlers decide what the caller may do.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    let header_value = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    error: "Missing Authorization header".to_string(),
                    code: Some("MISSING_TOKEN".to_string()),
                }),
            )
        })?;

    let token = strip_bearer(header_value).map_err(token_rejection)?;
    let identity = state.verifier.validate(token).map_err(token_rejection)?;

    request.extensions_mut().insert(AuthUser {
        user_id: identity.user_id,
        email: identity.email,
    });

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ApiServerConfig, AppState};
    use accountd_auth::{TokenIssuer, TokenVerifier};
    use axum::{body::Body, http::Request, middleware, routing::get, Router};
    use chrono::Duration;
    use tower::ServiceExt; // For oneshot()

    const TEST_SECRET: &str = "test-secret-key";

    async fn protected_handler(
        axum::Extension(user): axum::Extension<AuthUser>,
    ) -> Json<AuthUser> {
        Json(user)
    }

    async fn create_test_app(secret: &str) -> Router {
        let db = accountd_db::connect("sqlite::memory:").await.unwrap();
        let state = Arc::new(AppState {
            db,
            issuer: TokenIssuer::new(secret).unwrap(),
            verifier: TokenVerifier::new(secret).unwrap(),
        });

        Router::new()
            .route("/protected", get(protected_handler))
            .layer(middleware::from_fn_with_state(state.clone(), require_auth))
            .with_state(state)
    }

    fn bearer_request(token: &str) -> Request<Body> {
        Request::builder()
            .uri("/protected")
            .header("Authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn valid_token_reaches_the_handler() {
        let app = create_test_app(TEST_SECRET).await;
        let issued = TokenIssuer::new(TEST_SECRET)
            .unwrap()
            .issue(17, "mw@x.com")
            .unwrap();

        let response = app.oneshot(bearer_request(&issued.token)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let user: AuthUser = serde_json::from_slice(&body).unwrap();

        assert_eq!(user.user_id, 17);
        assert_eq!(user.email.as_deref(), Some("mw@x.com"));
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let app = create_test_app(TEST_SECRET).await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/protected")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let error: ErrorResponse = serde_json::from_slice(&body).unwrap();

        assert_eq!(error.code, Some("MISSING_TOKEN".to_string()));
    }

    #[tokio::test]
    async fn wrong_scheme_label_is_unauthorized() {
        let app = create_test_app(TEST_SECRET).await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/protected")
                    .header("Authorization", "Token abc123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let error: ErrorResponse = serde_json::from_slice(&body).unwrap();

        assert_eq!(error.code, Some("MALFORMED_TOKEN".to_string()));
    }

    #[tokio::test]
    async fn expired_token_is_unauthorized() {
        let app = create_test_app(TEST_SECRET).await;
        let issued = TokenIssuer::new(TEST_SECRET)
            .unwrap()
            .issue_with_validity(17, "mw@x.com", Duration::seconds(-10))
            .unwrap();

        let response = app.oneshot(bearer_request(&issued.token)).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let error: ErrorResponse = serde_json::from_slice(&body).unwrap();

        assert_eq!(error.code, Some("TOKEN_EXPIRED".to_string()));
    }

    #[tokio::test]
    async fn token_signed_with_wrong_secret_is_unauthorized() {
        let app = create_test_app(TEST_SECRET).await;
        let issued = TokenIssuer::new("wrong-secret-key")
            .unwrap()
            .issue(17, "mw@x.com")
            .unwrap();

        let response = app.oneshot(bearer_request(&issued.token)).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let error: ErrorResponse = serde_json::from_slice(&body).unwrap();

        assert_eq!(error.code, Some("INVALID_TOKEN".to_string()));
    }

    #[tokio::test]
    async fn server_construction_rejects_empty_secret() {
        let db = accountd_db::connect("sqlite::memory:").await.unwrap();
        let config = ApiServerConfig {
            jwt_secret: String::new(),
            ..ApiServerConfig::default()
        };

        assert!(crate::ApiServer::new(config, db).is_err());
    }
}
