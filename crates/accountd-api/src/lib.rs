pub mod handlers;
pub mod middleware;
pub mod models;

use axum::{
    http::{header, Method},
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::{net::SocketAddr, sync::Arc};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use accountd_auth::{TokenError, TokenIssuer, TokenVerifier};
use sea_orm::DatabaseConnection;

/// Application state shared across handlers
pub struct AppState {
    pub db: DatabaseConnection,
    pub issuer: TokenIssuer,
    pub verifier: TokenVerifier,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Accountd API",
        version = "0.1.0",
        description = "REST API for user accounts with bearer session tokens",
        contact(
            name = "Accountd Team",
            email = "team@accountd.dev"
        )
    ),
    paths(
        handlers::health_check,
        handlers::register,
        handlers::login,
        handlers::verify,
        handlers::list_users,
        handlers::get_user,
        handlers::update_user,
    ),
    components(
        schemas(
            models::ErrorResponse,
            models::HealthResponse,
            models::RegisterRequest,
            models::RegisterResponse,
            models::LoginRequest,
            models::LoginResponse,
            models::VerifyResponse,
            models::User,
            models::UserList,
            models::UpdateUserRequest,
        )
    ),
    tags(
        (name = "auth", description = "Registration, login, and token validation"),
        (name = "users", description = "User record endpoints"),
        (name = "system", description = "System health endpoints")
    )
)]
struct ApiDoc;

/// API server configuration
pub struct ApiServerConfig {
    /// Address to bind the API server
    pub bind_addr: SocketAddr,
    /// Enable CORS (for development)
    pub enable_cors: bool,
    /// Secret used to sign and verify session tokens
    pub jwt_secret: String,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".parse().unwrap(),
            enable_cors: true,
            jwt_secret: String::new(),
        }
    }
}

/// API Server
pub struct ApiServer {
    config: ApiServerConfig,
    state: Arc<AppState>,
}

impl ApiServer {
    /// Create a new API server.
    ///
    /// Fails with [`TokenError::MissingSecret`] if the configured secret is
    /// empty, so a misconfigured process dies at startup rather than at the
    /// first login.
    pub fn new(config: ApiServerConfig, db: DatabaseConnection) -> Result<Self, TokenError> {
        let issuer = TokenIssuer::new(&config.jwt_secret)?;
        let verifier = TokenVerifier::new(&config.jwt_secret)?;

        let state = Arc::new(AppState {
            db,
            issuer,
            verifier,
        });

        Ok(Self { config, state })
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        let api_doc = ApiDoc::openapi();

        // Public routes (no authentication required)
        let public_router = Router::new()
            .route("/api/health", get(handlers::health_check))
            .route("/api/v1/register", post(handlers::register))
            .route("/api/v1/login", post(handlers::login))
            .route("/api/v1/verify", get(handlers::verify))
            .with_state(self.state.clone());

        // Protected routes (require a valid session token)
        let protected_router = Router::new()
            .route("/api/v1/users", get(handlers::list_users))
            .route(
                "/api/v1/users/{id}",
                get(handlers::get_user).patch(handlers::update_user),
            )
            .with_state(self.state.clone())
            .layer(axum_middleware::from_fn_with_state(
                self.state.clone(),
                middleware::require_auth,
            ));

        let api_router = public_router.merge(protected_router);

        // SwaggerUi automatically creates a route for /api/openapi.json
        let router = Router::new()
            .merge(SwaggerUi::new("/swagger-ui").url("/api/openapi.json", api_doc))
            .merge(api_router);

        let mut router = router.layer(TraceLayer::new_for_http());

        if self.config.enable_cors {
            let cors = CorsLayer::new()
                .allow_methods([Method::GET, Method::POST, Method::PATCH])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
                .allow_origin(Any);
            router = router.layer(cors);
        }

        router
    }

    /// Start the API server
    pub async fn start(self) -> Result<(), anyhow::Error> {
        let bind_addr = self.config.bind_addr;
        let router = self.build_router();

        info!("Starting API server on {}", bind_addr);
        info!("OpenAPI spec: http://{}/api/openapi.json", bind_addr);
        info!("Swagger UI: http://{}/swagger-ui", bind_addr);

        let listener = tokio::net::TcpListener::bind(bind_addr).await?;

        axum::serve(listener, router)
            .await
            .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

        Ok(())
    }
}
