use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, NotSet, QueryFilter, QueryOrder, Set, SqlErr,
};
use std::sync::Arc;
use tracing::{debug, info};

use accountd_auth::{hash_password, strip_bearer, verify_password, PasswordError, TokenError};
use accountd_db::entities::user;

use crate::models::*;
use crate::AppState;

fn api_error(
    status: StatusCode,
    code: &str,
    message: impl Into<String>,
) -> (StatusCode, Json<ErrorResponse>) {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
            code: Some(code.to_string()),
        }),
    )
}

fn db_error(e: sea_orm::DbErr) -> (StatusCode, Json<ErrorResponse>) {
    api_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "DATABASE_ERROR",
        format!("Database error: {}", e),
    )
}

/// Map a token rejection to a 401 with a distinct error code per reason.
pub(crate) fn token_rejection(e: TokenError) -> (StatusCode, Json<ErrorResponse>) {
    let (code, message) = match e {
        TokenError::Expired => ("TOKEN_EXPIRED", "Token is expired"),
        TokenError::MissingSubject => ("MISSING_SUBJECT", "Token has no subject claim"),
        TokenError::Malformed => ("MALFORMED_TOKEN", "Token is malformed"),
        _ => ("INVALID_TOKEN", "Token signature is invalid"),
    };
    api_error(StatusCode::UNAUTHORIZED, code, message)
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Register a new user account
#[utoipa::path(
    post,
    path = "/api/v1/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created", body = RegisterResponse),
        (status = 400, description = "Empty email or password", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), (StatusCode, Json<ErrorResponse>)> {
    debug!("Registering user");

    if req.email.is_empty() || req.password.is_empty() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            "Email and password must not be empty",
        ));
    }

    // Hash before persisting; the plaintext is never written anywhere
    let password_hash = hash_password(&req.password).map_err(|e| {
        api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "HASHING_FAILURE",
            format!("Could not hash password: {}", e),
        )
    })?;

    let now = Utc::now();
    let created = user::ActiveModel {
        id: NotSet,
        email: Set(req.email),
        password_hash: Set(password_hash),
        name: Set(req.name),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&state.db)
    .await
    .map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => api_error(
            StatusCode::CONFLICT,
            "DUPLICATE_EMAIL",
            "Email already exists",
        ),
        _ => db_error(e),
    })?;

    let issued = state
        .issuer
        .issue(created.id, &created.email)
        .map_err(|e| {
            api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "TOKEN_ERROR",
                format!("Could not issue token: {}", e),
            )
        })?;

    info!(user_id = created.id, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user: created.into(),
            token: issued.token,
            expires_at: issued.expires_at,
        }),
    ))
}

/// Log in with email and password
#[utoipa::path(
    post,
    path = "/api/v1/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 400, description = "Empty email or password", body = ErrorResponse),
        (status = 401, description = "Wrong password", body = ErrorResponse),
        (status = 404, description = "No account with this email", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, (StatusCode, Json<ErrorResponse>)> {
    debug!("Login attempt");

    if req.email.is_empty() || req.password.is_empty() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            "Email and password must not be empty",
        ));
    }

    let record = user::Entity::find()
        .filter(user::Column::Email.eq(&req.email))
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| {
            api_error(StatusCode::NOT_FOUND, "USER_NOT_FOUND", "User not found")
        })?;

    match verify_password(&req.password, &record.password_hash) {
        Ok(true) => {}
        Ok(false) => {
            return Err(api_error(
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS",
                "Invalid password",
            ));
        }
        // A stored hash that cannot be parsed is a corrupt record, not a
        // wrong password
        Err(PasswordError::InvalidHashFormat(_)) => {
            return Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "CORRUPT_RECORD",
                "Stored credential is corrupt",
            ));
        }
        Err(e) => {
            return Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "HASHING_FAILURE",
                format!("Could not verify password: {}", e),
            ));
        }
    }

    let issued = state
        .issuer
        .issue(record.id, &record.email)
        .map_err(|e| {
            api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "TOKEN_ERROR",
                format!("Could not issue token: {}", e),
            )
        })?;

    info!(user_id = record.id, "User logged in");

    Ok(Json(LoginResponse {
        user: record.into(),
        token: issued.token,
        expires_at: issued.expires_at,
    }))
}

/// Validate a presented session token
///
/// Pure validation probe: checks the token from the `Authorization` header
/// and echoes the embedded identity. Has no side effect and grants nothing.
#[utoipa::path(
    get,
    path = "/api/v1/verify",
    responses(
        (status = 200, description = "Token is valid", body = VerifyResponse),
        (status = 401, description = "Missing, malformed, expired, or forged token", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn verify(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<VerifyResponse>, (StatusCode, Json<ErrorResponse>)> {
    let header_value = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            api_error(StatusCode::UNAUTHORIZED, "MISSING_TOKEN", "No token found")
        })?;

    let token = strip_bearer(header_value).map_err(token_rejection)?;
    let identity = state.verifier.validate(token).map_err(token_rejection)?;

    Ok(Json(VerifyResponse {
        user_id: identity.user_id,
        email: identity.email,
    }))
}

/// List all users
#[utoipa::path(
    get,
    path = "/api/v1/users",
    responses(
        (status = 200, description = "List of users", body = UserList),
        (status = 401, description = "Missing or invalid session token", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "users"
)]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<UserList>, (StatusCode, Json<ErrorResponse>)> {
    debug!("Listing users");

    let users: Vec<User> = user::Entity::find()
        .order_by_asc(user::Column::Id)
        .all(&state.db)
        .await
        .map_err(db_error)?
        .into_iter()
        .map(User::from)
        .collect();

    let total = users.len();

    Ok(Json(UserList { users, total }))
}

/// Get a user by id
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    params(
        ("id" = i64, Path, description = "User id")
    ),
    responses(
        (status = 200, description = "User information", body = User),
        (status = 401, description = "Missing or invalid session token", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "users"
)]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<User>, (StatusCode, Json<ErrorResponse>)> {
    debug!(user_id = id, "Getting user");

    let record = user::Entity::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| {
            api_error(StatusCode::NOT_FOUND, "USER_NOT_FOUND", "User not found")
        })?;

    Ok(Json(record.into()))
}

/// Update a user's email or display name
#[utoipa::path(
    patch,
    path = "/api/v1/users/{id}",
    params(
        ("id" = i64, Path, description = "User id")
    ),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated user", body = User),
        (status = 400, description = "Empty email", body = ErrorResponse),
        (status = 401, description = "Missing or invalid session token", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "users"
)]
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<User>, (StatusCode, Json<ErrorResponse>)> {
    debug!(user_id = id, "Updating user");

    let record = user::Entity::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| {
            api_error(StatusCode::NOT_FOUND, "USER_NOT_FOUND", "User not found")
        })?;

    if matches!(req.email.as_deref(), Some("")) {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            "Email must not be empty",
        ));
    }

    let mut active: user::ActiveModel = record.into();
    if let Some(email) = req.email {
        active.email = Set(email);
    }
    if let Some(name) = req.name {
        active.name = Set(Some(name));
    }
    active.updated_at = Set(Utc::now());

    let updated = active.update(&state.db).await.map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => api_error(
            StatusCode::CONFLICT,
            "DUPLICATE_EMAIL",
            "Email already exists",
        ),
        _ => db_error(e),
    })?;

    info!(user_id = updated.id, "User updated");

    Ok(Json(updated.into()))
}
