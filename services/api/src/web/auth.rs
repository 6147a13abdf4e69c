//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for user signup, login, Google sign-in and logout.

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderName, StatusCode},
    Json,
};
use noor_core::accounts::session_lifetime;
use noor_core::{AuthError, User};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;

use crate::web::middleware::session_token;
use crate::web::rest::UserResponse;
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Serialize, Deserialize, ToSchema)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GoogleLoginRequest {
    pub id_token: String,
}

type AuthResponse = (StatusCode, [(HeaderName, String); 1], Json<UserResponse>);

const CLEARED_COOKIE: &str = "session=; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age=0";

/// Maps an account failure to a status and the message shown to the user.
pub(crate) fn auth_error(e: AuthError) -> (StatusCode, String) {
    let status = match &e {
        AuthError::MissingFields | AuthError::InvalidEmail | AuthError::WeakPassword => {
            StatusCode::BAD_REQUEST
        }
        AuthError::EmailInUse => StatusCode::CONFLICT,
        AuthError::UserNotFound
        | AuthError::WrongPassword
        | AuthError::PasswordNotSet
        | AuthError::Provider(_)
        | AuthError::InvalidSession => StatusCode::UNAUTHORIZED,
        AuthError::ProviderUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        AuthError::Store(_) => {
            error!("Account store failure: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Something went wrong. Please try again.".to_string(),
            );
        }
    };
    (status, e.to_string())
}

/// Starts a session for `user` and attaches it as a cookie.
async fn respond_with_session(
    state: &AppState,
    status: StatusCode,
    user: User,
) -> Result<AuthResponse, (StatusCode, String)> {
    let session = state.accounts.start_session(user.user_id).await.map_err(auth_error)?;
    let cookie = format!(
        "session={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        session.id,
        session_lifetime().num_seconds()
    );
    Ok((status, [(header::SET_COOKIE, cookie)], Json(user.into())))
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/signup - Create a new user account
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User created successfully", body = UserResponse),
        (status = 400, description = "Missing fields, invalid email or weak password"),
        (status = 409, description = "Email is already registered"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Result<AuthResponse, (StatusCode, String)> {
    let user = state
        .accounts
        .register(&req.name, &req.email, &req.password)
        .await
        .map_err(auth_error)?;
    respond_with_session(&state, StatusCode::CREATED, user).await
}

/// POST /auth/login - Login with existing account
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = UserResponse),
        (status = 400, description = "Missing fields"),
        (status = 401, description = "Unknown email or incorrect password"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<AuthResponse, (StatusCode, String)> {
    let user = state
        .accounts
        .login(&req.email, &req.password)
        .await
        .map_err(auth_error)?;
    info!("User {} logged in", user.user_id);
    respond_with_session(&state, StatusCode::OK, user).await
}

/// POST /auth/google - Sign in with a Google ID token
#[utoipa::path(
    post,
    path = "/auth/google",
    request_body = GoogleLoginRequest,
    responses(
        (status = 200, description = "Login successful", body = UserResponse),
        (status = 401, description = "Token rejected by Google"),
        (status = 503, description = "Google Sign In is not configured")
    )
)]
pub async fn google_login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GoogleLoginRequest>,
) -> Result<AuthResponse, (StatusCode, String)> {
    let user = state
        .accounts
        .login_with_google(&req.id_token)
        .await
        .map_err(auth_error)?;
    respond_with_session(&state, StatusCode::OK, user).await
}

/// POST /auth/logout - Logout and invalidate session
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No active session")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<(StatusCode, [(HeaderName, String); 1]), (StatusCode, String)> {
    let auth_session_id = session_token(&headers)
        .ok_or((StatusCode::UNAUTHORIZED, "No session found".to_string()))?;

    state
        .accounts
        .end_session(auth_session_id)
        .await
        .map_err(|e| {
            error!("Failed to delete auth session: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to logout".to_string())
        })?;

    Ok((StatusCode::OK, [(header::SET_COOKIE, CLEARED_COOKIE.to_string())]))
}
