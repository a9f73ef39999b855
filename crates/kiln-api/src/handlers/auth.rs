// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Authentication handlers.
//!
//! On success the token pair travels as two `HttpOnly` cookies, with the
//! access token additionally echoed in the body for header-based clients.
//! The refresh token never appears in a body.

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use crate::auth::{cookie, validate, TokenPair};
use crate::error::{ApiError, ApiResult};
use crate::extractors::{Auth, ClientIp, ValidatedJson};
use crate::response::{ApiResponse, AuthResponse};
use crate::state::AppState;

// =============================================================================
// Register
// =============================================================================

/// Registration request body.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Plaintext password; hashed before it is stored.
    pub password: String,
}

/// POST /api/v1/auth/register
///
/// Creates an account and starts its first session.
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> ApiResult<Response> {
    validate::validate_register(&request.name, &request.email, &request.password)?;

    let (user, pair) = state
        .identity
        .register(
            request.name.trim().to_string(),
            request.email.trim().to_lowercase(),
            request.password,
        )
        .await?;

    let body = ApiResponse::success(
        AuthResponse::new(pair.access.clone(), state.tokens().access_ttl_secs()).with_user(user),
    )
    .with_message("Account created successfully");

    Ok(session_response(StatusCode::CREATED, body, &pair, &state))
}

// =============================================================================
// Login
// =============================================================================

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Email address.
    pub email: String,
    /// Password.
    pub password: String,
}

/// POST /api/v1/auth/login
///
/// Verifies credentials and starts a fresh session, superseding any
/// previous one.
pub async fn login(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> ApiResult<Response> {
    validate::validate_login(&request.email, &request.password)?;

    tracing::debug!(?client_ip, "Login attempt");

    let (user, pair) = state
        .identity
        .login(request.email.trim(), request.password)
        .await?;

    let body = ApiResponse::success(
        AuthResponse::new(pair.access.clone(), state.tokens().access_ttl_secs()).with_user(user),
    )
    .with_message("Login successful");

    Ok(session_response(StatusCode::OK, body, &pair, &state))
}

// =============================================================================
// Refresh
// =============================================================================

/// Refresh request body, for clients not using the cookie.
#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    /// Refresh token.
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// POST /api/v1/auth/refresh
///
/// Rotates the token pair. The refresh token is read from its cookie, or
/// from the body for header-based clients. The presented token is spent by
/// a successful rotation; presenting it again is rejected as reuse.
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Response> {
    let presented = cookie::cookie_value(&headers, cookie::REFRESH_COOKIE)
        .or_else(|| {
            serde_json::from_slice::<RefreshRequest>(&body)
                .ok()
                .and_then(|r| r.refresh_token)
        })
        .ok_or_else(|| ApiError::unauthorized("Refresh token is required"))?;

    let pair = state.identity.rotate(&presented).await?;

    let body = ApiResponse::success(AuthResponse::new(
        pair.access.clone(),
        state.tokens().access_ttl_secs(),
    ))
    .with_message("Token refreshed successfully");

    Ok(session_response(StatusCode::OK, body, &pair, &state))
}

// =============================================================================
// Logout
// =============================================================================

/// POST /api/v1/auth/logout
///
/// Ends the session: clears the stored refresh handle and both cookies.
/// Already-issued access tokens expire naturally.
pub async fn logout(
    State(state): State<AppState>,
    Auth(identity): Auth,
) -> ApiResult<Response> {
    state.identity.logout(identity.id).await?;

    let secure = state.config.secure_cookies();
    let body = ApiResponse::success(serde_json::json!({}))
        .with_message("Logged out successfully");

    let mut response = (StatusCode::OK, Json(body)).into_response();
    let headers = response.headers_mut();
    headers.append(
        header::SET_COOKIE,
        cookie::clear_cookie(cookie::ACCESS_COOKIE, secure),
    );
    headers.append(
        header::SET_COOKIE,
        cookie::clear_cookie(cookie::REFRESH_COOKIE, secure),
    );

    Ok(response)
}

// =============================================================================
// Current User
// =============================================================================

/// GET /api/v1/auth/me
///
/// Returns the identity resolved for this request.
pub async fn current_user(Auth(identity): Auth) -> ApiResult<impl IntoResponse> {
    Ok(Json(ApiResponse::success(identity)))
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Builds a response that delivers a token pair as session cookies.
fn session_response<T: serde::Serialize>(
    status: StatusCode,
    body: ApiResponse<T>,
    pair: &TokenPair,
    state: &AppState,
) -> Response {
    let secure = state.config.secure_cookies();
    let tokens = state.tokens();

    let mut response = (status, Json(body)).into_response();
    let headers = response.headers_mut();
    headers.append(
        header::SET_COOKIE,
        cookie::set_cookie(
            cookie::ACCESS_COOKIE,
            &pair.access,
            tokens.access_ttl_secs(),
            secure,
        ),
    );
    headers.append(
        header::SET_COOKIE,
        cookie::set_cookie(
            cookie::REFRESH_COOKIE,
            &pair.refresh,
            tokens.refresh_ttl_secs(),
            secure,
        ),
    );

    response
}
