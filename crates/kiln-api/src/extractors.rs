// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Custom extractors for API handlers.

use axum::{
    extract::{FromRequestParts, Query},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;

use kiln_core::{HistoryQuery, IdentitySnapshot};

use crate::auth::AuthContext;
use crate::error::ApiError;

// =============================================================================
// Auth Extractor
// =============================================================================

/// Extractor for authenticated requests.
///
/// Yields the identity snapshot the session verifier resolved for this
/// request. Returns 401 if the request carries no authenticated identity.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(Auth(identity): Auth) -> impl IntoResponse {
///     format!("Hello, {}", identity.name)
/// }
/// ```
pub struct Auth(pub IdentitySnapshot);

impl<S> FromRequestParts<S> for Auth
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .and_then(|ctx| ctx.identity.clone())
            .map(Auth)
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

// =============================================================================
// Validated JSON Extractor
// =============================================================================

/// Extractor for JSON payloads with a friendlier rejection.
pub struct ValidatedJson<T>(pub T);

impl<S, T> axum::extract::FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(
        req: axum::http::Request<axum::body::Body>,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ApiError::bad_request(format!("Invalid JSON: {}", e)))?;

        Ok(ValidatedJson(value))
    }
}

// =============================================================================
// History Query Extractor
// =============================================================================

/// Extractor for validated history query parameters.
pub struct History(pub HistoryQuery);

impl<S> FromRequestParts<S> for History
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(query) = Query::<HistoryQuery>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::bad_request(format!("Invalid query parameters: {}", e)))?;

        if query.page == 0 {
            return Err(ApiError::validation("Page must be greater than 0"));
        }
        if query.per_page == 0 || query.per_page > HistoryQuery::MAX_PER_PAGE {
            return Err(ApiError::validation(format!(
                "per_page must be between 1 and {}",
                HistoryQuery::MAX_PER_PAGE
            )));
        }
        if let Some(search) = &query.search {
            if search.chars().count() > HistoryQuery::MAX_SEARCH_LEN {
                return Err(ApiError::validation("Search query too long"));
            }
        }

        Ok(History(query))
    }
}

// =============================================================================
// Client IP Extractor
// =============================================================================

/// Extractor for the client IP address.
pub struct ClientIp(pub Option<std::net::IpAddr>);

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Prefer proxy headers, fall back to the connection address the
        // session verifier recorded.
        let forwarded = parts
            .headers
            .get("X-Forwarded-For")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .and_then(|s| s.trim().parse().ok());

        if let Some(ip) = forwarded {
            return Ok(ClientIp(Some(ip)));
        }

        let from_ctx = parts
            .extensions
            .get::<AuthContext>()
            .and_then(|ctx| ctx.client_ip);

        Ok(ClientIp(from_ctx))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::FromRequestParts;
    use axum::http::Request;
    use chrono::Utc;
    use kiln_core::AccountId;

    fn parts_with_ctx(ctx: AuthContext) -> Parts {
        let mut req = Request::builder().uri("/test").body(()).unwrap();
        req.extensions_mut().insert(ctx);
        req.into_parts().0
    }

    #[tokio::test]
    async fn test_auth_extractor_rejects_anonymous() {
        let mut parts = parts_with_ctx(AuthContext::anonymous());
        let result = Auth::from_request_parts(&mut parts, &()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_auth_extractor_yields_snapshot() {
        let snapshot = IdentitySnapshot {
            id: AccountId::new(),
            name: "Ada".to_string(),
            email: "ada@x.com".to_string(),
            created_at: Utc::now(),
        };
        let mut parts = parts_with_ctx(AuthContext::authenticated(snapshot.clone()));

        let Auth(extracted) = Auth::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(extracted.id, snapshot.id);
    }

    #[tokio::test]
    async fn test_history_extractor_validates() {
        let mut parts = Request::builder()
            .uri("/api/v1/history?page=0")
            .body(())
            .unwrap()
            .into_parts()
            .0;
        assert!(History::from_request_parts(&mut parts, &()).await.is_err());

        let mut parts = Request::builder()
            .uri("/api/v1/history?per_page=51")
            .body(())
            .unwrap()
            .into_parts()
            .0;
        assert!(History::from_request_parts(&mut parts, &()).await.is_err());

        let mut parts = Request::builder()
            .uri("/api/v1/history?page=2&per_page=10&sort_by=execution_time&order=asc")
            .body(())
            .unwrap()
            .into_parts()
            .0;
        let History(query) = History::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(query.page, 2);
        assert_eq!(query.per_page, 10);
    }
}
