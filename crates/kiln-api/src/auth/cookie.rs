// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Session cookie encoding.
//!
//! Both tokens are delivered as `HttpOnly`, `SameSite=Strict` cookies
//! (`Secure` in production). Clearing uses `Max-Age=0` with the same
//! attributes used at set-time, so browsers match and drop the right
//! cookie.

use axum::http::{header, HeaderMap, HeaderValue};

/// Name of the access token cookie.
pub const ACCESS_COOKIE: &str = "access_token";

/// Name of the refresh token cookie.
pub const REFRESH_COOKIE: &str = "refresh_token";

/// Builds a `Set-Cookie` value for a session cookie.
///
/// Token values are base64url JWTs and need no escaping.
pub fn set_cookie(name: &str, value: &str, max_age_secs: i64, secure: bool) -> HeaderValue {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Strict; Max-Age={}",
        name, value, max_age_secs
    );
    if secure {
        cookie.push_str("; Secure");
    }

    HeaderValue::from_str(&cookie).expect("cookie value contains no invalid characters")
}

/// Builds a `Set-Cookie` value that clears a session cookie.
pub fn clear_cookie(name: &str, secure: bool) -> HeaderValue {
    set_cookie(name, "", 0, secure)
}

/// Extracts a cookie value from the request's `Cookie` header(s).
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key == name && !value.is_empty()).then(|| value.to_string())
        })
        .next()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_cookie_attributes() {
        let value = set_cookie(ACCESS_COOKIE, "tok123", 900, false);
        let s = value.to_str().unwrap();

        assert!(s.starts_with("access_token=tok123"));
        assert!(s.contains("HttpOnly"));
        assert!(s.contains("SameSite=Strict"));
        assert!(s.contains("Path=/"));
        assert!(s.contains("Max-Age=900"));
        assert!(!s.contains("Secure"));
    }

    #[test]
    fn test_secure_in_production() {
        let value = set_cookie(REFRESH_COOKIE, "tok", 100, true);
        assert!(value.to_str().unwrap().contains("Secure"));
    }

    #[test]
    fn test_clear_cookie_matches_set_attributes() {
        let value = clear_cookie(ACCESS_COOKIE, true);
        let s = value.to_str().unwrap();

        assert!(s.starts_with("access_token=;"));
        assert!(s.contains("Max-Age=0"));
        assert!(s.contains("HttpOnly"));
        assert!(s.contains("SameSite=Strict"));
        assert!(s.contains("Secure"));
    }

    #[test]
    fn test_cookie_extraction() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; access_token=abc.def.ghi; lang=en"),
        );

        assert_eq!(
            cookie_value(&headers, ACCESS_COOKIE).as_deref(),
            Some("abc.def.ghi")
        );
        assert_eq!(cookie_value(&headers, REFRESH_COOKIE), None);
    }

    #[test]
    fn test_empty_cookie_is_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("access_token="),
        );

        assert_eq!(cookie_value(&headers, ACCESS_COOKIE), None);
    }
}
