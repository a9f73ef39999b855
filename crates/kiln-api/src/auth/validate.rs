// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Caller-side input validation for the auth endpoints.
//!
//! Validation happens entirely at the transport boundary; the identity
//! authority assumes its inputs are well-formed.

use crate::error::{ApiResult, ValidationErrors};

/// Minimum display name length.
pub const NAME_MIN_LEN: usize = 2;

/// Maximum display name length.
pub const NAME_MAX_LEN: usize = 50;

/// Minimum password length.
pub const PASSWORD_MIN_LEN: usize = 8;

/// Validates registration input.
pub fn validate_register(name: &str, email: &str, password: &str) -> ApiResult<()> {
    let mut errors = ValidationErrors::new();

    let name = name.trim();
    if name.chars().count() < NAME_MIN_LEN {
        errors.add("name", "Name must be at least 2 characters");
    } else if name.chars().count() > NAME_MAX_LEN {
        errors.add("name", "Name cannot exceed 50 characters");
    }

    if !is_valid_email(email.trim()) {
        errors.add("email", "Please provide a valid email address");
    }

    if password.chars().count() < PASSWORD_MIN_LEN {
        errors.add("password", "Password must be at least 8 characters");
    }

    errors.into_result()
}

/// Validates login input.
pub fn validate_login(email: &str, password: &str) -> ApiResult<()> {
    let mut errors = ValidationErrors::new();

    if email.trim().is_empty() {
        errors.add("email", "Email is required");
    }
    if password.is_empty() {
        errors.add("password", "Password is required");
    }

    errors.into_result()
}

/// Checks that an email has the expected shape: a non-empty local part, an
/// `@`, and a dotted domain, with no whitespace anywhere.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }

    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_shapes() {
        assert!(is_valid_email("ada@x.com"));
        assert!(is_valid_email("first.last@sub.domain.io"));

        assert!(!is_valid_email(""));
        assert!(!is_valid_email("ada"));
        assert!(!is_valid_email("ada@"));
        assert!(!is_valid_email("@x.com"));
        assert!(!is_valid_email("ada@xcom"));
        assert!(!is_valid_email("ada@x."));
        assert!(!is_valid_email("ada@.com"));
        assert!(!is_valid_email("ada@x@y.com"));
        assert!(!is_valid_email("a da@x.com"));
    }

    #[test]
    fn test_register_validation() {
        assert!(validate_register("Ada", "ada@x.com", "password123").is_ok());

        assert!(validate_register("A", "ada@x.com", "password123").is_err());
        assert!(validate_register(&"x".repeat(51), "ada@x.com", "password123").is_err());
        assert!(validate_register("Ada", "not-an-email", "password123").is_err());
        assert!(validate_register("Ada", "ada@x.com", "short").is_err());
    }

    #[test]
    fn test_register_collects_all_field_errors() {
        let err = validate_register("A", "bad", "short").unwrap_err();
        match err {
            crate::error::ApiError::Validation {
                errors: Some(errors),
                ..
            } => assert_eq!(errors.fields.len(), 3),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_login_validation() {
        assert!(validate_login("ada@x.com", "secret").is_ok());
        assert!(validate_login("", "secret").is_err());
        assert!(validate_login("ada@x.com", "").is_err());
    }
}
