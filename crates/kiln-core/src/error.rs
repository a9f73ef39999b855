// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The closed error taxonomy for core operations.
//!
//! Every operation of the identity authority and the stores fails with one
//! of the variants below. The transport layer translates each variant to an
//! HTTP status exactly once at the boundary; nothing in the core branches on
//! error *messages*, only on variants.
//!
//! Authentication failures are deliberately undifferentiated in their
//! user-facing messages: a wrong password, an unknown email, an expired
//! token, and a mismatched refresh handle all surface as the same
//! `Unauthenticated` kind so callers cannot probe which check failed.

use thiserror::Error;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

// =============================================================================
// Error
// =============================================================================

/// Core error type.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Malformed input. The caller's fault; retrying will not help.
    #[error("Validation failed: {message}")]
    Validation {
        /// What was wrong with the input.
        message: String,
    },

    /// A uniqueness constraint was violated (duplicate email).
    #[error("Conflict: {message}")]
    Conflict {
        /// Description of the conflict.
        message: String,
    },

    /// Bad credentials, or a bad/expired/mismatched/missing token.
    #[error("Unauthenticated: {message}")]
    Unauthenticated {
        /// Generic message. Never reveals which check failed.
        message: String,
    },

    /// A referenced entity no longer exists.
    #[error("Not found: {resource}")]
    NotFound {
        /// The resource that was not found.
        resource: String,
    },

    /// A collaborator (store, signer) is temporarily unavailable.
    #[error("Unavailable: {message}")]
    Unavailable {
        /// Operator-facing detail.
        message: String,
    },

    /// Unexpected internal failure.
    #[error("Internal error: {message}")]
    Internal {
        /// Operator-facing detail; never shown to callers.
        message: String,
    },
}

impl Error {
    // =========================================================================
    // Constructors
    // =========================================================================

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Creates an unauthenticated error.
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Unauthenticated {
            message: message.into(),
        }
    }

    /// The canonical bad-credentials error shared by every login failure.
    pub fn invalid_credentials() -> Self {
        Self::unauthenticated("Invalid email or password")
    }

    /// The canonical bad-refresh-token error shared by every rotation failure.
    pub fn invalid_refresh_token() -> Self {
        Self::unauthenticated("Invalid or expired refresh token")
    }

    /// Creates a not-found error.
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    // =========================================================================
    // Properties
    // =========================================================================

    /// Returns the error kind as a stable string for logging and responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Validation { .. } => "VALIDATION_FAILED",
            Error::Conflict { .. } => "CONFLICT",
            Error::Unauthenticated { .. } => "UNAUTHENTICATED",
            Error::NotFound { .. } => "NOT_FOUND",
            Error::Unavailable { .. } => "UNAVAILABLE",
            Error::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Validation { .. } => 400,
            Error::Conflict { .. } => 409,
            Error::Unauthenticated { .. } => 401,
            Error::NotFound { .. } => 404,
            Error::Unavailable { .. } => 503,
            Error::Internal { .. } => 500,
        }
    }

    /// Returns a message safe to show to callers.
    ///
    /// Internal and unavailable errors never expose their detail; the detail
    /// goes to operator logs only.
    pub fn user_message(&self) -> String {
        match self {
            Error::Validation { message } => message.clone(),
            Error::Conflict { message } => message.clone(),
            Error::Unauthenticated { message } => message.clone(),
            Error::NotFound { resource } => format!("{} not found", resource),
            Error::Unavailable { .. } => "Service temporarily unavailable".to_string(),
            Error::Internal { .. } => "Something went wrong".to_string(),
        }
    }

    /// Returns `true` if this error should be logged at error level.
    pub fn is_server_error(&self) -> bool {
        matches!(self, Error::Unavailable { .. } | Error::Internal { .. })
    }
}

// =============================================================================
// Tests
// =============================================================================
