// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Authentication context.

use std::net::IpAddr;

use uuid::Uuid;

use kiln_core::IdentitySnapshot;

/// Per-request authentication context.
///
/// Attached to request extensions by the session verifier. For public paths
/// the context is anonymous; for protected paths it carries the identity
/// snapshot resolved for exactly this request.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// The resolved identity, absent on public paths.
    pub identity: Option<IdentitySnapshot>,
    /// Request ID for tracing.
    pub request_id: Uuid,
    /// Client IP address.
    pub client_ip: Option<IpAddr>,
}

impl AuthContext {
    /// Creates an anonymous context (for public paths).
    pub fn anonymous() -> Self {
        Self {
            identity: None,
            request_id: Uuid::now_v7(),
            client_ip: None,
        }
    }

    /// Creates an authenticated context from a resolved snapshot.
    pub fn authenticated(identity: IdentitySnapshot) -> Self {
        Self {
            identity: Some(identity),
            request_id: Uuid::now_v7(),
            client_ip: None,
        }
    }

    /// Sets the client IP address.
    pub fn with_client_ip(mut self, ip: IpAddr) -> Self {
        self.client_ip = Some(ip);
        self
    }

    /// Returns `true` if no identity is attached.
    pub fn is_anonymous(&self) -> bool {
        self.identity.is_none()
    }
}

impl Default for AuthContext {
    fn default() -> Self {
        Self::anonymous()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use kiln_core::AccountId;

    #[test]
    fn test_anonymous_context() {
        let ctx = AuthContext::anonymous();
        assert!(ctx.is_anonymous());
        assert!(ctx.client_ip.is_none());
    }

    #[test]
    fn test_authenticated_context() {
        let snapshot = IdentitySnapshot {
            id: AccountId::new(),
            name: "Ada".to_string(),
            email: "ada@x.com".to_string(),
            created_at: Utc::now(),
        };

        let ctx = AuthContext::authenticated(snapshot.clone())
            .with_client_ip("127.0.0.1".parse().unwrap());

        assert!(!ctx.is_anonymous());
        assert_eq!(ctx.identity.unwrap().id, snapshot.id);
        assert!(ctx.client_ip.is_some());
    }
}
