// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Password hashing.
//!
//! Hashing is an explicit, named step invoked only from the registration
//! path, never a side effect of a generic save hook, so unrelated account
//! updates can never accidentally re-hash an already-hashed value.
//!
//! Argon2id with default parameters (memory-hard, salted). Hashing is
//! deliberately slow; callers must not hold any store lock while calling
//! into this module.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, SaltString},
    Argon2, PasswordHasher, PasswordVerifier,
};

use crate::error::{Error, Result};

/// Hashes a plaintext password into a PHC-format string.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let phc = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| Error::internal(format!("password hashing failed: {}", e)))?
        .to_string();

    Ok(phc)
}

/// Verifies a plaintext password against a PHC-format hash.
///
/// An unparseable hash verifies as `false` rather than erroring; a corrupt
/// stored hash must read as bad credentials, not as a server fault.
pub fn verify_password(hash: &str, password: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("password123").unwrap();

        assert!(hash.starts_with("$argon2"));
        assert!(verify_password(&hash, "password123"));
        assert!(!verify_password(&hash, "password124"));
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("password123").unwrap();
        let b = hash_password("password123").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_garbage_hash_rejects() {
        assert!(!verify_password("not-a-phc-string", "password123"));
        assert!(!verify_password("", "password123"));
    }
}
