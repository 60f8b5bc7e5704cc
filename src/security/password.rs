//! Password hashing and verification.
//!
//! bcrypt with a configurable work factor; salted per call by the library.

use crate::error::{ApiError, ApiResult};

/// Hash a plaintext password.
///
/// The cost comes from configuration; 12 is the production default.
pub fn hash(plaintext: &str, cost: u32) -> ApiResult<String> {
    bcrypt::hash(plaintext, cost)
        .map_err(|e| ApiError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a plaintext password against a stored digest.
///
/// Fails closed: a missing digest (external-identity-only account) or an
/// unparsable one verifies as false rather than erroring out of the login
/// path.
pub fn verify(plaintext: &str, digest: Option<&str>) -> bool {
    match digest {
        Some(digest) => bcrypt::verify(plaintext, digest).unwrap_or(false),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Minimum bcrypt cost keeps the tests fast
    const TEST_COST: u32 = 4;

    #[test]
    fn test_hash_verify_round_trip() {
        let digest = hash("secret1", TEST_COST).unwrap();
        assert!(verify("secret1", Some(&digest)));
    }

    #[test]
    fn test_wrong_password_rejected() {
        let digest = hash("secret1", TEST_COST).unwrap();
        assert!(!verify("secret2", Some(&digest)));
        assert!(!verify("", Some(&digest)));
    }

    #[test]
    fn test_same_password_distinct_digests() {
        let a = hash("secret1", TEST_COST).unwrap();
        let b = hash("secret1", TEST_COST).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_missing_digest_fails_closed() {
        assert!(!verify("anything", None));
    }

    #[test]
    fn test_garbage_digest_fails_closed() {
        assert!(!verify("anything", Some("not-a-bcrypt-digest")));
    }
}
