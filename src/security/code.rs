//! One-time verification codes for email verification and re-login checks.
//!
//! Codes are uniform six-digit numbers. They are short-lived rather than
//! unguessable; the TTL is the security boundary.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

/// Generate a six-digit numeric code in 100000..=999999.
pub fn generate() -> String {
    rand::thread_rng().gen_range(100_000..=999_999).to_string()
}

/// Compute the expiry deadline for a freshly issued code.
pub fn expiry(now: DateTime<Utc>, ttl_minutes: i64) -> DateTime<Utc> {
    now + Duration::minutes(ttl_minutes)
}

/// Check a supplied code against the stored one.
///
/// False when no code is set, the expiry has passed, or the value differs.
/// Does not clear state; the caller consumes the code after a successful
/// match.
pub fn matches(
    stored: Option<&str>,
    expires_at: Option<DateTime<Utc>>,
    supplied: &str,
    now: DateTime<Utc>,
) -> bool {
    let (stored, expires_at) = match (stored, expires_at) {
        (Some(code), Some(expires_at)) => (code, expires_at),
        _ => return false,
    };

    if expires_at < now {
        return false;
    }

    stored == supplied
}
