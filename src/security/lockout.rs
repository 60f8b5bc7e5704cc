//! Failed-login tracking with timed lockout.
//!
//! Lock state is derived: an account is locked iff `locked_until` is set
//! and in the future. Elapsing is therefore a non-transition; only
//! failures and successes mutate the record.

use crate::db::user::User;
use chrono::{DateTime, Duration, Utc};

/// Lockout parameters, injected from configuration.
#[derive(Debug, Clone)]
pub struct LockoutPolicy {
    pub max_attempts: u32,
    pub lock_duration: Duration,
}

impl LockoutPolicy {
    pub fn new(max_attempts: u32, lock_duration_minutes: i64) -> Self {
        Self {
            max_attempts,
            lock_duration: Duration::minutes(lock_duration_minutes),
        }
    }

    /// Derived lock check.
    pub fn is_locked(&self, user: &User, now: DateTime<Utc>) -> bool {
        matches!(user.locked_until, Some(until) if until > now)
    }

    /// Record a failed attempt; crossing the threshold sets the lock.
    pub fn record_failure(&self, user: &mut User, now: DateTime<Utc>) {
        let next = user.failed_login_attempts + 1;

        if next >= i64::from(self.max_attempts) && !self.is_locked(user, now) {
            user.locked_until = Some(now + self.lock_duration);
        }

        user.failed_login_attempts = next;
    }

    /// Record a successful login: counter to zero, lock cleared.
    pub fn record_success(&self, user: &mut User) {
        user.failed_login_attempts = 0;
        user.locked_until = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::user::Role;

    fn policy() -> LockoutPolicy {
        LockoutPolicy::new(5, 120)
    }

    fn user() -> User {
        let now = Utc::now();
        User {
            id: "u-1".to_string(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: Some("digest".to_string()),
            profile_photo: None,
            role: Role::Author,
            is_verified: true,
            verification_code: None,
            verification_code_expires_at: None,
            google_id: None,
            refresh_token: None,
            last_login_at: None,
            failed_login_attempts: 0,
            locked_until: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_not_locked_below_threshold() {
        let policy = policy();
        let now = Utc::now();
        let mut user = user();

        for _ in 0..4 {
            policy.record_failure(&mut user, now);
        }

        assert_eq!(user.failed_login_attempts, 4);
        assert!(!policy.is_locked(&user, now));
    }

    #[test]
    fn test_locked_at_threshold() {
        let policy = policy();
        let now = Utc::now();
        let mut user = user();

        for _ in 0..5 {
            policy.record_failure(&mut user, now);
        }

        assert_eq!(user.failed_login_attempts, 5);
        assert!(policy.is_locked(&user, now));
    }

    #[test]
    fn test_lock_expires_with_time() {
        let policy = policy();
        let now = Utc::now();
        let mut user = user();

        for _ in 0..5 {
            policy.record_failure(&mut user, now);
        }
        assert!(policy.is_locked(&user, now));

        let after_lock = now + Duration::minutes(121);
        assert!(!policy.is_locked(&user, after_lock));
    }

    #[test]
    fn test_failures_past_threshold_keep_existing_lock() {
        let policy = policy();
        let now = Utc::now();
        let mut user = user();

        for _ in 0..5 {
            policy.record_failure(&mut user, now);
        }
        let locked_until = user.locked_until;

        policy.record_failure(&mut user, now);
        assert_eq!(user.failed_login_attempts, 6);
        assert_eq!(user.locked_until, locked_until);
    }

    #[test]
    fn test_success_resets_counter_and_lock() {
        let policy = policy();
        let now = Utc::now();
        let mut user = user();

        for _ in 0..5 {
            policy.record_failure(&mut user, now);
        }

        policy.record_success(&mut user);
        assert_eq!(user.failed_login_attempts, 0);
        assert!(user.locked_until.is_none());
        assert!(!policy.is_locked(&user, now));
    }
}
