//! Account manager: the auth flows over user records.
//!
//! Composes the password hasher, verification codes, lockout tracking,
//! and token issuance into register / verify / login / refresh / logout
//! and the external-identity path. All side effects go through the
//! `UserStore` and the `Notifier`; notification failures never abort a
//! flow, they surface as a boolean to the caller.

use crate::{
    account::{store::NewUser, ExternalProfile, UserStore},
    config::AuthConfig,
    db::user::{Role, User},
    error::{ApiError, ApiResult},
    mailer::Notifier,
    security::{
        code,
        lockout::LockoutPolicy,
        password, policy,
        tokens::{TokenIssuer, TokenPair},
    },
};
use chrono::{Duration, Utc};
use rand::Rng;
use sqlx::SqlitePool;
use std::sync::Arc;

/// Logins this long after the previous one require a fresh email code
/// before tokens are issued.
const STALE_LOGIN_AFTER_DAYS: i64 = 7;

/// Attempts at generating a non-colliding username for external signups.
const USERNAME_RETRY_LIMIT: usize = 5;

/// Outcome of a password login.
#[derive(Debug)]
pub enum LoginOutcome {
    /// Credentials accepted; tokens issued.
    Success { user: User, tokens: TokenPair },
    /// Credentials accepted, but the account was inactive for over a week;
    /// a code was emailed and must be confirmed before tokens are issued.
    PendingVerification { user_id: String, email_sent: bool },
}

/// Account manager service.
pub struct AccountManager {
    store: UserStore,
    tokens: TokenIssuer,
    lockout: LockoutPolicy,
    notifier: Arc<dyn Notifier>,
    code_ttl_minutes: i64,
    bcrypt_cost: u32,
}

impl AccountManager {
    /// Create a new account manager. All tunables come from the injected
    /// configuration; nothing is read from the environment here.
    pub fn new(db: SqlitePool, auth: &AuthConfig, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store: UserStore::new(db),
            tokens: TokenIssuer::new(auth),
            lockout: LockoutPolicy::new(auth.max_login_attempts, auth.lock_duration_minutes),
            notifier,
            code_ttl_minutes: auth.verification_code_ttl_minutes,
            bcrypt_cost: auth.bcrypt_cost,
        }
    }

    /// Register a new local account.
    ///
    /// Returns the created user (role author, unverified) and whether the
    /// verification code was delivered.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password_plain: &str,
    ) -> ApiResult<(User, bool)> {
        let username = username.trim();
        let email = normalize_email(email);

        validate_username(username)?;
        validate_email(&email)?;
        validate_password(password_plain)?;

        if self.store.find_by_email(&email).await?.is_some() {
            return Err(ApiError::Conflict(
                "User with this email already exists".to_string(),
            ));
        }

        if self.store.find_by_username(username).await?.is_some() {
            return Err(ApiError::Conflict("Username is already taken".to_string()));
        }

        let password_hash = password::hash(password_plain, self.bcrypt_cost)?;

        let now = Utc::now();
        let verification_code = code::generate();
        let user = self
            .store
            .create(NewUser {
                username: username.to_string(),
                email: email.clone(),
                password_hash: Some(password_hash),
                profile_photo: None,
                role: Role::Author,
                is_verified: false,
                google_id: None,
                verification_code: Some(verification_code.clone()),
                verification_code_expires_at: Some(code::expiry(now, self.code_ttl_minutes)),
                last_login_at: None,
            })
            .await?;

        let email_sent = self
            .notifier
            .send_verification_code(&user.email, &user.username, &verification_code)
            .await;

        tracing::info!(user_id = %user.id, email_sent, "registered new account");

        Ok((user, email_sent))
    }

    /// Verify an email address with the code sent at registration.
    ///
    /// Returns the user and whether the welcome message was delivered.
    pub async fn verify_email(&self, email: &str, supplied_code: &str) -> ApiResult<(User, bool)> {
        let mut user = self
            .store
            .find_by_email(email)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

        if user.is_verified {
            return Err(ApiError::AlreadyVerified);
        }

        let now = Utc::now();
        if !code::matches(
            user.verification_code.as_deref(),
            user.verification_code_expires_at,
            supplied_code,
            now,
        ) {
            return Err(ApiError::InvalidCode);
        }

        user.is_verified = true;
        user.verification_code = None;
        user.verification_code_expires_at = None;
        self.store.save(&mut user).await?;

        let welcomed = self.notifier.send_welcome(&user.email, &user.username).await;

        tracing::info!(user_id = %user.id, "email verified");

        Ok((user, welcomed))
    }

    /// Send a fresh verification code to an unverified account.
    pub async fn resend_verification(&self, email: &str) -> ApiResult<(User, bool)> {
        let mut user = self
            .store
            .find_by_email(email)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

        if user.is_verified {
            return Err(ApiError::AlreadyVerified);
        }

        // Regenerating invalidates whatever code was outstanding
        let now = Utc::now();
        let verification_code = code::generate();
        user.verification_code = Some(verification_code.clone());
        user.verification_code_expires_at = Some(code::expiry(now, self.code_ttl_minutes));
        self.store.save(&mut user).await?;

        let email_sent = self
            .notifier
            .send_verification_code(&user.email, &user.username, &verification_code)
            .await;

        Ok((user, email_sent))
    }

    /// Password login.
    ///
    /// The lock check runs before the password check and wins. A wrong
    /// password records a lockout failure. An account inactive for over a
    /// week gets a pending outcome with an emailed code instead of tokens.
    ///
    /// Note: verification state is intentionally not consulted here; an
    /// unverified account can log in. See DESIGN.md.
    pub async fn login(&self, email: &str, password_plain: &str) -> ApiResult<LoginOutcome> {
        let now = Utc::now();

        // Unknown email and wrong password answer identically
        let mut user = self
            .store
            .find_by_email(email)
            .await?
            .ok_or(ApiError::InvalidCredentials)?;

        if self.lockout.is_locked(&user, now) {
            return Err(ApiError::Locked);
        }

        if !password::verify(password_plain, user.password_hash.as_deref()) {
            self.lockout.record_failure(&mut user, now);
            self.store.save(&mut user).await?;
            return Err(ApiError::InvalidCredentials);
        }

        if user.failed_login_attempts > 0 || user.locked_until.is_some() {
            self.lockout.record_success(&mut user);
        }

        let stale = user
            .last_login_at
            .map(|last| last < now - Duration::days(STALE_LOGIN_AFTER_DAYS))
            .unwrap_or(false);

        if stale {
            let verification_code = code::generate();
            user.verification_code = Some(verification_code.clone());
            user.verification_code_expires_at = Some(code::expiry(now, self.code_ttl_minutes));
            self.store.save(&mut user).await?;

            let email_sent = self
                .notifier
                .send_relogin_code(&user.email, &user.username, &verification_code)
                .await;

            tracing::info!(user_id = %user.id, "stale login, verification code required");

            return Ok(LoginOutcome::PendingVerification {
                user_id: user.id,
                email_sent,
            });
        }

        let tokens = self.open_session(&mut user).await?;

        Ok(LoginOutcome::Success { user, tokens })
    }

    /// Complete a login that was parked pending a re-verification code.
    ///
    /// Same code check as email verification, but without the verified
    /// gate; success issues tokens.
    pub async fn complete_pending_login(
        &self,
        email: &str,
        supplied_code: &str,
    ) -> ApiResult<(User, TokenPair)> {
        let mut user = self
            .store
            .find_by_email(email)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

        let now = Utc::now();
        if !code::matches(
            user.verification_code.as_deref(),
            user.verification_code_expires_at,
            supplied_code,
            now,
        ) {
            return Err(ApiError::InvalidCode);
        }

        user.verification_code = None;
        user.verification_code_expires_at = None;

        let tokens = self.open_session(&mut user).await?;

        Ok((user, tokens))
    }

    /// Exchange a refresh token for a new pair, rotating the stored token.
    ///
    /// A bad signature, an expired token, an unknown account, and a token
    /// that has been rotated out all answer the same way.
    pub async fn refresh(&self, presented: &str) -> ApiResult<TokenPair> {
        let user_id = self
            .tokens
            .verify_refresh(presented)
            .map_err(|_| ApiError::InvalidToken)?;

        let user = self
            .store
            .find_by_id(&user_id)
            .await?
            .ok_or(ApiError::InvalidToken)?;

        let pair = self.tokens.issue(&user.id)?;

        // Single conditional update: a stale token (even one with a valid
        // signature) no longer matches the stored value and cannot rotate
        let swapped = self
            .store
            .swap_refresh_token(&user.id, presented, &pair.refresh_token)
            .await?;

        if !swapped {
            return Err(ApiError::InvalidToken);
        }

        Ok(pair)
    }

    /// Drop the account's active refresh token. Idempotent.
    pub async fn logout(&self, user_id: &str) -> ApiResult<()> {
        self.store.clear_refresh_token(user_id).await?;
        tracing::info!(user_id = %user_id, "logged out");
        Ok(())
    }

    /// Login or signup through an external identity.
    ///
    /// Three branches: known external id, known email (link + mark
    /// verified + backfill photo), or a brand-new account with a generated
    /// username. No password is involved in any branch.
    pub async fn login_external(&self, profile: ExternalProfile) -> ApiResult<(User, TokenPair)> {
        if let Some(mut user) = self.store.find_by_google_id(&profile.google_id).await? {
            let tokens = self.open_session(&mut user).await?;
            return Ok((user, tokens));
        }

        let email = normalize_email(&profile.email);

        if let Some(mut user) = self.store.find_by_email(&email).await? {
            user.google_id = Some(profile.google_id.clone());
            user.is_verified = true;
            if user.profile_photo.is_none() {
                user.profile_photo = profile.profile_photo.clone();
            }
            let tokens = self.open_session(&mut user).await?;
            tracing::info!(user_id = %user.id, "linked external identity to existing account");
            return Ok((user, tokens));
        }

        let username = self.generate_unique_username(&profile.display_name).await?;

        let mut user = self
            .store
            .create(NewUser {
                username,
                email,
                password_hash: None,
                profile_photo: profile.profile_photo,
                role: Role::Author,
                is_verified: true,
                google_id: Some(profile.google_id),
                verification_code: None,
                verification_code_expires_at: None,
                last_login_at: None,
            })
            .await?;

        let tokens = self.open_session(&mut user).await?;

        tracing::info!(user_id = %user.id, "created account from external identity");

        Ok((user, tokens))
    }

    /// Validate an access token and load its account.
    pub async fn authenticate_access(&self, token: &str) -> ApiResult<User> {
        let user_id = self.tokens.verify_access(token)?;

        self.store
            .find_by_id(&user_id)
            .await?
            .ok_or(ApiError::InvalidToken)
    }

    /// Load an account by id ("who am I").
    pub async fn current_user(&self, user_id: &str) -> ApiResult<User> {
        self.store
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
    }

    /// Administrative role change. Admins may change anyone's role except
    /// their own.
    pub async fn change_role(
        &self,
        acting: &User,
        target_id: &str,
        new_role: Role,
    ) -> ApiResult<User> {
        if !policy::can(acting.role, false, policy::Action::ManageUsers) {
            return Err(ApiError::Forbidden("Admin role required".to_string()));
        }

        if acting.id == target_id {
            return Err(ApiError::Validation(
                "You cannot change your own role".to_string(),
            ));
        }

        let mut target = self
            .store
            .find_by_id(target_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

        target.role = new_role;
        self.store.save(&mut target).await?;

        tracing::info!(
            acting = %acting.id,
            target = %target.id,
            role = new_role.as_str(),
            "role changed"
        );

        Ok(target)
    }

    /// Issue a token pair and persist it with a fresh last-login stamp.
    async fn open_session(&self, user: &mut User) -> ApiResult<TokenPair> {
        let pair = self.tokens.issue(&user.id)?;
        user.refresh_token = Some(pair.refresh_token.clone());
        user.last_login_at = Some(Utc::now());
        self.store.save(user).await?;
        Ok(pair)
    }

    /// Derive a username from an external display name, retrying the
    /// random suffix on collision instead of failing on the first clash.
    async fn generate_unique_username(&self, display_name: &str) -> ApiResult<String> {
        let base: String = display_name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        let base = if base.is_empty() { "writer".to_string() } else { base };

        for _ in 0..USERNAME_RETRY_LIMIT {
            let candidate = format!("{}{}", base, rand::thread_rng().gen_range(0..1000));
            if self.store.find_by_username(&candidate).await?.is_none() {
                return Ok(candidate);
            }
        }

        Err(ApiError::Conflict(
            "Could not allocate a unique username".to_string(),
        ))
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_username(username: &str) -> ApiResult<()> {
    if username.len() < 3 || username.len() > 30 {
        return Err(ApiError::Validation(
            "Username must be between 3 and 30 characters".to_string(),
        ));
    }

    if !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ApiError::Validation(
            "Username can only contain letters, numbers, and underscores".to_string(),
        ));
    }

    Ok(())
}

fn validate_email(email: &str) -> ApiResult<()> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.'),
        None => false,
    };

    if !valid {
        return Err(ApiError::Validation(
            "Please provide a valid email".to_string(),
        ));
    }

    Ok(())
}

fn validate_password(password: &str) -> ApiResult<()> {
    if password.len() < 6 {
        return Err(ApiError::Validation(
            "Password must be at least 6 characters long".to_string(),
        ));
    }

    Ok(())
}
