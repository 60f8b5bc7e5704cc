//! Persistence collaborator for user records.
//!
//! Runtime-built queries against the users table. Uniqueness of username,
//! email, and google_id is enforced by the schema; the store surfaces
//! violations as database errors and the manager pre-checks where a typed
//! conflict is wanted.

use crate::db::user::{Role, User};
use crate::error::ApiResult;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

const USER_COLUMNS: &str = "id, username, email, password_hash, profile_photo, role, \
     is_verified, verification_code, verification_code_expires_at, google_id, \
     refresh_token, last_login_at, failed_login_attempts, locked_until, \
     created_at, updated_at";

/// Fields supplied when inserting a new user row.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub profile_photo: Option<String>,
    pub role: Role,
    pub is_verified: bool,
    pub google_id: Option<String>,
    pub verification_code: Option<String>,
    pub verification_code_expires_at: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
}

/// User persistence service.
#[derive(Clone)]
pub struct UserStore {
    db: SqlitePool,
}

impl UserStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Insert a new user and return the stored record.
    pub async fn create(&self, new: NewUser) -> ApiResult<User> {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            profile_photo: new.profile_photo,
            role: new.role,
            is_verified: new.is_verified,
            verification_code: new.verification_code,
            verification_code_expires_at: new.verification_code_expires_at,
            google_id: new.google_id,
            refresh_token: None,
            last_login_at: new.last_login_at,
            failed_login_attempts: 0,
            locked_until: None,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO users (id, username, email, password_hash, profile_photo, role, \
             is_verified, verification_code, verification_code_expires_at, google_id, \
             refresh_token, last_login_at, failed_login_attempts, locked_until, \
             created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.profile_photo)
        .bind(user.role)
        .bind(user.is_verified)
        .bind(&user.verification_code)
        .bind(user.verification_code_expires_at)
        .bind(&user.google_id)
        .bind(&user.refresh_token)
        .bind(user.last_login_at)
        .bind(user.failed_login_attempts)
        .bind(user.locked_until)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.db)
        .await?;

        Ok(user)
    }

    /// Look up by id.
    pub async fn find_by_id(&self, id: &str) -> ApiResult<Option<User>> {
        self.find_where("id = ?1", id).await
    }

    /// Look up by email; input is matched against the lowercased column.
    pub async fn find_by_email(&self, email: &str) -> ApiResult<Option<User>> {
        self.find_where("email = ?1", &email.trim().to_lowercase())
            .await
    }

    /// Look up by username.
    pub async fn find_by_username(&self, username: &str) -> ApiResult<Option<User>> {
        self.find_where("username = ?1", username).await
    }

    /// Look up by external-identity id.
    pub async fn find_by_google_id(&self, google_id: &str) -> ApiResult<Option<User>> {
        self.find_where("google_id = ?1", google_id).await
    }

    async fn find_where(&self, clause: &str, value: &str) -> ApiResult<Option<User>> {
        let query = format!("SELECT {} FROM users WHERE {}", USER_COLUMNS, clause);

        let user = sqlx::query_as::<_, User>(&query)
            .bind(value)
            .fetch_optional(&self.db)
            .await?;

        Ok(user)
    }

    /// Persist the mutable fields of a user record. Last write wins;
    /// refresh-token rotation goes through `swap_refresh_token` instead.
    pub async fn save(&self, user: &mut User) -> ApiResult<()> {
        user.updated_at = Utc::now();

        sqlx::query(
            "UPDATE users SET username = ?1, email = ?2, password_hash = ?3, \
             profile_photo = ?4, role = ?5, is_verified = ?6, verification_code = ?7, \
             verification_code_expires_at = ?8, google_id = ?9, refresh_token = ?10, \
             last_login_at = ?11, failed_login_attempts = ?12, locked_until = ?13, \
             updated_at = ?14 WHERE id = ?15",
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.profile_photo)
        .bind(user.role)
        .bind(user.is_verified)
        .bind(&user.verification_code)
        .bind(user.verification_code_expires_at)
        .bind(&user.google_id)
        .bind(&user.refresh_token)
        .bind(user.last_login_at)
        .bind(user.failed_login_attempts)
        .bind(user.locked_until)
        .bind(user.updated_at)
        .bind(&user.id)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Rotate the stored refresh token in a single conditional update.
    ///
    /// Returns false when the presented token no longer matches the stored
    /// one, so two racing refresh calls cannot both rotate from the same
    /// value.
    pub async fn swap_refresh_token(
        &self,
        id: &str,
        presented: &str,
        replacement: &str,
    ) -> ApiResult<bool> {
        let result = sqlx::query(
            "UPDATE users SET refresh_token = ?1, updated_at = ?2 \
             WHERE id = ?3 AND refresh_token = ?4",
        )
        .bind(replacement)
        .bind(Utc::now())
        .bind(id)
        .bind(presented)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Clear the stored refresh token (logout). Idempotent.
    pub async fn clear_refresh_token(&self, id: &str) -> ApiResult<()> {
        sqlx::query("UPDATE users SET refresh_token = NULL, updated_at = ?1 WHERE id = ?2")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup_store() -> UserStore {
        let db = SqlitePool::connect(":memory:").await.unwrap();
        crate::db::run_migrations(&db).await.unwrap();
        UserStore::new(db)
    }

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: Some("digest".to_string()),
            profile_photo: None,
            role: Role::Author,
            is_verified: false,
            google_id: None,
            verification_code: None,
            verification_code_expires_at: None,
            last_login_at: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let store = setup_store().await;
        let created = store.create(new_user("alice", "alice@x.com")).await.unwrap();

        let by_id = store.find_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(by_id.username, "alice");
        assert_eq!(by_id.role, Role::Author);
        assert_eq!(by_id.failed_login_attempts, 0);

        let by_email = store.find_by_email("alice@x.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, created.id);

        let by_username = store.find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(by_username.id, created.id);

        assert!(store.find_by_email("nobody@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_email_lookup_is_case_insensitive() {
        let store = setup_store().await;
        store.create(new_user("alice", "alice@x.com")).await.unwrap();

        let found = store.find_by_email("  Alice@X.com ").await.unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn test_unique_indexes_enforced() {
        let store = setup_store().await;
        store.create(new_user("alice", "alice@x.com")).await.unwrap();

        assert!(store.create(new_user("alice", "other@x.com")).await.is_err());
        assert!(store.create(new_user("bob", "alice@x.com")).await.is_err());
    }

    #[tokio::test]
    async fn test_google_id_unique_but_sparse() {
        let store = setup_store().await;

        // Any number of rows without an external id
        store.create(new_user("alice", "alice@x.com")).await.unwrap();
        store.create(new_user("bob", "bob@x.com")).await.unwrap();

        let mut with_id = new_user("carol", "carol@x.com");
        with_id.google_id = Some("goog-1".to_string());
        store.create(with_id).await.unwrap();

        let mut duplicate = new_user("dave", "dave@x.com");
        duplicate.google_id = Some("goog-1".to_string());
        assert!(store.create(duplicate).await.is_err());
    }

    #[tokio::test]
    async fn test_save_round_trips_mutations() {
        let store = setup_store().await;
        let mut user = store.create(new_user("alice", "alice@x.com")).await.unwrap();

        user.is_verified = true;
        user.verification_code = Some("123456".to_string());
        user.failed_login_attempts = 3;
        store.save(&mut user).await.unwrap();

        let reloaded = store.find_by_id(&user.id).await.unwrap().unwrap();
        assert!(reloaded.is_verified);
        assert_eq!(reloaded.verification_code.as_deref(), Some("123456"));
        assert_eq!(reloaded.failed_login_attempts, 3);
    }

    #[tokio::test]
    async fn test_swap_refresh_token_is_conditional() {
        let store = setup_store().await;
        let mut user = store.create(new_user("alice", "alice@x.com")).await.unwrap();

        user.refresh_token = Some("old-token".to_string());
        store.save(&mut user).await.unwrap();

        // Wrong presented value: no rotation
        assert!(!store
            .swap_refresh_token(&user.id, "stale-token", "new-token")
            .await
            .unwrap());

        // Matching value rotates
        assert!(store
            .swap_refresh_token(&user.id, "old-token", "new-token")
            .await
            .unwrap());

        let reloaded = store.find_by_id(&user.id).await.unwrap().unwrap();
        assert_eq!(reloaded.refresh_token.as_deref(), Some("new-token"));

        // The old value can no longer rotate
        assert!(!store
            .swap_refresh_token(&user.id, "old-token", "another")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_clear_refresh_token_idempotent() {
        let store = setup_store().await;
        let mut user = store.create(new_user("alice", "alice@x.com")).await.unwrap();

        user.refresh_token = Some("token".to_string());
        store.save(&mut user).await.unwrap();

        store.clear_refresh_token(&user.id).await.unwrap();
        store.clear_refresh_token(&user.id).await.unwrap();

        let reloaded = store.find_by_id(&user.id).await.unwrap().unwrap();
        assert!(reloaded.refresh_token.is_none());
    }
}
