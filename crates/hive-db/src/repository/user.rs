//! # User Repository
//!
//! Database operations for back-office user accounts.
//!
//! The authentication service reads a full `User`, applies its policy
//! (lockout counters, session rotation, 2FA state) and writes the whole
//! security state back through [`UserRepository::update`]. Email lookup is
//! case-insensitive via the column's NOCASE collation.

use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use hive_core::User;

const USER_COLUMNS: &str = r#"
    id, email, password_hash, first_name, last_name, role, active,
    confirmed_at, failed_attempts, locked_at, unlock_token,
    two_factor_enabled, two_factor_secret, two_factor_backup_codes,
    sms_verification_enabled, phone_number, phone_verified_at,
    sms_verification_code, sms_code_expires_at,
    session_token, password_changed_at, must_change_password,
    sign_in_count, current_sign_in_at, last_sign_in_at,
    created_at, updated_at
"#;

/// Repository for user database operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Creates a new UserRepository.
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Gets a user by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Finds a user by email, case-insensitively.
    pub async fn find_by_email(&self, email: &str) -> DbResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Finds a user by their account unlock token.
    pub async fn find_by_unlock_token(&self, token: &str) -> DbResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE unlock_token = ?1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Inserts a new user.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - email or phone number taken
    pub async fn insert(&self, user: &User) -> DbResult<()> {
        debug!(email = %user.email, "Inserting user");

        sqlx::query(
            r#"
            INSERT INTO users (
                id, email, password_hash, first_name, last_name, role, active,
                confirmed_at, failed_attempts, locked_at, unlock_token,
                two_factor_enabled, two_factor_secret, two_factor_backup_codes,
                sms_verification_enabled, phone_number, phone_verified_at,
                sms_verification_code, sms_code_expires_at,
                session_token, password_changed_at, must_change_password,
                sign_in_count, current_sign_in_at, last_sign_in_at,
                created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7,
                ?8, ?9, ?10, ?11,
                ?12, ?13, ?14,
                ?15, ?16, ?17,
                ?18, ?19,
                ?20, ?21, ?22,
                ?23, ?24, ?25,
                ?26, ?27
            )
            "#,
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.role)
        .bind(user.active)
        .bind(user.confirmed_at)
        .bind(user.failed_attempts)
        .bind(user.locked_at)
        .bind(&user.unlock_token)
        .bind(user.two_factor_enabled)
        .bind(&user.two_factor_secret)
        .bind(&user.two_factor_backup_codes)
        .bind(user.sms_verification_enabled)
        .bind(&user.phone_number)
        .bind(user.phone_verified_at)
        .bind(&user.sms_verification_code)
        .bind(user.sms_code_expires_at)
        .bind(&user.session_token)
        .bind(user.password_changed_at)
        .bind(user.must_change_password)
        .bind(user.sign_in_count)
        .bind(user.current_sign_in_at)
        .bind(user.last_sign_in_at)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Writes a user's full mutable state back.
    ///
    /// The authentication flow is read-modify-write over the whole security
    /// state (counters, tokens, 2FA fields), so a single broad update keeps
    /// the repository honest about what can change.
    pub async fn update(&self, user: &User) -> DbResult<()> {
        debug!(id = %user.id, "Updating user");

        let now = chrono::Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE users SET
                email = ?2,
                password_hash = ?3,
                first_name = ?4,
                last_name = ?5,
                role = ?6,
                active = ?7,
                confirmed_at = ?8,
                failed_attempts = ?9,
                locked_at = ?10,
                unlock_token = ?11,
                two_factor_enabled = ?12,
                two_factor_secret = ?13,
                two_factor_backup_codes = ?14,
                sms_verification_enabled = ?15,
                phone_number = ?16,
                phone_verified_at = ?17,
                sms_verification_code = ?18,
                sms_code_expires_at = ?19,
                session_token = ?20,
                password_changed_at = ?21,
                must_change_password = ?22,
                sign_in_count = ?23,
                current_sign_in_at = ?24,
                last_sign_in_at = ?25,
                updated_at = ?26
            WHERE id = ?1
            "#,
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.role)
        .bind(user.active)
        .bind(user.confirmed_at)
        .bind(user.failed_attempts)
        .bind(user.locked_at)
        .bind(&user.unlock_token)
        .bind(user.two_factor_enabled)
        .bind(&user.two_factor_secret)
        .bind(&user.two_factor_backup_codes)
        .bind(user.sms_verification_enabled)
        .bind(&user.phone_number)
        .bind(user.phone_verified_at)
        .bind(&user.sms_verification_code)
        .bind(user.sms_code_expires_at)
        .bind(&user.session_token)
        .bind(user.password_changed_at)
        .bind(user.must_change_password)
        .bind(user.sign_in_count)
        .bind(user.current_sign_in_at)
        .bind(user.last_sign_in_at)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", &user.id));
        }

        Ok(())
    }

    /// Counts active admin accounts.
    ///
    /// The last admin must never be deactivated or deleted; callers check
    /// this before destructive user management operations.
    pub async fn count_active_admins(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users WHERE role = 'admin' AND active = 1",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

/// Helper to generate a new user ID.
pub fn generate_user_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::Utc;
    use hive_core::UserRole;

    fn user(email: &str) -> User {
        let now = Utc::now();
        User {
            id: generate_user_id(),
            email: email.to_string(),
            password_hash: "argon2-hash-placeholder".to_string(),
            first_name: "Avery".to_string(),
            last_name: "Quinn".to_string(),
            role: UserRole::Employee,
            active: true,
            confirmed_at: Some(now),
            failed_attempts: 0,
            locked_at: None,
            unlock_token: None,
            two_factor_enabled: false,
            two_factor_secret: None,
            two_factor_backup_codes: None,
            sms_verification_enabled: false,
            phone_number: None,
            phone_verified_at: None,
            sms_verification_code: None,
            sms_code_expires_at: None,
            session_token: Some("initial-session".to_string()),
            password_changed_at: None,
            must_change_password: false,
            sign_in_count: 0,
            current_sign_in_at: None,
            last_sign_in_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_email_lookup_is_case_insensitive() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.users().insert(&user("clerk@example.com")).await.unwrap();

        let found = db
            .users()
            .find_by_email("CLERK@Example.COM")
            .await
            .unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected_case_insensitively() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.users().insert(&user("clerk@example.com")).await.unwrap();

        let err = db
            .users()
            .insert(&user("CLERK@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_update_round_trips_security_state() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut u = user("clerk@example.com");
        db.users().insert(&u).await.unwrap();

        u.failed_attempts = 3;
        u.locked_at = Some(Utc::now());
        u.unlock_token = Some("tok".to_string());
        u.session_token = Some("rotated".to_string());
        db.users().update(&u).await.unwrap();

        let fetched = db.users().get_by_id(&u.id).await.unwrap().unwrap();
        assert_eq!(fetched.failed_attempts, 3);
        assert!(fetched.locked_at.is_some());
        assert_eq!(fetched.session_token.as_deref(), Some("rotated"));
    }

    #[tokio::test]
    async fn test_count_active_admins() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut admin = user("admin@example.com");
        admin.role = UserRole::Admin;
        db.users().insert(&admin).await.unwrap();
        db.users().insert(&user("clerk@example.com")).await.unwrap();

        assert_eq!(db.users().count_active_admins().await.unwrap(), 1);
    }
}
