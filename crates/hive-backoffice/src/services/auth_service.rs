//! Authentication service.
//!
//! Owns the account security policy: password verification with lockout,
//! bearer token issuance, session rotation, two-factor (TOTP + backup codes
//! + SMS), and the rate limits in front of it all.
//!
//! ## Login Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  login(email, password, client_key)                                     │
//! │     │                                                                   │
//! │     ├── rate limit (before credentials are touched)  → 429             │
//! │     ├── locked within 30-min window                  → 423             │
//! │     ├── bad password → count + lock at 5 failures    → 401             │
//! │     ├── inactive / unconfirmed                       → 403             │
//! │     │                                                                   │
//! │     ├── must_change_password → RequiresPasswordChange                  │
//! │     ├── two_factor_enabled   → RequiresTwoFactor {methods}             │
//! │     └── otherwise            → complete_login                          │
//! │                                  │                                      │
//! │                                  ├── sign-in tracking                  │
//! │                                  ├── rotate session token              │
//! │                                  └── issue bearer token (24h)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use chrono::{Duration, Utc};
use data_encoding::{BASE32_NOPAD, BASE64URL_NOPAD};
use rand::{Rng, RngCore};
use totp_rs::{Algorithm, Secret, TOTP};
use tracing::{info, warn};

use crate::config::BackofficeConfig;
use crate::context::AuthContext;
use crate::error::{ApiError, ApiResult};
use crate::ratelimit::{CounterStore, RateLimitPolicy, RateLimiter};
use crate::services::sms_service::SmsSender;
use crate::token::{extract_bearer_token, TokenManager};
use hive_core::validation::{normalize_email, validate_password};
use hive_core::{User, MAX_FAILED_ATTEMPTS};
use hive_db::Database;

/// SMS verification codes stay valid this long.
const SMS_CODE_TTL_MINUTES: i64 = 10;

/// Issuer shown in authenticator apps.
const TOTP_ISSUER: &str = "Hive POS";

/// Number of single-use backup codes handed out per 2FA setup.
const BACKUP_CODE_COUNT: usize = 10;

// =============================================================================
// Outcomes
// =============================================================================

/// What a successful credentials check leads to.
#[derive(Debug)]
pub enum LoginOutcome {
    /// Fully signed in.
    Success { token: String, user: User },
    /// Credentials fine, a second factor is required to finish.
    RequiresTwoFactor {
        user_id: String,
        verification_methods: Vec<String>,
    },
    /// Credentials fine, but the password must be changed first.
    RequiresPasswordChange { user_id: String },
}

/// Result of enabling TOTP 2FA: shown to the user exactly once.
#[derive(Debug)]
pub struct TwoFactorSetup {
    pub secret: String,
    pub provisioning_uri: String,
    pub backup_codes: Vec<String>,
}

// =============================================================================
// Service
// =============================================================================

/// Authentication service.
pub struct AuthService {
    db: Database,
    tokens: TokenManager,
    limiter: RateLimiter,
    sms: Arc<dyn SmsSender>,
}

impl AuthService {
    /// Create a new authentication service.
    pub fn new(
        db: Database,
        config: &BackofficeConfig,
        counters: Arc<dyn CounterStore>,
        sms: Arc<dyn SmsSender>,
    ) -> Self {
        let tokens = TokenManager::new(config.jwt_secret.clone(), config.token_lifetime_secs);
        let limiter = RateLimiter::new(
            counters,
            RateLimitPolicy {
                max_attempts: config.login_max_attempts,
                window: std::time::Duration::from_secs(config.login_window_secs),
            },
            RateLimitPolicy {
                max_attempts: config.sms_max_attempts,
                window: std::time::Duration::from_secs(config.sms_window_secs),
            },
        );

        AuthService {
            db,
            tokens,
            limiter,
            sms,
        }
    }

    /// The token manager, for handlers that need `expires_at` fields.
    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    // =========================================================================
    // Login
    // =========================================================================

    /// Full login flow. `client_key` identifies the caller for rate limiting
    /// (client address, resolved by the edge).
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        client_key: &str,
    ) -> ApiResult<LoginOutcome> {
        self.limiter.check_login(client_key)?;

        let user = self.authenticate(email, password).await?;
        self.limiter.clear_login(client_key);

        if user.must_change_password {
            return Ok(LoginOutcome::RequiresPasswordChange { user_id: user.id });
        }

        if user.two_factor_enabled {
            let verification_methods = user
                .verification_methods()
                .into_iter()
                .map(String::from)
                .collect();
            return Ok(LoginOutcome::RequiresTwoFactor {
                user_id: user.id,
                verification_methods,
            });
        }

        let (token, user) = self.complete_login(user).await?;
        Ok(LoginOutcome::Success { token, user })
    }

    /// Verifies credentials and enforces the lockout policy.
    ///
    /// A locked account refuses even the correct password until the lock
    /// expires or is explicitly lifted.
    pub async fn authenticate(&self, email: &str, password: &str) -> ApiResult<User> {
        let email = normalize_email(email);
        let now = Utc::now();

        let Some(mut user) = self.db.users().find_by_email(&email).await? else {
            return Err(ApiError::InvalidCredentials);
        };

        if user.access_locked(now) {
            warn!(email = %email, "Login attempt on locked account");
            return Err(ApiError::AccountLocked);
        }

        if !verify_password(password, &user.password_hash) {
            user.failed_attempts += 1;
            if user.failed_attempts >= MAX_FAILED_ATTEMPTS {
                user.locked_at = Some(now);
                user.unlock_token = Some(generate_token());
                warn!(email = %email, attempts = user.failed_attempts, "Account locked");
            }
            self.db.users().update(&user).await?;
            return Err(ApiError::InvalidCredentials);
        }

        if !user.active || !user.confirmed() {
            return Err(ApiError::AccountInactive);
        }

        // Successful check clears any stale counters and expired locks
        if user.failed_attempts > 0 || user.locked_at.is_some() {
            user.failed_attempts = 0;
            user.locked_at = None;
            user.unlock_token = None;
            self.db.users().update(&user).await?;
        }

        Ok(user)
    }

    /// Finishes a sign-in: updates tracking, rotates the session token and
    /// issues a bearer token embedding the fresh session.
    ///
    /// Rotating here means each completed login orphans tokens from earlier
    /// sessions on the strict validation path.
    pub async fn complete_login(&self, mut user: User) -> ApiResult<(String, User)> {
        let now = Utc::now();

        user.last_sign_in_at = user.current_sign_in_at.or(Some(now));
        user.current_sign_in_at = Some(now);
        user.sign_in_count += 1;

        let session_token = generate_token();
        user.session_token = Some(session_token.clone());

        self.db.users().update(&user).await?;

        let token = self.tokens.issue(&user, &session_token)?;

        info!(user_id = %user.id, sign_in_count = user.sign_in_count, "Login completed");
        Ok((token, user))
    }

    // =========================================================================
    // Two-Factor Verification
    // =========================================================================

    /// Verifies a second factor and completes the login on success.
    ///
    /// `method` is `"totp"` (authenticator code, falling back to a single-use
    /// backup code) or `"sms"` (the stored 6-digit code).
    pub async fn verify_two_factor(
        &self,
        user_id: &str,
        code: &str,
        method: &str,
    ) -> ApiResult<(String, User)> {
        let mut user = self
            .db
            .users()
            .get_by_id(user_id)
            .await?
            .ok_or(ApiError::UserNotFound)?;

        if !user.two_factor_enabled {
            return Err(ApiError::Validation(
                "Two-factor authentication is not enabled".to_string(),
            ));
        }

        let verified = match method {
            "totp" => self.verify_totp_or_backup(&mut user, code).await?,
            "sms" if user.sms_verification_enabled => self.verify_sms(&mut user, code).await?,
            _ => {
                return Err(ApiError::Validation(format!(
                    "Unknown verification method: {method}"
                )))
            }
        };

        if !verified {
            warn!(user_id = %user.id, method = %method, "Two-factor verification failed");
            return Err(ApiError::InvalidVerificationCode);
        }

        self.complete_login(user).await
    }

    /// Checks a TOTP code (±1 timestep of clock drift), then the backup code
    /// set. A matched backup code is consumed.
    async fn verify_totp_or_backup(&self, user: &mut User, code: &str) -> ApiResult<bool> {
        if let Some(secret) = user.two_factor_secret.clone() {
            let totp = build_totp(&secret, &user.email)?;
            if totp.check_current(code).unwrap_or(false) {
                return Ok(true);
            }
        }

        let Some(raw) = user.two_factor_backup_codes.clone() else {
            return Ok(false);
        };
        let mut hashes: Vec<String> = serde_json::from_str(&raw).unwrap_or_default();

        if let Some(idx) = hashes.iter().position(|hash| verify_password(code, hash)) {
            hashes.remove(idx);
            user.two_factor_backup_codes =
                Some(serde_json::to_string(&hashes).unwrap_or_else(|_| "[]".to_string()));
            self.db.users().update(user).await?;
            info!(user_id = %user.id, remaining = hashes.len(), "Backup code consumed");
            return Ok(true);
        }

        Ok(false)
    }

    /// Checks the stored SMS code (10-minute expiry, single use) and marks
    /// the phone verified on success.
    async fn verify_sms(&self, user: &mut User, code: &str) -> ApiResult<bool> {
        let now = Utc::now();

        if !user.sms_code_current(now) {
            return Ok(false);
        }
        if user.sms_verification_code.as_deref() != Some(code) {
            return Ok(false);
        }

        user.sms_verification_code = None;
        user.sms_code_expires_at = None;
        user.phone_verified_at = Some(now);
        self.db.users().update(user).await?;

        Ok(true)
    }

    /// Generates and sends a fresh SMS verification code. Rate limited per
    /// user.
    pub async fn request_sms_code(&self, user_id: &str) -> ApiResult<()> {
        self.limiter.check_sms(user_id)?;

        let mut user = self
            .db
            .users()
            .get_by_id(user_id)
            .await?
            .ok_or(ApiError::UserNotFound)?;

        let Some(phone_number) = user.phone_number.clone() else {
            return Err(ApiError::Validation("Phone number is required".to_string()));
        };

        let code = generate_sms_code();
        user.sms_verification_code = Some(code.clone());
        user.sms_code_expires_at = Some(Utc::now() + Duration::minutes(SMS_CODE_TTL_MINUTES));
        self.db.users().update(&user).await?;

        self.sms
            .send_verification_code(&phone_number, &code)
            .map_err(ApiError::Internal)?;

        info!(user_id = %user.id, "SMS verification code sent");
        Ok(())
    }

    // =========================================================================
    // Token Validation
    // =========================================================================

    /// Resolves the caller's identity from an optional Authorization header.
    ///
    /// No header means an anonymous context; a presented token must decode
    /// and be unexpired, and its user must still exist. This permissive path
    /// does NOT compare the embedded session token against the stored value;
    /// only the strict path below does.
    pub async fn authenticate_optional(
        &self,
        auth_header: Option<&str>,
    ) -> ApiResult<AuthContext> {
        let Some(header) = auth_header else {
            return Ok(AuthContext::Anonymous);
        };

        let token = extract_bearer_token(header).ok_or(ApiError::TokenInvalid)?;
        let claims = self.tokens.validate(token)?;

        let user = self
            .db
            .users()
            .get_by_id(&claims.sub)
            .await?
            .ok_or(ApiError::UserNotFound)?;

        Ok(AuthContext::Authenticated(user))
    }

    /// Validates a token AND cross-checks its embedded session token against
    /// the user's current one, so rotation (login, password change) revokes
    /// older tokens here. Used by refresh and password change.
    pub async fn validate_bearer_strict(&self, token: &str) -> ApiResult<User> {
        let claims = self.tokens.validate(token)?;

        let user = self
            .db
            .users()
            .get_by_id(&claims.sub)
            .await?
            .ok_or(ApiError::UserNotFound)?;

        if user.session_token.as_deref() != Some(claims.session_token.as_str()) {
            return Err(ApiError::TokenInvalid);
        }

        Ok(user)
    }

    /// Exchanges a still-valid token for a fresh one on the same session.
    pub async fn refresh_token(&self, token: &str) -> ApiResult<(String, User)> {
        let user = self.validate_bearer_strict(token).await?;
        let session_token = user
            .session_token
            .clone()
            .ok_or(ApiError::TokenInvalid)?;

        let fresh = self.tokens.issue(&user, &session_token)?;
        Ok((fresh, user))
    }

    // =========================================================================
    // Password Management
    // =========================================================================

    /// Changes a password after re-authenticating with the current one.
    ///
    /// Rotates the session token, which invalidates every other active
    /// session's tokens on the strict path. Returns a fresh token so the
    /// current client stays signed in.
    pub async fn change_password(
        &self,
        user_id: &str,
        current_password: &str,
        new_password: &str,
    ) -> ApiResult<(String, User)> {
        let mut user = self
            .db
            .users()
            .get_by_id(user_id)
            .await?
            .ok_or(ApiError::UserNotFound)?;

        if !verify_password(current_password, &user.password_hash) {
            return Err(ApiError::InvalidCredentials);
        }

        validate_password(new_password)?;

        user.password_hash = hash_password(new_password)?;
        user.password_changed_at = Some(Utc::now());
        user.must_change_password = false;

        let session_token = generate_token();
        user.session_token = Some(session_token.clone());

        self.db.users().update(&user).await?;

        let token = self.tokens.issue(&user, &session_token)?;

        info!(user_id = %user.id, "Password changed, sessions rotated");
        Ok((token, user))
    }

    /// Lifts an account lock via the token from the unlock email.
    pub async fn unlock_account(&self, unlock_token: &str) -> ApiResult<User> {
        let Some(mut user) = self.db.users().find_by_unlock_token(unlock_token).await? else {
            return Err(ApiError::not_found("Unlock token"));
        };

        user.failed_attempts = 0;
        user.locked_at = None;
        user.unlock_token = None;
        self.db.users().update(&user).await?;

        info!(user_id = %user.id, "Account unlocked");
        Ok(user)
    }

    // =========================================================================
    // Two-Factor Management
    // =========================================================================

    /// Enables TOTP 2FA: generates the shared secret and the backup code set.
    ///
    /// The plaintext backup codes are returned exactly once; only their
    /// hashes are stored.
    pub async fn setup_two_factor(&self, user_id: &str) -> ApiResult<TwoFactorSetup> {
        let mut user = self
            .db
            .users()
            .get_by_id(user_id)
            .await?
            .ok_or(ApiError::UserNotFound)?;

        if user.two_factor_enabled {
            return Err(ApiError::Conflict(
                "Two-factor authentication is already enabled".to_string(),
            ));
        }

        let secret = generate_base32_secret();
        let backup_codes = generate_backup_codes();
        let hashes = hash_backup_codes(&backup_codes)?;

        let totp = build_totp(&secret, &user.email)?;
        let provisioning_uri = totp.get_url();

        user.two_factor_enabled = true;
        user.two_factor_secret = Some(secret.clone());
        user.two_factor_backup_codes = Some(hashes);
        self.db.users().update(&user).await?;

        info!(user_id = %user.id, "Two-factor authentication enabled");
        Ok(TwoFactorSetup {
            secret,
            provisioning_uri,
            backup_codes,
        })
    }

    /// Disables 2FA entirely after a valid code. SMS verification goes with
    /// it: the SMS factor only exists on top of TOTP.
    pub async fn disable_two_factor(&self, user_id: &str, code: &str) -> ApiResult<()> {
        let mut user = self
            .db
            .users()
            .get_by_id(user_id)
            .await?
            .ok_or(ApiError::UserNotFound)?;

        if !self.verify_totp_or_backup(&mut user, code).await? {
            return Err(ApiError::InvalidVerificationCode);
        }

        user.two_factor_enabled = false;
        user.two_factor_secret = None;
        user.two_factor_backup_codes = None;
        user.sms_verification_enabled = false;
        self.db.users().update(&user).await?;

        info!(user_id = %user.id, "Two-factor authentication disabled");
        Ok(())
    }

    /// Replaces the backup code set after a valid code.
    pub async fn regenerate_backup_codes(
        &self,
        user_id: &str,
        code: &str,
    ) -> ApiResult<Vec<String>> {
        let mut user = self
            .db
            .users()
            .get_by_id(user_id)
            .await?
            .ok_or(ApiError::UserNotFound)?;

        if !self.verify_totp_or_backup(&mut user, code).await? {
            return Err(ApiError::InvalidVerificationCode);
        }

        let backup_codes = generate_backup_codes();
        user.two_factor_backup_codes = Some(hash_backup_codes(&backup_codes)?);
        self.db.users().update(&user).await?;

        Ok(backup_codes)
    }

    /// Adds the SMS factor. Requires TOTP to already be enabled and the
    /// phone number to be verified.
    pub async fn enable_sms_verification(&self, user_id: &str) -> ApiResult<()> {
        let mut user = self
            .db
            .users()
            .get_by_id(user_id)
            .await?
            .ok_or(ApiError::UserNotFound)?;

        if !user.two_factor_enabled {
            return Err(ApiError::Conflict(
                "Enable two-factor authentication first".to_string(),
            ));
        }
        if !user.phone_verified() {
            return Err(ApiError::Conflict(
                "Phone number must be verified first".to_string(),
            ));
        }

        user.sms_verification_enabled = true;
        self.db.users().update(&user).await?;
        Ok(())
    }

    /// Removes the SMS factor and clears any pending code.
    pub async fn disable_sms_verification(&self, user_id: &str) -> ApiResult<()> {
        let mut user = self
            .db
            .users()
            .get_by_id(user_id)
            .await?
            .ok_or(ApiError::UserNotFound)?;

        user.sms_verification_enabled = false;
        user.sms_verification_code = None;
        user.sms_code_expires_at = None;
        self.db.users().update(&user).await?;
        Ok(())
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Hash a password (or backup code) for storage.
pub fn hash_password(password: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(format!("Failed to hash password: {e}")))?;

    Ok(hash.to_string())
}

/// Verify a password (or backup code) against its stored hash.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Builds the TOTP instance for a user's stored Base32 secret.
///
/// SHA-1 / 6 digits / 30s period for authenticator-app compatibility;
/// skew 1 accepts one timestep (30s) of clock drift either way.
fn build_totp(base32_secret: &str, email: &str) -> ApiResult<TOTP> {
    let secret = Secret::Encoded(base32_secret.to_string())
        .to_bytes()
        .map_err(|e| ApiError::Internal(format!("Invalid TOTP secret: {e:?}")))?;

    TOTP::new(
        Algorithm::SHA1,
        6,
        1,
        30,
        secret,
        Some(TOTP_ISSUER.to_string()),
        email.to_string(),
    )
    .map_err(|e| ApiError::Internal(format!("Failed to build TOTP: {e}")))
}

/// Random URL-safe token for sessions and unlock links (256 bits).
fn generate_token() -> String {
    let mut buf = [0u8; 32];
    rand::rng().fill_bytes(&mut buf);
    BASE64URL_NOPAD.encode(&buf)
}

/// Random Base32 TOTP shared secret (160 bits, the RFC-recommended size).
fn generate_base32_secret() -> String {
    let mut buf = [0u8; 20];
    rand::rng().fill_bytes(&mut buf);
    BASE32_NOPAD.encode(&buf)
}

/// Ten single-use backup codes, 8 uppercase hex characters each.
fn generate_backup_codes() -> Vec<String> {
    let mut rng = rand::rng();
    (0..BACKUP_CODE_COUNT)
        .map(|_| {
            let mut buf = [0u8; 4];
            rng.fill_bytes(&mut buf);
            buf.iter().map(|b| format!("{b:02X}")).collect()
        })
        .collect()
}

/// Hashes a backup code set into its stored JSON form.
fn hash_backup_codes(codes: &[String]) -> ApiResult<String> {
    let hashes: Vec<String> = codes
        .iter()
        .map(|code| hash_password(code))
        .collect::<ApiResult<_>>()?;
    serde_json::to_string(&hashes)
        .map_err(|e| ApiError::Internal(format!("Failed to encode backup codes: {e}")))
}

/// Random 6-digit SMS verification code, zero-padded.
fn generate_sms_code() -> String {
    let n: u32 = rand::rng().random_range(0..1_000_000);
    format!("{n:06}")
}

// =============================================================================
// Unit Tests
// =============================================================================
