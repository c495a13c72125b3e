//! Authentication handlers.
//!
//! Login, two-factor verification, SMS codes, password and token management.
//! Status codes: 401 invalid credentials/code, 423 locked, 403 inactive,
//! 429 rate limited.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::context::AuthContext;
use crate::error::ApiResult;
use crate::handlers::MessageResponse;
use crate::services::auth_service::LoginOutcome;
use crate::AppState;
use hive_core::{User, UserRole};

// =============================================================================
// DTOs
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyTwoFactorRequest {
    pub user_id: String,
    pub code: String,
    pub method: String,
}

#[derive(Debug, Deserialize)]
pub struct RequestSmsCodeRequest {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct UnlockAccountRequest {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct TwoFactorCodeRequest {
    pub code: String,
}

/// Role-derived capabilities, precomputed for the front end.
#[derive(Debug, Serialize)]
pub struct Permissions {
    pub can_manage_users: bool,
    pub can_access_reports: bool,
}

/// The user payload returned by auth endpoints. Never includes secrets.
#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub role: UserRole,
    pub two_factor_enabled: bool,
    pub last_sign_in_at: Option<DateTime<Utc>>,
    pub permissions: Permissions,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        UserInfo {
            id: user.id.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            full_name: user.full_name(),
            role: user.role,
            two_factor_enabled: user.two_factor_enabled,
            last_sign_in_at: user.last_sign_in_at,
            permissions: Permissions {
                can_manage_users: user.role.can_manage_users(),
                can_access_reports: user.role.can_access_reports(),
            },
        }
    }
}

/// Login response. Exactly one of the three shapes is populated:
/// direct success (token + user), a two-factor challenge, or a forced
/// password change.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires_two_factor: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires_password_change: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_methods: Option<Vec<String>>,
}

impl LoginResponse {
    fn success(state: &AppState, token: String, user: &User) -> Self {
        let expires_at = Utc::now() + Duration::seconds(state.auth.tokens().lifetime_secs());
        LoginResponse {
            success: true,
            token: Some(token),
            user: Some(UserInfo::from(user)),
            expires_at: Some(expires_at),
            requires_two_factor: None,
            requires_password_change: None,
            user_id: None,
            verification_methods: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SmsCodeResponse {
    pub success: bool,
    pub message: String,
    pub expires_in_minutes: u32,
}

#[derive(Debug, Serialize)]
pub struct TwoFactorSetupResponse {
    pub success: bool,
    pub qr_code_uri: String,
    pub backup_codes: Vec<String>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct BackupCodesResponse {
    pub success: bool,
    pub backup_codes: Vec<String>,
    pub message: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /auth/login
///
/// `client_key` is the caller identity the edge resolved (client address),
/// used for rate limiting.
pub async fn login(
    state: &AppState,
    client_key: &str,
    req: LoginRequest,
) -> ApiResult<LoginResponse> {
    match state.auth.login(&req.email, &req.password, client_key).await? {
        LoginOutcome::Success { token, user } => Ok(LoginResponse::success(state, token, &user)),
        LoginOutcome::RequiresTwoFactor {
            user_id,
            verification_methods,
        } => Ok(LoginResponse {
            success: true,
            token: None,
            user: None,
            expires_at: None,
            requires_two_factor: Some(true),
            requires_password_change: None,
            user_id: Some(user_id),
            verification_methods: Some(verification_methods),
        }),
        LoginOutcome::RequiresPasswordChange { user_id } => Ok(LoginResponse {
            success: true,
            token: None,
            user: None,
            expires_at: None,
            requires_two_factor: None,
            requires_password_change: Some(true),
            user_id: Some(user_id),
            verification_methods: None,
        }),
    }
}

/// POST /auth/verify_two_factor
pub async fn verify_two_factor(
    state: &AppState,
    req: VerifyTwoFactorRequest,
) -> ApiResult<LoginResponse> {
    let (token, user) = state
        .auth
        .verify_two_factor(&req.user_id, &req.code, &req.method)
        .await?;
    Ok(LoginResponse::success(state, token, &user))
}

/// POST /auth/request_sms_code
pub async fn request_sms_code(
    state: &AppState,
    req: RequestSmsCodeRequest,
) -> ApiResult<SmsCodeResponse> {
    state.auth.request_sms_code(&req.user_id).await?;
    Ok(SmsCodeResponse {
        success: true,
        message: "Verification code sent".to_string(),
        expires_in_minutes: 10,
    })
}

/// POST /auth/change_password
///
/// Returns a fresh token: the session rotation revoked every other one.
pub async fn change_password(
    state: &AppState,
    ctx: &AuthContext,
    req: ChangePasswordRequest,
) -> ApiResult<LoginResponse> {
    let user = ctx.require()?;
    let (token, user) = state
        .auth
        .change_password(&user.id, &req.current_password, &req.new_password)
        .await?;
    Ok(LoginResponse::success(state, token, &user))
}

/// POST /auth/refresh_token
pub async fn refresh_token(state: &AppState, bearer_token: &str) -> ApiResult<LoginResponse> {
    let (token, user) = state.auth.refresh_token(bearer_token).await?;
    Ok(LoginResponse::success(state, token, &user))
}

/// GET /auth/me
pub async fn me(ctx: &AuthContext) -> ApiResult<UserInfo> {
    Ok(UserInfo::from(ctx.require()?))
}

/// POST /auth/unlock
pub async fn unlock_account(
    state: &AppState,
    req: UnlockAccountRequest,
) -> ApiResult<MessageResponse> {
    state.auth.unlock_account(&req.token).await?;
    Ok(MessageResponse::ok("Account unlocked"))
}

/// POST /auth/two_factor/setup
pub async fn setup_two_factor(
    state: &AppState,
    ctx: &AuthContext,
) -> ApiResult<TwoFactorSetupResponse> {
    let user = ctx.require()?;
    let setup = state.auth.setup_two_factor(&user.id).await?;
    Ok(TwoFactorSetupResponse {
        success: true,
        qr_code_uri: setup.provisioning_uri,
        backup_codes: setup.backup_codes,
        message: "Two-factor authentication has been set up. Save your backup codes in a secure location".to_string(),
    })
}

/// POST /auth/two_factor/disable
pub async fn disable_two_factor(
    state: &AppState,
    ctx: &AuthContext,
    req: TwoFactorCodeRequest,
) -> ApiResult<MessageResponse> {
    let user = ctx.require()?;
    state.auth.disable_two_factor(&user.id, &req.code).await?;
    Ok(MessageResponse::ok("Two-factor authentication disabled"))
}

/// POST /auth/two_factor/backup_codes
pub async fn regenerate_backup_codes(
    state: &AppState,
    ctx: &AuthContext,
    req: TwoFactorCodeRequest,
) -> ApiResult<BackupCodesResponse> {
    let user = ctx.require()?;
    let backup_codes = state
        .auth
        .regenerate_backup_codes(&user.id, &req.code)
        .await?;
    Ok(BackupCodesResponse {
        success: true,
        backup_codes,
        message: "New backup codes generated. Save them in a secure location".to_string(),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
