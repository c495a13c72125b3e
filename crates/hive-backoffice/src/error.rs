//! Error types for the back-office service layer.
//!
//! `ApiError` is what the HTTP edge sees: every variant carries a stable
//! HTTP status code and a message safe to show a client. Internal detail is
//! logged at the conversion site, never returned.

use thiserror::Error;
use tracing::error;

use hive_core::CoreError;
use hive_db::DbError;

/// Service-layer errors, mapped 1:1 onto HTTP status codes.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Field-level validation failure (422).
    #[error("{0}")]
    Validation(String),

    /// Wrong email/password or bad second-factor code (401).
    ///
    /// Deliberately does not say which part was wrong.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Second-factor code did not verify (401).
    #[error("Invalid or expired verification code")]
    InvalidVerificationCode,

    /// Endpoint requires an authenticated caller (401).
    #[error("Authentication required")]
    AuthenticationRequired,

    /// Bearer token has expired (401).
    #[error("Token has expired")]
    TokenExpired,

    /// Bearer token failed to decode, or its session was revoked (401).
    #[error("Invalid token")]
    TokenInvalid,

    /// Token was valid but the user no longer exists (401).
    #[error("User not found")]
    UserNotFound,

    /// Account is locked out after repeated failures (423).
    #[error("Account is locked. Try again later or use your unlock link")]
    AccountLocked,

    /// Account is deactivated or unconfirmed (403).
    #[error("Account is not active")]
    AccountInactive,

    /// Caller lacks the role for this operation (403).
    #[error("{0}")]
    Forbidden(String),

    /// Entity not found (404).
    #[error("{entity} not found")]
    NotFound { entity: String },

    /// Domain-rule conflict: stock shortfall or state-transition guard (422).
    #[error("{0}")]
    Conflict(String),

    /// Too many attempts in the window (429).
    #[error("{0}")]
    RateLimited(String),

    /// Unexpected failure; detail is logged, not returned (500).
    #[error("Something went wrong")]
    Internal(String),
}

impl ApiError {
    /// The HTTP status code the edge should respond with.
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::Validation(_) => 422,
            ApiError::InvalidCredentials => 401,
            ApiError::InvalidVerificationCode => 401,
            ApiError::AuthenticationRequired => 401,
            ApiError::TokenExpired => 401,
            ApiError::TokenInvalid => 401,
            ApiError::UserNotFound => 401,
            ApiError::AccountLocked => 423,
            ApiError::AccountInactive => 403,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound { .. } => 404,
            ApiError::Conflict(_) => 422,
            ApiError::RateLimited(_) => 429,
            ApiError::Internal(_) => 500,
        }
    }

    /// The message safe to put in a response body.
    ///
    /// For `Internal` this is a generic line; the wrapped detail only goes
    /// to the logs.
    pub fn client_message(&self) -> String {
        self.to_string()
    }

    pub fn not_found(entity: impl Into<String>) -> Self {
        ApiError::NotFound {
            entity: entity.into(),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, .. } => ApiError::NotFound { entity },
            DbError::UniqueViolation { field, .. } => {
                ApiError::Validation(format!("{field} is already taken"))
            }
            DbError::InsufficientStock { product_id, requested } => ApiError::Conflict(format!(
                "Insufficient stock for product {product_id}: requested {requested}"
            )),
            DbError::ForeignKeyViolation { message } => {
                ApiError::Validation(format!("Invalid reference: {message}"))
            }
            other => {
                error!(error = %other, "Database error");
                ApiError::Internal(other.to_string())
            }
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ProductNotFound(_) => ApiError::not_found("Product"),
            CoreError::SaleNotFound(_) => ApiError::not_found("Sale"),
            CoreError::InsufficientStock { .. } => ApiError::Conflict(err.to_string()),
            CoreError::InvalidSaleStatus { .. }
            | CoreError::RefundWindowExpired { .. }
            | CoreError::EmptySale(_) => ApiError::Conflict(err.to_string()),
            CoreError::Validation(v) => ApiError::Validation(v.to_string()),
        }
    }
}

impl From<hive_core::ValidationError> for ApiError {
    fn from(err: hive_core::ValidationError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

/// Result type for service and handler operations.
pub type ApiResult<T> = Result<T, ApiError>;

// =============================================================================
// Unit Tests
// =============================================================================
