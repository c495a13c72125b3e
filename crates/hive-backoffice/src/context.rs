//! Authentication context.
//!
//! The caller's identity is resolved once at the edge of a request and
//! passed explicitly into handlers as an [`AuthContext`], instead of being
//! read from ambient state. Handlers that allow unauthenticated reads take
//! the context as-is; mutating handlers call [`AuthContext::require`].

use crate::error::ApiError;
use hive_core::{User, UserRole};

/// The resolved identity of an inbound request.
#[derive(Debug, Clone)]
pub enum AuthContext {
    /// No (valid) bearer token was presented.
    Anonymous,
    /// A bearer token resolved to this user.
    Authenticated(User),
}

impl AuthContext {
    /// The authenticated user, if any.
    pub fn user(&self) -> Option<&User> {
        match self {
            AuthContext::Anonymous => None,
            AuthContext::Authenticated(user) => Some(user),
        }
    }

    /// The authenticated user, or a 401 error.
    pub fn require(&self) -> Result<&User, ApiError> {
        self.user().ok_or(ApiError::AuthenticationRequired)
    }

    /// The authenticated user if they hold an admin or manager role,
    /// or a 401/403 error.
    pub fn require_manager(&self) -> Result<&User, ApiError> {
        let user = self.require()?;
        if user.role.can_manage_users() {
            Ok(user)
        } else {
            Err(ApiError::Forbidden(
                "Manager or Admin access required".to_string(),
            ))
        }
    }

    /// The authenticated user if they hold the admin role.
    pub fn require_admin(&self) -> Result<&User, ApiError> {
        let user = self.require()?;
        if user.role == UserRole::Admin {
            Ok(user)
        } else {
            Err(ApiError::Forbidden("Admin access required".to_string()))
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user_with_role(role: UserRole) -> User {
        let now = Utc::now();
        User {
            id: "u1".to_string(),
            email: "clerk@example.com".to_string(),
            password_hash: "unused".to_string(),
            first_name: "Avery".to_string(),
            last_name: "Quinn".to_string(),
            role,
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
            session_token: None,
            password_changed_at: None,
            must_change_password: false,
            sign_in_count: 0,
            current_sign_in_at: None,
            last_sign_in_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_anonymous_is_refused() {
        let ctx = AuthContext::Anonymous;
        assert!(ctx.user().is_none());
        assert!(matches!(
            ctx.require(),
            Err(ApiError::AuthenticationRequired)
        ));
    }

    #[test]
    fn test_role_gates() {
        let employee = AuthContext::Authenticated(user_with_role(UserRole::Employee));
        assert!(employee.require().is_ok());
        assert!(matches!(
            employee.require_manager(),
            Err(ApiError::Forbidden(_))
        ));

        let manager = AuthContext::Authenticated(user_with_role(UserRole::Manager));
        assert!(manager.require_manager().is_ok());
        assert!(matches!(
            manager.require_admin(),
            Err(ApiError::Forbidden(_))
        ));

        let admin = AuthContext::Authenticated(user_with_role(UserRole::Admin));
        assert!(admin.require_admin().is_ok());
    }
}
