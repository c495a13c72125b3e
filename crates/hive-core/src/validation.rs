//! # Validation Module
//!
//! Input validation utilities for the Hive POS back office.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: SPA Front End                                                │
//! │  ├── Basic format checks (empty, length)                               │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Handler / Service (Rust)                                     │
//! │  ├── Type validation (deserialization)                                 │
//! │  └── THIS MODULE: Business rule validation                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints (price > 0, stock >= 0)              │
//! │  ├── UNIQUE constraints (sku, email)                                   │
//! │  └── Foreign key constraints                                           │
//! │                                                                         │
//! │  Defense in depth: multiple layers catch different errors              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Normalization
// =============================================================================

/// Normalizes a SKU the way it is stored: trimmed and uppercased.
pub fn normalize_sku(sku: &str) -> String {
    sku.trim().to_uppercase()
}

/// Normalizes an email the way it is stored: trimmed and lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Strips formatting characters from a phone number, keeping digits and `+`.
pub fn normalize_phone(phone: &str) -> String {
    phone.chars().filter(|c| c.is_ascii_digit() || *c == '+').collect()
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates a SKU (Stock Keeping Unit) after normalization.
///
/// ## Rules
/// - Must not be empty, at most 50 characters
/// - Uppercase letters and digits only
///
/// ## Example
/// ```rust
/// use hive_core::validation::validate_sku;
///
/// assert!(validate_sku("HONEY500").is_ok());
/// assert!(validate_sku("").is_err());
/// assert!(validate_sku("honey-500").is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    if sku.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }

    if sku.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 50,
        });
    }

    if !sku.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only uppercase letters and numbers".to_string(),
        });
    }

    Ok(())
}

/// Validates an email address.
///
/// Pragmatic shape check (local@domain.tld, no whitespace); uniqueness is
/// enforced by the database.
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(ValidationError::Required {
            field: "email".to_string(),
        });
    }

    let invalid = || ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: "must be a valid email address".to_string(),
    };

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err(invalid());
    }
    if email.chars().any(|c| c.is_whitespace()) {
        return Err(invalid());
    }

    Ok(())
}

/// Validates a product name (2..=100 characters).
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    validate_name_field("name", name, 2, 100)
}

/// Validates a person name field (2..=50 characters).
pub fn validate_person_name(field: &str, name: &str) -> ValidationResult<()> {
    validate_name_field(field, name, 2, 50)
}

fn validate_name_field(field: &str, value: &str, min: usize, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    if value.len() < min {
        return Err(ValidationError::TooShort {
            field: field.to_string(),
            min,
        });
    }
    if value.len() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates a phone number in E.164 shape: optional `+`, leading digit 1-9,
/// 2 to 15 digits total.
pub fn validate_phone_number(phone: &str) -> ValidationResult<()> {
    let digits = phone.strip_prefix('+').unwrap_or(phone);

    let ok = digits.len() >= 2
        && digits.len() <= 15
        && digits.chars().all(|c| c.is_ascii_digit())
        && !digits.starts_with('0');

    if ok {
        Ok(())
    } else {
        Err(ValidationError::InvalidFormat {
            field: "phone_number".to_string(),
            reason: "must be a valid phone number".to_string(),
        })
    }
}

/// Validates password complexity.
///
/// ## Rules
/// Minimum 8 characters with at least one lowercase letter, one uppercase
/// letter, one digit and one special character.
pub fn validate_password(password: &str) -> ValidationResult<()> {
    if password.len() < 8 {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min: 8,
        });
    }

    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password.chars().any(|c| "@$!%*?&#^()-_=+".contains(c));

    if has_lower && has_upper && has_digit && has_special {
        Ok(())
    } else {
        Err(ValidationError::InvalidFormat {
            field: "password".to_string(),
            reason: "must include a lowercase letter, an uppercase letter, a digit, and a special character"
                .to_string(),
        })
    }
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line item quantity (must be positive).
pub fn validate_quantity(quantity: i64) -> ValidationResult<()> {
    if quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    Ok(())
}

/// Validates a price or unit price (must be positive).
pub fn validate_price(field: &str, price: f64) -> ValidationResult<()> {
    if price <= 0.0 || !price.is_finite() {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a non-negative monetary amount (per-line discounts, minimums).
pub fn validate_non_negative(field: &str, amount: f64) -> ValidationResult<()> {
    if amount < 0.0 || !amount.is_finite() {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

/// Validates a discount definition's value against its type.
///
/// Percentage must be in (0, 100]; fixed amount must be positive.
pub fn validate_discount_value(
    discount_type: crate::types::DiscountType,
    value: f64,
) -> ValidationResult<()> {
    use crate::types::DiscountType;

    let ok = match discount_type {
        DiscountType::Percentage => value > 0.0 && value <= 100.0,
        DiscountType::FixedAmount => value > 0.0,
    };

    if ok {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            field: "discount_value".to_string(),
            min: 0,
            max: 100,
        })
    }
}

/// Validates a discount's date window: ends_at must be after starts_at when
/// both are present.
pub fn validate_discount_window(
    starts_at: Option<chrono::DateTime<chrono::Utc>>,
    ends_at: Option<chrono::DateTime<chrono::Utc>>,
) -> ValidationResult<()> {
    if let (Some(starts), Some(ends)) = (starts_at, ends_at) {
        if ends <= starts {
            return Err(ValidationError::InvalidFormat {
                field: "ends_at".to_string(),
                reason: "must be after start date".to_string(),
            });
        }
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DiscountType;
    use chrono::{Duration, Utc};

    #[test]
    fn test_normalize_sku() {
        assert_eq!(normalize_sku("  honey500 "), "HONEY500");
    }

    #[test]
    fn test_validate_sku() {
        assert!(validate_sku("HONEY500").is_ok());
        assert!(validate_sku("A1").is_ok());

        assert!(validate_sku("").is_err());
        assert!(validate_sku("honey500").is_err());
        assert!(validate_sku("HONEY-500").is_err());
        assert!(validate_sku(&"A".repeat(51)).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("clerk@example.com").is_ok());
        assert!(validate_email("a.b+c@sub.example.co").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("user@").is_err());
        assert!(validate_email("user@nodot").is_err());
        assert!(validate_email("user name@example.com").is_err());
    }

    #[test]
    fn test_validate_phone_number() {
        assert!(validate_phone_number("+15551234567").is_ok());
        assert!(validate_phone_number("447911123456").is_ok());

        assert!(validate_phone_number("+0123").is_err());
        assert!(validate_phone_number("call-me").is_err());
        assert!(validate_phone_number("1").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("Str0ng!pass").is_ok());

        assert!(validate_password("short1!").is_err());
        assert!(validate_password("alllowercase1!").is_err());
        assert!(validate_password("NoDigits!here").is_err());
        assert!(validate_password("NoSpecial1here").is_err());
    }

    #[test]
    fn test_validate_quantity_and_price() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-2).is_err());

        assert!(validate_price("price", 0.01).is_ok());
        assert!(validate_price("price", 0.0).is_err());
        assert!(validate_price("price", -1.0).is_err());
        assert!(validate_price("price", f64::NAN).is_err());
    }

    #[test]
    fn test_validate_discount_value() {
        assert!(validate_discount_value(DiscountType::Percentage, 10.0).is_ok());
        assert!(validate_discount_value(DiscountType::Percentage, 100.0).is_ok());
        assert!(validate_discount_value(DiscountType::Percentage, 0.0).is_err());
        assert!(validate_discount_value(DiscountType::Percentage, 101.0).is_err());

        assert!(validate_discount_value(DiscountType::FixedAmount, 5.0).is_ok());
        assert!(validate_discount_value(DiscountType::FixedAmount, 0.0).is_err());
    }

    #[test]
    fn test_validate_discount_window() {
        let now = Utc::now();
        assert!(validate_discount_window(None, None).is_ok());
        assert!(validate_discount_window(Some(now), None).is_ok());
        assert!(validate_discount_window(Some(now), Some(now + Duration::days(1))).is_ok());
        assert!(validate_discount_window(Some(now), Some(now)).is_err());
        assert!(validate_discount_window(Some(now), Some(now - Duration::days(1))).is_err());
    }
}
