//! # Domain Types
//!
//! Core domain types used throughout the Hive POS back office.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      User       │   │     Product     │   │      Sale       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  email (unique) │   │  sku (business) │   │  status         │       │
//! │  │  role           │   │  stock_quantity │   │  total_amount   │       │
//! │  │  2FA state      │   │  price          │   │  sale items     │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Discount     │   │   SaleStatus    │   │ PaymentMethod   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  type + value   │   │  Pending        │   │  Cash           │       │
//! │  │  date window    │   │  Completed      │   │  CreditCard     │       │
//! │  │  minimum_amount │   │  Cancelled      │   │  DebitCard      │       │
//! │  └─────────────────┘   │  Refunded       │   │  DigitalWallet  │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID where one exists: (sku, email, receipt number)

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{LOCKOUT_DURATION_MINUTES, REFUND_WINDOW_DAYS};

// =============================================================================
// User Role
// =============================================================================

/// Access role of a back-office user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Manager,
    Employee,
}

impl UserRole {
    /// Admins and managers can manage other user accounts.
    pub fn can_manage_users(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Manager)
    }

    /// Admins and managers can access revenue reports.
    pub fn can_access_reports(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Manager)
    }
}

impl Default for UserRole {
    fn default() -> Self {
        UserRole::Employee
    }
}

// =============================================================================
// User
// =============================================================================

/// A back-office user account.
///
/// Carries the full authentication security state: lockout counters, session
/// token, and two-factor configuration. Exactly one of {no 2FA, TOTP, TOTP+SMS}
/// holds: `sms_verification_enabled` implies `two_factor_enabled`.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    /// Unique, case-insensitive, stored lowercase.
    pub email: String,
    /// Argon2 password hash. Never serialized to API responses.
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub active: bool,
    /// Set once the account's email has been confirmed.
    pub confirmed_at: Option<DateTime<Utc>>,

    // Lockout state
    pub failed_attempts: i64,
    pub locked_at: Option<DateTime<Utc>>,
    pub unlock_token: Option<String>,

    // Two-factor authentication
    pub two_factor_enabled: bool,
    /// Base32-encoded TOTP shared secret.
    pub two_factor_secret: Option<String>,
    /// JSON array of argon2 hashes of single-use backup codes.
    pub two_factor_backup_codes: Option<String>,

    // SMS second factor
    pub sms_verification_enabled: bool,
    /// E.164, unique when present.
    pub phone_number: Option<String>,
    pub phone_verified_at: Option<DateTime<Utc>>,
    pub sms_verification_code: Option<String>,
    pub sms_code_expires_at: Option<DateTime<Utc>>,

    // Session management
    /// Rotated on login and password change; bearer tokens embed the value
    /// current at issuance.
    pub session_token: Option<String>,
    pub password_changed_at: Option<DateTime<Utc>>,
    pub must_change_password: bool,

    // Sign-in tracking
    pub sign_in_count: i64,
    pub current_sign_in_at: Option<DateTime<Utc>>,
    pub last_sign_in_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn confirmed(&self) -> bool {
        self.confirmed_at.is_some()
    }

    /// Whether the account is currently locked out.
    ///
    /// A lock expires on its own once the lockout window has elapsed.
    pub fn access_locked(&self, now: DateTime<Utc>) -> bool {
        match self.locked_at {
            Some(locked_at) => now - locked_at < Duration::minutes(LOCKOUT_DURATION_MINUTES),
            None => false,
        }
    }

    /// Whether the account may authenticate at all (active, confirmed, unlocked).
    pub fn active_for_authentication(&self, now: DateTime<Utc>) -> bool {
        self.active && self.confirmed() && !self.access_locked(now)
    }

    pub fn phone_verified(&self) -> bool {
        self.phone_verified_at.is_some()
    }

    /// Whether the stored SMS verification code is still usable.
    pub fn sms_code_current(&self, now: DateTime<Utc>) -> bool {
        match (&self.sms_verification_code, self.sms_code_expires_at) {
            (Some(_), Some(expires_at)) => expires_at > now,
            _ => false,
        }
    }

    /// Second-factor methods this account can be challenged with.
    pub fn verification_methods(&self) -> Vec<&'static str> {
        let mut methods = Vec::new();
        if self.two_factor_enabled {
            methods.push("totp");
            if self.sms_verification_enabled {
                methods.push("sms");
            }
        }
        methods
    }
}

// =============================================================================
// Stock Status
// =============================================================================

/// Derived classification of a product's inventory level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    InStock,
    LowStock,
    OutOfStock,
}

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Stock Keeping Unit - business identifier.
    /// Unique case-insensitively, normalized to uppercase A-Z0-9.
    pub sku: String,

    /// Display name shown in the catalog and on receipts.
    pub name: String,

    pub description: Option<String>,

    pub category: String,

    /// Unit price in decimal dollars (always > 0).
    pub price: f64,

    /// Current stock level. Never negative.
    pub stock_quantity: i64,

    /// At or below this level (but above zero) the product counts as low stock.
    pub low_stock_threshold: i64,

    /// Whether product is active (soft delete).
    pub active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn in_stock(&self) -> bool {
        self.stock_quantity > 0
    }

    pub fn out_of_stock(&self) -> bool {
        self.stock_quantity == 0
    }

    pub fn low_stock(&self) -> bool {
        self.stock_quantity > 0 && self.stock_quantity <= self.low_stock_threshold
    }

    /// Derived stock classification.
    pub fn stock_status(&self) -> StockStatus {
        if self.out_of_stock() {
            StockStatus::OutOfStock
        } else if self.low_stock() {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        }
    }

    /// Checks if the requested quantity can be sold right now.
    ///
    /// Inactive products can never be sold; active products only up to the
    /// current stock level. The database enforces the same rule again with an
    /// atomic conditional update at completion time.
    pub fn can_sell(&self, quantity: i64) -> bool {
        self.active && self.stock_quantity >= quantity
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A customer record. Sales may reference one; walk-in sales have none.
///
/// At least one of email/phone must be present (validated at the edge).
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Loyalty tier derived from a customer's completed-sale aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CustomerTier {
    Regular,
    Frequent,
    Vip,
}

impl CustomerTier {
    /// Classifies a customer from total completed spend and order count.
    ///
    /// VIP at $1000 spend or 20 orders; Frequent at 5 orders.
    pub fn classify(total_spend: f64, order_count: i64) -> Self {
        if total_spend >= 1000.0 || order_count >= 20 {
            CustomerTier::Vip
        } else if order_count >= 5 {
            CustomerTier::Frequent
        } else {
            CustomerTier::Regular
        }
    }
}

// =============================================================================
// Discount
// =============================================================================

/// How a discount's value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    /// `value` is a percentage of the amount, in (0, 100].
    Percentage,
    /// `value` is a flat dollar amount (> 0), capped at the amount itself.
    FixedAmount,
}

/// A named discount rule with an optional validity window.
///
/// Applicability and savings math live in [`crate::discount`].
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Discount {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub value: f64,
    /// Sales below this amount are not eligible.
    pub minimum_amount: f64,
    pub active: bool,
    /// Open bounds are unbounded: no starts_at means "already started",
    /// no ends_at means "never expires". ends_at > starts_at when both set.
    #[ts(as = "Option<String>")]
    pub starts_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub ends_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Sale Status
// =============================================================================

/// The status of a sale transaction.
///
/// ## State Machine
/// ```text
/// pending ──► completed ──► refunded (terminal)
///    │
///    └──────► cancelled (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum SaleStatus {
    /// Sale is open; items may still change.
    Pending,
    /// Sale has been paid; stock was decremented.
    Completed,
    /// Sale was abandoned before completion. No stock movement.
    Cancelled,
    /// Completed sale was reversed; stock was restored.
    Refunded,
}

impl Default for SaleStatus {
    fn default() -> Self {
        SaleStatus::Pending
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    CreditCard,
    DebitCard,
    DigitalWallet,
}

// =============================================================================
// Sale
// =============================================================================

/// A sale transaction.
///
/// The four monetary fields are computed and cached on every mutation;
/// client-supplied discount/tax are honored only as explicit overrides.
/// Invariant: |total_amount - (subtotal - discount_amount + tax_amount)| < 0.01.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Sale {
    pub id: String,
    /// Cashier/owner. Required.
    pub user_id: String,
    /// Optional; None is a walk-in sale.
    pub customer_id: Option<String>,
    pub status: SaleStatus,
    pub payment_method: PaymentMethod,
    pub subtotal: f64,
    pub discount_amount: f64,
    pub tax_amount: f64,
    pub total_amount: f64,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    pub fn pending(&self) -> bool {
        self.status == SaleStatus::Pending
    }

    pub fn completed(&self) -> bool {
        self.status == SaleStatus::Completed
    }

    /// Only pending sales can be cancelled.
    pub fn can_be_cancelled(&self) -> bool {
        self.pending()
    }

    /// Only pending sales with at least one line item can be completed.
    pub fn can_be_completed(&self, item_count: usize) -> bool {
        self.pending() && item_count > 0
    }

    /// Only completed sales within the refund window can be refunded.
    pub fn can_be_refunded(&self, now: DateTime<Utc>) -> bool {
        self.completed() && now - self.created_at < Duration::days(REFUND_WINDOW_DAYS)
    }

    /// Derived receipt number: `HV` + sale date + a short id fragment.
    ///
    /// ## Example
    /// `HV20260807-9F2C41AB`
    pub fn receipt_number(&self) -> String {
        let id_part: String = self
            .id
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .take(8)
            .collect::<String>()
            .to_uppercase();
        format!("HV{}-{}", self.created_at.format("%Y%m%d"), id_part)
    }

    /// Checks the cached totals against the pricing identity.
    pub fn totals_reconcile(&self) -> bool {
        crate::money::approx_eq(
            self.total_amount,
            self.subtotal - self.discount_amount + self.tax_amount,
        )
    }
}

// =============================================================================
// Sale Item
// =============================================================================

/// One named offer recorded against a line item, for audit display only.
///
/// The effective per-line discount is the single `discount_amount` on the
/// item; offers are not stacked or re-derived from this list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AppliedOffer {
    pub id: String,
    pub name: String,
    pub amount: f64,
}

/// A line item in a sale.
///
/// `unit_price` is a snapshot taken when the item is added; later product
/// price changes do not affect recorded sales.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    /// Quantity sold. Always > 0.
    pub quantity: i64,
    /// Unit price at time of sale (frozen). Always > 0.
    pub unit_price: f64,
    /// Per-line discount, independent of the sale-level discount.
    pub discount_amount: f64,
    /// Line total = quantity × unit_price − discount_amount.
    pub line_total: f64,
    /// Ordered offer records, opaque audit metadata.
    pub applied_offers: Vec<AppliedOffer>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl SaleItem {
    /// The line's value before its per-line discount.
    pub fn original_total(&self) -> f64 {
        self.quantity as f64 * self.unit_price
    }

    pub fn discount_applied(&self) -> bool {
        self.discount_amount > 0.0
    }

    /// Checks the stored line_total against quantity, price and discount.
    pub fn line_total_reconciles(&self) -> bool {
        crate::money::approx_eq(self.line_total, self.original_total() - self.discount_amount)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
