//! # hive-core: Pure Business Logic for Hive POS
//!
//! This crate is the **heart** of the Hive POS back office. It contains all
//! business logic as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Hive POS Back Office Architecture                   │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 SPA Front End (out of this repo)                │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ HTTP/JSON                              │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                   hive-backoffice handlers                      │   │
//! │  │     login, verify_two_factor, create_sale, complete_sale, ...  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ hive-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │  pricing  │  │ discount  │  │ validation│  │   │
//! │  │   │  Product  │  │  totals   │  │ selection │  │   rules   │  │   │
//! │  │   │   Sale    │  │  tiers    │  │  savings  │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    hive-db (Database Layer)                     │   │
//! │  │             SQLite queries, migrations, repositories            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (User, Product, Customer, Discount, Sale, SaleItem)
//! - [`money`] - Monetary rounding and reconciliation tolerance helpers
//! - [`pricing`] - Sale totals computation (subtotal, discount, tax, total)
//! - [`discount`] - Discount applicability and best-discount selection
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **No Clock**: "now" is always a parameter, never read inside this crate
//! 4. **Explicit Errors**: All errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod discount;
pub mod error;
pub mod money;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use hive_core::Sale` instead of
// `use hive_core::types::Sale`

pub use error::{CoreError, ValidationError};
pub use pricing::SaleTotals;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum consecutive failed logins before an account is locked.
pub const MAX_FAILED_ATTEMPTS: i64 = 5;

/// How long an account lock lasts before it expires on its own, in minutes.
pub const LOCKOUT_DURATION_MINUTES: i64 = 30;

/// Refund window: a completed sale can be refunded this many days after
/// it was created.
pub const REFUND_WINDOW_DAYS: i64 = 30;

/// Default low-stock threshold applied when a product doesn't set one.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 5;
