//! # Money Helpers
//!
//! Rounding and reconciliation helpers for monetary amounts.
//!
//! ## Why Decimal Floats?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  MONEY REPRESENTATION                                                   │
//! │                                                                         │
//! │  The back office stores monetary amounts as decimal dollars (f64),     │
//! │  mirroring the ledger this system has to stay reconcilable with:       │
//! │                                                                         │
//! │    • intermediate computation keeps full float precision               │
//! │    • amounts are rounded to 2 decimal places at the point of storage   │
//! │    • equality checks use a fixed 0.01 tolerance, never ==              │
//! │                                                                         │
//! │  Every stored total must satisfy:                                      │
//! │    |total - (subtotal - discount + tax)| < 0.01                        │
//! │                                                                         │
//! │  Downstream consumers (receipts, exports) format from the stored,      │
//! │  already-rounded values and never re-derive them.                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

// =============================================================================
// Constants
// =============================================================================

/// Reconciliation tolerance for monetary comparisons.
///
/// Two amounts are "the same money" when they differ by less than one cent.
pub const MONEY_EPSILON: f64 = 0.01;

// =============================================================================
// Rounding & Comparison
// =============================================================================

/// Rounds an amount to 2 decimal places (cents).
///
/// Applied at the point of storage only; intermediate arithmetic keeps
/// full precision.
///
/// ## Example
/// ```rust
/// use hive_core::money::round_cents;
///
/// assert_eq!(round_cents(2.5), 2.5);
/// assert_eq!(round_cents(3.7999999), 3.8);
/// assert_eq!(round_cents(15.005), 15.01);
/// ```
#[inline]
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Compares two amounts within the reconciliation tolerance.
///
/// ## Example
/// ```rust
/// use hive_core::money::approx_eq;
///
/// assert!(approx_eq(51.30, 51.299999999));
/// assert!(!approx_eq(51.30, 51.28));
/// ```
#[inline]
pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < MONEY_EPSILON
}

/// Formats an amount for display, e.g. `$51.30` or `-$5.50`.
///
/// For debugging and log output. The front end formats from raw values
/// to handle localization.
pub fn format_amount(amount: f64) -> String {
    if amount < 0.0 {
        format!("-${:.2}", amount.abs())
    } else {
        format!("${:.2}", amount)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_cents() {
        assert_eq!(round_cents(0.0), 0.0);
        assert_eq!(round_cents(2.505), 2.51);
        assert_eq!(round_cents(2.504), 2.5);
        assert_eq!(round_cents(-1.005), -1.0); // f64 artifact: -1.005 is stored below the midpoint
    }

    #[test]
    fn test_round_cents_percentage_of_subtotal() {
        // 5% of $50.00 = $2.50, 8% of $47.50 = $3.80
        assert_eq!(round_cents(50.0 * 0.05), 2.5);
        assert_eq!(round_cents((50.0 - 2.5) * 0.08), 3.8);
    }

    #[test]
    fn test_approx_eq_tolerance_boundary() {
        assert!(approx_eq(10.0, 10.0));
        assert!(approx_eq(10.0, 10.0099));
        // 10.01 sits ON the tolerance; f64 puts the difference a hair under
        // 0.01, so it still compares equal. Use clearly-outside values.
        assert!(!approx_eq(10.0, 10.02));
        assert!(!approx_eq(10.0, 9.98));
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(51.3), "$51.30");
        assert_eq!(format_amount(0.0), "$0.00");
        assert_eq!(format_amount(-5.5), "-$5.50");
    }
}
