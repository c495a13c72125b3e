//! # Pricing Engine
//!
//! Deterministic computation of subtotal, discount, tax and total for a sale.
//!
//! ## Pricing Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      compute_totals()                                   │
//! │                                                                         │
//! │  line items ──► subtotal = Σ (quantity × unit_price)                   │
//! │                      │                                                  │
//! │                      ▼                                                  │
//! │  discount = explicit override (> 0)  OR  legacy volume tier            │
//! │                      │                    <  $50 → 0%                  │
//! │                      │                    ≥  $50 → 5%                  │
//! │                      │                    ≥ $100 → 10%                 │
//! │                      ▼                                                  │
//! │  tax = explicit override (> 0)  OR  8% × (subtotal − discount)         │
//! │                      │                                                  │
//! │                      ▼                                                  │
//! │  total = subtotal + tax − discount                                     │
//! │                      │                                                  │
//! │                      ▼                                                  │
//! │  all four rounded to 2dp for storage                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The volume tier is a legacy default that applies only when no discount is
//! supplied explicitly; it is unrelated to the [`crate::types::Discount`]
//! entity and must keep producing the same numbers for historical sales.
//!
//! Per-line discounts are a separate axis: they reduce an individual line's
//! total (`quantity × unit_price − discount_amount`) and are supplied by the
//! caller; nothing here stacks or re-derives them.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::round_cents;
use crate::types::SaleItem;

// =============================================================================
// Constants
// =============================================================================

/// Default tax rate applied when no explicit tax override is supplied.
pub const DEFAULT_TAX_RATE: f64 = 0.08;

/// Subtotal at which the 5% volume tier starts.
pub const TIER_ONE_THRESHOLD: f64 = 50.0;

/// Subtotal at which the 10% volume tier starts.
pub const TIER_TWO_THRESHOLD: f64 = 100.0;

// =============================================================================
// Sale Totals
// =============================================================================

/// The four cached monetary fields of a sale, already rounded for storage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleTotals {
    pub subtotal: f64,
    pub discount_amount: f64,
    pub tax_amount: f64,
    pub total_amount: f64,
}

// =============================================================================
// Computation
// =============================================================================

/// Computes sale totals from the current line items.
///
/// `explicit_discount` / `explicit_tax` are honored only when present and
/// positive; zero or absent falls back to the defaults. Callers pass a sale's
/// stored values here on repricing, which is what makes an explicitly set
/// discount sticky across later mutations.
///
/// ## Example
/// ```rust
/// use hive_core::pricing::compute_totals_from_lines;
///
/// // qty 3 @ $10 + qty 1 @ $20 = $50 subtotal
/// // tier: 5% of 50 = $2.50; tax: 8% of 47.50 = $3.80; total $51.30
/// let totals = compute_totals_from_lines(&[(3, 10.0), (1, 20.0)], None, None);
/// assert_eq!(totals.total_amount, 51.30);
/// ```
pub fn compute_totals(
    items: &[SaleItem],
    explicit_discount: Option<f64>,
    explicit_tax: Option<f64>,
) -> SaleTotals {
    let lines: Vec<(i64, f64)> = items.iter().map(|i| (i.quantity, i.unit_price)).collect();
    compute_totals_from_lines(&lines, explicit_discount, explicit_tax)
}

/// Same as [`compute_totals`], from raw `(quantity, unit_price)` pairs.
///
/// Used when pricing items that are not yet full [`SaleItem`]s (e.g. while
/// validating an inbound create request).
pub fn compute_totals_from_lines(
    lines: &[(i64, f64)],
    explicit_discount: Option<f64>,
    explicit_tax: Option<f64>,
) -> SaleTotals {
    let subtotal: f64 = lines.iter().map(|(qty, price)| *qty as f64 * price).sum();

    let discount = match explicit_discount {
        Some(d) if d > 0.0 => d,
        _ => tiered_discount(subtotal),
    };

    let tax = match explicit_tax {
        Some(t) if t > 0.0 => t,
        _ => (subtotal - discount) * DEFAULT_TAX_RATE,
    };

    let total = subtotal + tax - discount;

    SaleTotals {
        subtotal: round_cents(subtotal),
        discount_amount: round_cents(discount),
        tax_amount: round_cents(tax),
        total_amount: round_cents(total),
    }
}

/// Legacy volume-tier discount on the subtotal.
///
/// 0 below $50, 5% in [$50, $100), 10% at $100 and above.
pub fn tiered_discount(subtotal: f64) -> f64 {
    if subtotal < TIER_ONE_THRESHOLD {
        0.0
    } else if subtotal >= TIER_TWO_THRESHOLD {
        subtotal * 0.10
    } else {
        subtotal * 0.05
    }
}

/// A line item's stored total: `quantity × unit_price − discount`, rounded.
pub fn line_total(quantity: i64, unit_price: f64, discount_amount: f64) -> f64 {
    round_cents(quantity as f64 * unit_price - discount_amount)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::approx_eq;

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(tiered_discount(0.0), 0.0);
        assert_eq!(tiered_discount(49.99), 0.0);
        assert!(approx_eq(tiered_discount(50.0), 2.5));
        assert!(approx_eq(tiered_discount(99.99), 4.9995));
        assert!(approx_eq(tiered_discount(100.0), 10.0));
        assert!(approx_eq(tiered_discount(150.0), 15.0));
    }

    #[test]
    fn test_fifty_dollar_sale_scenario() {
        // qty 3 @ $10 and qty 1 @ $20: subtotal $50, tier 5% = $2.50,
        // tax 8% of $47.50 = $3.80, total $51.30.
        let totals = compute_totals_from_lines(&[(3, 10.0), (1, 20.0)], None, None);

        assert_eq!(totals.subtotal, 50.0);
        assert_eq!(totals.discount_amount, 2.5);
        assert_eq!(totals.tax_amount, 3.8);
        assert_eq!(totals.total_amount, 51.3);
    }

    #[test]
    fn test_totals_identity_holds_after_rounding() {
        let totals = compute_totals_from_lines(&[(7, 13.37), (2, 0.99)], None, None);
        assert!(approx_eq(
            totals.total_amount,
            totals.subtotal - totals.discount_amount + totals.tax_amount
        ));
    }

    #[test]
    fn test_explicit_discount_overrides_tier() {
        let totals = compute_totals_from_lines(&[(1, 100.0)], Some(25.0), None);
        assert_eq!(totals.discount_amount, 25.0);
        // tax on (100 - 25) at 8%
        assert_eq!(totals.tax_amount, 6.0);
        assert_eq!(totals.total_amount, 81.0);
    }

    #[test]
    fn test_zero_explicit_discount_falls_back_to_tier() {
        let totals = compute_totals_from_lines(&[(1, 100.0)], Some(0.0), None);
        assert_eq!(totals.discount_amount, 10.0);
    }

    #[test]
    fn test_explicit_tax_override() {
        let totals = compute_totals_from_lines(&[(1, 40.0)], None, Some(2.0));
        assert_eq!(totals.discount_amount, 0.0);
        assert_eq!(totals.tax_amount, 2.0);
        assert_eq!(totals.total_amount, 42.0);
    }

    #[test]
    fn test_empty_sale_prices_to_zero() {
        let totals = compute_totals_from_lines(&[], None, None);
        assert_eq!(totals.subtotal, 0.0);
        assert_eq!(totals.total_amount, 0.0);
    }

    #[test]
    fn test_line_total_with_discount() {
        assert_eq!(line_total(3, 10.0, 1.5), 28.5);
        assert_eq!(line_total(1, 19.99, 0.0), 19.99);
    }
}
