//! # Discount Selection
//!
//! Applicability rules and best-discount selection for [`Discount`] rows.
//!
//! A discount applies to an amount when it is active, its date window covers
//! "now", and the amount meets its minimum. Savings are computed per type:
//!
//! - `percentage`: `amount × value / 100`, rounded to 2dp
//! - `fixed_amount`: `min(value, amount)` (a discount never exceeds the sale)
//!
//! [`best_discount`] picks the candidate with strictly greatest savings; when
//! two candidates tie, the first one found wins (iteration order). That
//! tie-break is deliberately left as-is rather than invented here.

use chrono::{DateTime, Utc};

use crate::money::round_cents;
use crate::types::{Discount, DiscountType};

impl Discount {
    /// Whether "now" falls inside the validity window.
    ///
    /// Open bounds are unbounded: a missing starts_at means already started,
    /// a missing ends_at means never expires.
    pub fn is_current(&self, now: DateTime<Utc>) -> bool {
        if let Some(starts_at) = self.starts_at {
            if starts_at > now {
                return false;
            }
        }
        if let Some(ends_at) = self.ends_at {
            if ends_at < now {
                return false;
            }
        }
        true
    }

    /// Whether this discount can be applied to the given sale amount.
    pub fn applicable_to(&self, amount: f64, now: DateTime<Utc>) -> bool {
        self.active && self.is_current(now) && amount >= self.minimum_amount
    }

    /// Savings this discount yields on the amount; 0.0 when not applicable.
    pub fn savings_for(&self, amount: f64, now: DateTime<Utc>) -> f64 {
        if !self.applicable_to(amount, now) {
            return 0.0;
        }

        match self.discount_type {
            DiscountType::Percentage => round_cents(amount * self.value / 100.0),
            DiscountType::FixedAmount => self.value.min(amount),
        }
    }

    /// The amount left after applying this discount.
    pub fn final_amount_after(&self, amount: f64, now: DateTime<Utc>) -> f64 {
        amount - self.savings_for(amount, now)
    }
}

/// Picks the applicable discount with the greatest savings.
///
/// Strictly-greater comparison: equal savings resolve to the earlier entry in
/// the slice, so callers control tie order through their sort.
pub fn best_discount<'a>(
    discounts: &'a [Discount],
    amount: f64,
    now: DateTime<Utc>,
) -> Option<&'a Discount> {
    let mut best: Option<&Discount> = None;
    let mut max_savings = 0.0;

    for discount in discounts {
        let savings = discount.savings_for(amount, now);
        if savings > max_savings {
            max_savings = savings;
            best = Some(discount);
        }
    }

    best
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn discount(
        name: &str,
        discount_type: DiscountType,
        value: f64,
        minimum_amount: f64,
    ) -> Discount {
        Discount {
            id: format!("d-{name}"),
            name: name.to_string(),
            description: None,
            discount_type,
            value,
            minimum_amount,
            active: true,
            starts_at: None,
            ends_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_percentage_savings_rounded() {
        let d = discount("ten-off", DiscountType::Percentage, 10.0, 0.0);
        let now = Utc::now();
        assert_eq!(d.savings_for(150.0, now), 15.0);
        assert_eq!(d.savings_for(33.33, now), 3.33);
    }

    #[test]
    fn test_fixed_savings_capped_at_amount() {
        let d = discount("five-bucks", DiscountType::FixedAmount, 5.0, 0.0);
        let now = Utc::now();
        assert_eq!(d.savings_for(100.0, now), 5.0);
        assert_eq!(d.savings_for(3.0, now), 3.0);
    }

    #[test]
    fn test_minimum_amount_gates_applicability() {
        let d = discount("big-spender", DiscountType::Percentage, 10.0, 100.0);
        let now = Utc::now();
        assert_eq!(d.savings_for(99.99, now), 0.0);
        assert_eq!(d.savings_for(100.0, now), 10.0);
    }

    #[test]
    fn test_inactive_discount_never_applies() {
        let mut d = discount("retired", DiscountType::Percentage, 50.0, 0.0);
        d.active = false;
        assert_eq!(d.savings_for(200.0, Utc::now()), 0.0);
    }

    #[test]
    fn test_date_window_edges() {
        let now = Utc::now();
        let mut d = discount("seasonal", DiscountType::Percentage, 10.0, 0.0);

        d.starts_at = Some(now + Duration::hours(1));
        assert!(!d.is_current(now));

        d.starts_at = Some(now - Duration::days(1));
        d.ends_at = Some(now - Duration::hours(1));
        assert!(!d.is_current(now));

        d.ends_at = Some(now + Duration::days(1));
        assert!(d.is_current(now));

        // Open bounds count as unbounded
        d.starts_at = None;
        d.ends_at = None;
        assert!(d.is_current(now));
    }

    #[test]
    fn test_best_discount_picks_max_savings() {
        // 10% off with $100 minimum vs $5 fixed with $10 minimum, at $150:
        // $15 savings beats $5.
        let d1 = discount("ten-pct", DiscountType::Percentage, 10.0, 100.0);
        let d2 = discount("five-flat", DiscountType::FixedAmount, 5.0, 10.0);
        let discounts = vec![d2.clone(), d1.clone()];

        let best = best_discount(&discounts, 150.0, Utc::now()).unwrap();
        assert_eq!(best.name, "ten-pct");

        // Below d1's minimum only d2 qualifies
        let best = best_discount(&discounts, 50.0, Utc::now()).unwrap();
        assert_eq!(best.name, "five-flat");
    }

    #[test]
    fn test_best_discount_tie_resolves_to_first() {
        let d1 = discount("first", DiscountType::FixedAmount, 5.0, 0.0);
        let d2 = discount("second", DiscountType::FixedAmount, 5.0, 0.0);

        let discounts = [d1, d2];
        let best = best_discount(&discounts, 50.0, Utc::now()).unwrap();
        assert_eq!(best.name, "first");
    }

    #[test]
    fn test_best_discount_none_when_nothing_applies() {
        let d = discount("big-spender", DiscountType::Percentage, 10.0, 500.0);
        assert!(best_discount(&[d], 50.0, Utc::now()).is_none());
    }
}
