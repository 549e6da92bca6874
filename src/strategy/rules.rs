//! Oversubscription rule.
//!
//! An IPO is a BUY only when every one of the five bid categories is
//! oversubscribed, i.e. its multiple is strictly greater than 1.0. The
//! comparison and the zero default for missing categories decide real money;
//! do not loosen either.

use rust_decimal::Decimal;

use crate::domain::{BidCategory, SubscriptionSnapshot, Verdict};

/// Justification recorded when a closing IPO has no snapshot at all
pub const NO_SUBSCRIPTION_DATA: &str = "no subscription data available";

/// Verdict plus the audit text explaining it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub verdict: Verdict,
    pub justification: String,
}

/// A category passes when demand strictly exceeds the shares offered
pub fn is_oversubscribed(multiple: Decimal) -> bool {
    multiple > Decimal::ONE
}

/// Apply the all-categories rule to a snapshot
pub fn evaluate(snapshot: &SubscriptionSnapshot) -> Evaluation {
    let mut all_passed = true;
    let mut parts = Vec::with_capacity(BidCategory::ALL.len());

    for category in BidCategory::ALL {
        let multiple = snapshot.multiples.get(category).max(Decimal::ZERO);
        let passed = is_oversubscribed(multiple);
        all_passed &= passed;
        parts.push(format!(
            "{}: {}x {}",
            category.label(),
            multiple.normalize(),
            if passed { "✓" } else { "✗" }
        ));
    }

    let breakdown = parts.join(", ");
    if all_passed {
        Evaluation {
            verdict: Verdict::Buy,
            justification: format!("All categories oversubscribed: {}", breakdown),
        }
    } else {
        Evaluation {
            verdict: Verdict::Skip,
            justification: format!("Not all categories oversubscribed: {}", breakdown),
        }
    }
}
