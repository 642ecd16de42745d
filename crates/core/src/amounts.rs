//! Discount amounts

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::codes::{DiscountCode, DiscountKind};

/// Monetary amounts are kept to two decimal places.
pub const AMOUNT_SCALE: u32 = 2;

/// Monetary discount and shipping waiver for one code on one subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountAmount {
    /// Amount taken off the subtotal. Never negative, never above the subtotal.
    pub amount: Decimal,

    /// Whether shipping is waived as well.
    pub free_shipping: bool,
}

/// Compute the discount `code` gives on `subtotal`.
///
/// Percentages are rounded to the cent, midpoint away from zero. Fixed amounts are capped
/// at the subtotal so the discounted total never goes below zero.
#[must_use]
pub fn compute_amount(code: &DiscountCode, subtotal: Decimal) -> DiscountAmount {
    let subtotal = subtotal.max(Decimal::ZERO);

    let raw = match code.kind {
        DiscountKind::Percentage => {
            subtotal.checked_mul(code.value).map_or(subtotal, |product| product / Decimal::ONE_HUNDRED)
        }
        DiscountKind::Fixed => code.value,
    };

    let amount = raw
        .round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::MidpointAwayFromZero)
        .clamp(Decimal::ZERO, subtotal);

    DiscountAmount {
        amount,
        free_shipping: code.free_shipping,
    }
}
