//! Best-discount selection
//!
//! Every caller that needs "the" discount for a cart goes through [`select_best`], so that
//! cart pricing, product pages and checkout agree on the winner.

use std::cmp::{Ordering, Reverse};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    amounts::{DiscountAmount, compute_amount},
    codes::DiscountCode,
};

/// A code that passed every validity check, priced for the context it was checked in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibleDiscount {
    /// The eligible code.
    pub code: DiscountCode,

    /// Amount it would take off the checked subtotal.
    pub amount: DiscountAmount,
}

impl EligibleDiscount {
    /// Price `code` against `subtotal`.
    #[must_use]
    pub fn priced(code: DiscountCode, subtotal: Decimal) -> Self {
        let amount = compute_amount(&code, subtotal);

        Self { code, amount }
    }
}

/// Compare two candidates; `Ordering::Greater` means `a` is preferred.
///
/// The ladder is: gated over ungated, product scope over site-wide, higher discount value,
/// higher priority level. Code names are unique, so the final comparison on the name
/// (alphabetically first wins) makes this a total order.
#[must_use]
pub fn preference(a: &EligibleDiscount, b: &EligibleDiscount) -> Ordering {
    rank(a).cmp(&rank(b))
}

fn rank(candidate: &EligibleDiscount) -> (bool, bool, Decimal, i32, Reverse<&str>) {
    let code = &candidate.code;

    (
        code.gate.is_gated(),
        code.scope.is_product(),
        code.value,
        code.priority_level,
        Reverse(code.name.as_str()),
    )
}

/// Pick the single preferred candidate, or `None` when there are none.
#[must_use]
pub fn select_best(candidates: &[EligibleDiscount]) -> Option<&EligibleDiscount> {
    candidates.iter().max_by(|a, b| preference(a, b))
}

/// Sort candidates from most to least preferred.
pub fn rank_candidates(candidates: &mut [EligibleDiscount]) {
    candidates.sort_by(|a, b| preference(b, a));
}
