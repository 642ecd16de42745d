//! Redemptions

use perkshop::{amounts::DiscountAmount, eligibility::IneligibleReason};
use thiserror::Error;

use crate::domain::discounts::{DiscountsStoreError, records::UsageRecord};

/// A recorded redemption.
#[derive(Debug, Clone, PartialEq)]
pub struct Redemption {
    pub usage: UsageRecord,
    pub amount: DiscountAmount,

    /// `true` when the order had already redeemed this code and nothing new was written.
    pub replayed: bool,
}

#[derive(Debug, Error)]
pub enum RedeemError {
    #[error("{0}")]
    Ineligible(#[from] IneligibleReason),

    #[error(transparent)]
    Store(#[from] DiscountsStoreError),
}

/// What happened to the discount when an order was placed. The order itself is placed
/// regardless.
#[derive(Debug)]
pub enum OrderDiscountOutcome {
    Applied(Redemption),

    /// The code was not valid at commit time; the order goes through at full price.
    Skipped(IneligibleReason),

    /// Recording the usage failed.
    Failed(String),
}

impl OrderDiscountOutcome {
    #[must_use]
    pub fn redemption(&self) -> Option<&Redemption> {
        match self {
            Self::Applied(redemption) => Some(redemption),
            Self::Skipped(_) | Self::Failed(_) => None,
        }
    }
}
