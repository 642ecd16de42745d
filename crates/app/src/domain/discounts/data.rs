//! Discount Data

use perkshop::{
    codes::DiscountCode,
    eligibility::IneligibleReason,
    ids::{Fid, OrderId},
};
use rust_decimal::Decimal;

use crate::domain::discounts::records::{DiscountCodeUuid, UsageRecord, UsageUuid};

/// New Discount Code
///
/// `code.total_uses` is ignored; new codes always start unused.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDiscountCode {
    pub uuid: DiscountCodeUuid,
    pub code: DiscountCode,
}

/// Usage to record for a validated redemption.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUsage {
    pub uuid: UsageUuid,
    pub discount_code_uuid: DiscountCodeUuid,
    pub user: Fid,
    pub order_id: OrderId,
    pub discount_amount: Decimal,
    pub original_subtotal: Decimal,
    pub free_shipping: bool,
}

/// Result of trying to record a usage under the code's row lock.
#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    /// The usage was stored and the code's counter incremented.
    Recorded(UsageRecord),

    /// The same user already redeemed the code on this order; nothing changed.
    Replayed(UsageRecord),

    /// A cap, the code's state, or another user's use of the order prevented the write.
    Rejected(IneligibleReason),
}
