//! Discount Records

use jiff::Timestamp;
use perkshop::{
    codes::DiscountCode,
    ids::{Fid, OrderId},
};
use rust_decimal::Decimal;

use crate::uuids::TypedUuid;

/// Discount Code UUID
pub type DiscountCodeUuid = TypedUuid<DiscountCodeRecord>;

/// Usage UUID
pub type UsageUuid = TypedUuid<UsageRecord>;

/// Discount Code Record
#[derive(Debug, Clone, PartialEq)]
pub struct DiscountCodeRecord {
    pub uuid: DiscountCodeUuid,
    pub code: DiscountCode,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// One redemption of a code on one order. Append-only.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageRecord {
    pub uuid: UsageUuid,
    pub discount_code_uuid: DiscountCodeUuid,
    pub user: Fid,

    /// 1-based ordinal of this user's uses of the code.
    pub user_slot: u32,

    pub order_id: OrderId,
    pub discount_amount: Decimal,
    pub original_subtotal: Decimal,

    /// Whether shipping was waived when the code was redeemed.
    pub free_shipping: bool,

    pub used_at: Timestamp,
}
