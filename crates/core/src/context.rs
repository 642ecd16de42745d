//! Eligibility Context

use jiff::Timestamp;
use rust_decimal::Decimal;
use rustc_hash::FxHashSet;
use smallvec::SmallVec;

use crate::ids::{Fid, ProductId, WalletAddress};

/// Everything known about the shopper and their cart for one eligibility evaluation.
///
/// Built fresh for every request: balances and membership can change between calls, so
/// nothing derived from a context should be cached across requests.
#[derive(Debug, Clone, PartialEq)]
pub struct EligibilityContext {
    /// Verified user making the request.
    pub user: Fid,

    /// Custody and verified wallet addresses for the user, deduplicated.
    pub wallets: SmallVec<[WalletAddress; 4]>,

    /// Products currently in the cart.
    pub products: FxHashSet<ProductId>,

    /// Cart subtotal before discounts.
    pub subtotal: Decimal,

    /// Instant the evaluation is made at; expiry is checked against this.
    pub evaluated_at: Timestamp,
}

impl EligibilityContext {
    /// Context evaluated now.
    #[must_use]
    pub fn new(
        user: Fid,
        wallets: impl IntoIterator<Item = WalletAddress>,
        products: impl IntoIterator<Item = ProductId>,
        subtotal: Decimal,
    ) -> Self {
        let mut deduped: SmallVec<[WalletAddress; 4]> = SmallVec::new();

        for wallet in wallets {
            if !deduped.contains(&wallet) {
                deduped.push(wallet);
            }
        }

        Self {
            user,
            wallets: deduped,
            products: products.into_iter().collect(),
            subtotal,
            evaluated_at: Timestamp::now(),
        }
    }

    /// Same context evaluated at a different instant.
    #[must_use]
    pub fn at(mut self, instant: Timestamp) -> Self {
        self.evaluated_at = instant;
        self
    }
}
