//! Eligibility
//!
//! The ordered validity checks for a single code. Checks run cheapest first and stop at
//! the first failure, so the reason reported is the most specific one that applies:
//!
//! 1. the code exists and is active
//! 2. it has not expired
//! 3. it is not exhausted
//! 4. the shopper owns it (user-specific codes)
//! 5. the shopper has not used up their allowance
//! 6. the cart matches the code's scope
//! 7. the cart meets the minimum order
//! 8. the gate is satisfied
//!
//! Steps 1 to 7 are pure and live in [`check_constraints`]. Step 8 needs external lookups,
//! so callers evaluate the gate separately and fold the outcome in with [`conclude`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    codes::{DiscountCode, Scope},
    context::EligibilityContext,
    gating::{GateDetail, GateOutcome, GatingType},
};

/// Why a code cannot be used.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum IneligibleReason {
    /// No code with that name exists.
    #[error("discount code not found")]
    NotFound,

    /// The code has been switched off by an administrator.
    #[error("discount code is no longer active")]
    Inactive,

    /// The code's expiry has passed.
    #[error("discount code has expired")]
    Expired,

    /// Every allowed redemption has been used.
    #[error("discount code has been fully redeemed")]
    Exhausted,

    /// The code belongs to a different user.
    #[error("discount code is not valid for this account")]
    NotOwnedByUser,

    /// The shopper has used their allowance for this code.
    #[error("discount code has already been used")]
    AlreadyUsed,

    /// None of the cart's products are covered by the code.
    #[error("discount code does not apply to the products in this cart")]
    ScopeMismatch,

    /// The cart subtotal is below the code's minimum.
    #[error("order does not meet the minimum amount for this code")]
    BelowMinimumOrder,

    /// The code's gate was not satisfied.
    #[error("{gating} requirement not met")]
    GateNotSatisfied {
        /// Gate category.
        gating: GatingType,
        /// What the evaluator found.
        detail: GateDetail,
    },
}

impl IneligibleReason {
    /// Message suitable for showing to the shopper.
    #[must_use]
    pub fn user_message(&self) -> String {
        let Self::GateNotSatisfied { gating, detail } = self else {
            return self.to_string();
        };

        match (gating, detail) {
            (_, GateDetail::Balance { symbol, .. }) if *gating == GatingType::StakingBalance => {
                format!("insufficient staked ${symbol} balance")
            }
            (_, GateDetail::Balance { symbol, .. }) => format!("insufficient ${symbol} balance"),
            (_, GateDetail::NoWallets) => "connect a wallet to use this code".to_string(),
            (_, GateDetail::LookupFailed { .. } | GateDetail::TimedOut) => {
                "we could not verify your eligibility right now".to_string()
            }
            (GatingType::ClubMembership, _) => "this code is for club members only".to_string(),
            (GatingType::WhitelistUser | GatingType::WhitelistWallet, _) => {
                "this code is limited to invited members".to_string()
            }
            (GatingType::ContractHolding, _) => {
                "this code requires holding a qualifying token".to_string()
            }
            _ => self.to_string(),
        }
    }
}

/// Outcome of a full validity check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// `None` when the code is valid.
    pub reason: Option<IneligibleReason>,

    /// Gate outcome, when the check reached step 8.
    pub gate: Option<GateOutcome>,
}

impl Verdict {
    /// Valid verdict carrying the gate outcome that admitted it.
    #[must_use]
    pub const fn valid(gate: GateOutcome) -> Self {
        Self {
            reason: None,
            gate: Some(gate),
        }
    }

    /// Invalid verdict.
    #[must_use]
    pub const fn invalid(reason: IneligibleReason) -> Self {
        Self { reason: Some(reason), gate: None }
    }

    /// Whether the code may be used.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.reason.is_none()
    }

    /// Convert into a `Result`, surfacing the reason as the error.
    ///
    /// # Errors
    ///
    /// Returns the [`IneligibleReason`] for invalid verdicts.
    pub fn into_result(self) -> Result<Option<GateOutcome>, IneligibleReason> {
        match self.reason {
            None => Ok(self.gate),
            Some(reason) => Err(reason),
        }
    }
}

/// Run checks 1 to 7 for `code`.
///
/// `prior_user_uses` is the number of usage records already stored for this code and the
/// context's user. It must be read fresh for each check.
///
/// # Errors
///
/// Returns the first [`IneligibleReason`] that applies.
pub fn check_constraints(
    code: &DiscountCode,
    ctx: &EligibilityContext,
    prior_user_uses: u32,
) -> Result<(), IneligibleReason> {
    if !code.active {
        return Err(IneligibleReason::Inactive);
    }

    if code.is_expired_at(ctx.evaluated_at) {
        return Err(IneligibleReason::Expired);
    }

    if code
        .policy
        .max_uses_total
        .is_some_and(|max| code.total_uses >= max)
    {
        return Err(IneligibleReason::Exhausted);
    }

    if code
        .ownership
        .owner()
        .is_some_and(|owner| owner != ctx.user)
    {
        return Err(IneligibleReason::NotOwnedByUser);
    }

    if prior_user_uses >= code.policy.max_uses_per_user {
        return Err(IneligibleReason::AlreadyUsed);
    }

    if let Scope::Product { products } = &code.scope
        && products.is_disjoint(&ctx.products)
    {
        return Err(IneligibleReason::ScopeMismatch);
    }

    if code
        .policy
        .minimum_order_amount
        .is_some_and(|minimum| ctx.subtotal < minimum)
    {
        return Err(IneligibleReason::BelowMinimumOrder);
    }

    Ok(())
}

/// Fold a gate outcome into a verdict (step 8).
#[must_use]
pub fn conclude(code: &DiscountCode, gate: GateOutcome) -> Verdict {
    if gate.satisfied {
        return Verdict::valid(gate);
    }

    Verdict {
        reason: Some(IneligibleReason::GateNotSatisfied {
            gating: code.gate.gating_type(),
            detail: gate.detail.clone(),
        }),
        gate: Some(gate),
    }
}

#[cfg(test)]
mod tests {
    use jiff::{SignedDuration, Timestamp};
    use rust_decimal::Decimal;
    use rustc_hash::FxHashSet;
    use testresult::TestResult;

    use super::*;
    use crate::{
        codes::{Ownership, fixtures::shared_code},
        gating::{Gate, TokenDescriptor},
        ids::{Fid, ProductId, WalletAddress},
    };

    fn ctx(user: u64, subtotal: i64) -> EligibilityContext {
        EligibilityContext::new(
            Fid::new(user),
            Vec::<WalletAddress>::new(),
            Vec::<ProductId>::new(),
            Decimal::from(subtotal),
        )
    }

    #[test]
    fn fresh_shared_code_passes() {
        assert_eq!(check_constraints(&shared_code("OPEN"), &ctx(1, 50), 0), Ok(()));
    }

    #[test]
    fn inactive_code_is_reported_first() {
        let mut code = shared_code("OFF");
        code.active = false;
        code.policy.expires_at = Some(Timestamp::UNIX_EPOCH);

        assert_eq!(
            check_constraints(&code, &ctx(1, 50), 0),
            Err(IneligibleReason::Inactive)
        );
    }

    #[test]
    fn expired_code_is_expired_even_with_no_uses() {
        let now = Timestamp::now();
        let mut code = shared_code("OLD");
        code.policy.expires_at = Some(now - SignedDuration::from_hours(1));

        assert_eq!(
            check_constraints(&code, &ctx(1, 50).at(now), 0),
            Err(IneligibleReason::Expired)
        );
    }

    #[test]
    fn code_expiring_exactly_now_is_expired() {
        let now = Timestamp::now();
        let mut code = shared_code("EDGE");
        code.policy.expires_at = Some(now);

        assert_eq!(
            check_constraints(&code, &ctx(1, 50).at(now), 0),
            Err(IneligibleReason::Expired)
        );
    }

    #[test]
    fn future_expiry_passes() {
        let now = Timestamp::now();
        let mut code = shared_code("SOON");
        code.policy.expires_at = Some(now + SignedDuration::from_hours(1));

        assert_eq!(check_constraints(&code, &ctx(1, 50).at(now), 0), Ok(()));
    }

    #[test]
    fn exhausted_before_ownership() {
        let mut code = shared_code("GONE");
        code.policy.max_uses_total = Some(5);
        code.total_uses = 5;
        code.ownership = Ownership::User { owner: Fid::new(2) };

        assert_eq!(
            check_constraints(&code, &ctx(1, 50), 0),
            Err(IneligibleReason::Exhausted)
        );
    }

    #[test]
    fn user_code_rejects_other_users() {
        let mut code = shared_code("MINE");
        code.ownership = Ownership::User { owner: Fid::new(2) };

        assert_eq!(
            check_constraints(&code, &ctx(3, 50), 0),
            Err(IneligibleReason::NotOwnedByUser)
        );
        assert_eq!(check_constraints(&code, &ctx(2, 50), 0), Ok(()));
    }

    #[test]
    fn per_user_cap() {
        let mut code = shared_code("TWICE");
        code.policy.max_uses_per_user = 2;

        assert_eq!(check_constraints(&code, &ctx(1, 50), 1), Ok(()));
        assert_eq!(
            check_constraints(&code, &ctx(1, 50), 2),
            Err(IneligibleReason::AlreadyUsed)
        );
    }

    #[test]
    fn product_scope_needs_an_overlapping_product() -> TestResult {
        let hoodie = ProductId::new("gid://shopify/Product/10")?;
        let mug = ProductId::new("gid://shopify/Product/11")?;

        let mut code = shared_code("HOODIE");
        code.scope = Scope::Product {
            products: [hoodie.clone()].into_iter().collect::<FxHashSet<_>>(),
        };

        let mug_cart =
            EligibilityContext::new(Fid::new(1), Vec::<WalletAddress>::new(), [mug.clone()], Decimal::from(20));
        let mixed_cart =
            EligibilityContext::new(Fid::new(1), Vec::<WalletAddress>::new(), [mug, hoodie], Decimal::from(80));

        assert_eq!(
            check_constraints(&code, &mug_cart, 0),
            Err(IneligibleReason::ScopeMismatch)
        );
        assert_eq!(check_constraints(&code, &mixed_cart, 0), Ok(()));

        Ok(())
    }

    #[test]
    fn minimum_order_is_inclusive() {
        let mut code = shared_code("MIN50");
        code.policy.minimum_order_amount = Some(Decimal::from(50));

        assert_eq!(
            check_constraints(&code, &ctx(1, 49), 0),
            Err(IneligibleReason::BelowMinimumOrder)
        );
        assert_eq!(check_constraints(&code, &ctx(1, 50), 0), Ok(()));
    }

    #[test]
    fn unsatisfied_gate_carries_gating_type() -> TestResult {
        let mut code = shared_code("HOLDERS");
        code.gate = Gate::TokenBalance {
            token: TokenDescriptor {
                chain_id: 8453,
                contract: WalletAddress::parse("0x00000000000000000000000000000000000000aa")?,
                symbol: "PERK".to_string(),
            },
            required_balance: Decimal::from(100),
        };

        let verdict = conclude(&code, GateOutcome::unsatisfied(GateDetail::TimedOut));

        assert!(!verdict.is_valid(), "unsatisfied gate must invalidate");
        assert!(
            matches!(
                verdict.reason,
                Some(IneligibleReason::GateNotSatisfied {
                    gating: GatingType::TokenBalance,
                    ..
                })
            ),
            "expected GateNotSatisfied(token_balance), got {verdict:?}"
        );

        Ok(())
    }

    #[test]
    fn balance_gate_message_names_the_token() {
        let reason = IneligibleReason::GateNotSatisfied {
            gating: GatingType::TokenBalance,
            detail: GateDetail::Balance {
                symbol: "PERK".to_string(),
                balance: Decimal::from(5),
                required: Decimal::from(100),
            },
        };

        assert_eq!(reason.user_message(), "insufficient $PERK balance");
    }

    #[test]
    fn ownership_message_is_account_specific() {
        assert_eq!(
            IneligibleReason::NotOwnedByUser.user_message(),
            "discount code is not valid for this account"
        );
    }
}
