//! Discount Codes

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

use jiff::Timestamp;
use rust_decimal::Decimal;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    gating::Gate,
    ids::{CodeName, Fid, ProductId},
};

/// Errors raised when a discount code definition is not acceptable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodeError {
    /// Discount values must be strictly positive.
    #[error("discount value must be greater than zero")]
    NonPositiveValue,

    /// Percentage discounts cannot exceed 100%.
    #[error("percentage discount cannot exceed 100")]
    PercentageAboveHundred,

    /// Product-scoped codes need at least one product.
    #[error("product-scoped code must target at least one product")]
    EmptyProductScope,

    /// Usage caps must be at least one.
    #[error("{0} must be at least 1")]
    ZeroCap(&'static str),

    /// Minimum order amounts cannot be negative.
    #[error("minimum order amount cannot be negative")]
    NegativeMinimumOrder,

    /// Unknown enum value read from storage or the command line.
    #[error("unknown {kind}: {value}")]
    Unknown {
        /// Which field was being parsed.
        kind: &'static str,
        /// Offending value.
        value: String,
    },
}

/// How the discount value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    /// `value` percent of the subtotal.
    Percentage,
    /// `value` off the subtotal, in store currency.
    Fixed,
}

impl DiscountKind {
    /// Storage name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Percentage => "percentage",
            Self::Fixed => "fixed",
        }
    }
}

impl FromStr for DiscountKind {
    type Err = CodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "percentage" => Ok(Self::Percentage),
            "fixed" => Ok(Self::Fixed),
            other => Err(CodeError::Unknown {
                kind: "discount kind",
                value: other.to_string(),
            }),
        }
    }
}

impl Display for DiscountKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Why a code exists. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeType {
    /// One-time code issued to each new user.
    Welcome,
    /// Campaign code.
    Promotional,
    /// Referral reward.
    Referral,
    /// Ambassador payout perk.
    Ambassador,
    /// Staking perk.
    Staking,
    /// Club member perk.
    Club,
    /// Anything else.
    Other,
}

impl CodeType {
    const ALL: [Self; 7] = [
        Self::Welcome,
        Self::Promotional,
        Self::Referral,
        Self::Ambassador,
        Self::Staking,
        Self::Club,
        Self::Other,
    ];

    /// Storage name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Welcome => "welcome",
            Self::Promotional => "promotional",
            Self::Referral => "referral",
            Self::Ambassador => "ambassador",
            Self::Staking => "staking",
            Self::Club => "club",
            Self::Other => "other",
        }
    }
}

impl FromStr for CodeType {
    type Err = CodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|code_type| code_type.as_str() == s)
            .ok_or_else(|| CodeError::Unknown {
                kind: "code type",
                value: s.to_string(),
            })
    }
}

impl Display for CodeType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Which cart contents a code applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum Scope {
    /// Any cart.
    SiteWide,
    /// Carts containing at least one of the listed products.
    Product {
        /// Target products.
        products: FxHashSet<ProductId>,
    },
}

impl Scope {
    /// Storage name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SiteWide => "site_wide",
            Self::Product { .. } => "product",
        }
    }

    /// `true` for product-scoped codes.
    #[must_use]
    pub const fn is_product(&self) -> bool {
        matches!(self, Self::Product { .. })
    }
}

/// Who may redeem a code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "ownership", rename_all = "snake_case")]
pub enum Ownership {
    /// Anyone eligible.
    Shared,
    /// Only the owning user.
    User {
        /// Owner's FID.
        owner: Fid,
    },
}

impl Ownership {
    /// `true` for shared codes.
    #[must_use]
    pub const fn is_shared(self) -> bool {
        matches!(self, Self::Shared)
    }

    /// Owning user, if any.
    #[must_use]
    pub const fn owner(self) -> Option<Fid> {
        match self {
            Self::Shared => None,
            Self::User { owner } => Some(owner),
        }
    }
}

/// Caps, expiry and thresholds that govern when and how often a code can be used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsagePolicy {
    /// Maximum redemptions across all users; `None` is unlimited.
    pub max_uses_total: Option<u32>,

    /// Maximum redemptions per user.
    pub max_uses_per_user: u32,

    /// Instant after which the code is no longer valid.
    pub expires_at: Option<Timestamp>,

    /// Cart subtotal required before the code applies.
    pub minimum_order_amount: Option<Decimal>,
}

impl Default for UsagePolicy {
    fn default() -> Self {
        Self {
            max_uses_total: None,
            max_uses_per_user: 1,
            expires_at: None,
            minimum_order_amount: None,
        }
    }
}

/// A promotional offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountCode {
    /// Unique, case-normalised code.
    pub name: CodeName,

    /// Percentage or fixed amount.
    pub kind: DiscountKind,

    /// Percentage points or currency amount, depending on `kind`.
    pub value: Decimal,

    /// Informational category.
    pub code_type: CodeType,

    /// Cart contents the code applies to.
    pub scope: Scope,

    /// Who may redeem the code.
    pub ownership: Ownership,

    /// External condition for eligibility.
    pub gate: Gate,

    /// Caps, expiry and minimum order.
    pub policy: UsagePolicy,

    /// Redemptions recorded so far, maintained alongside the usage ledger.
    pub total_uses: u32,

    /// Waive shipping in addition to the monetary discount.
    pub free_shipping: bool,

    /// Offer without the shopper typing it in.
    pub auto_apply: bool,

    /// Administrator tie-breaker; higher wins.
    pub priority_level: i32,

    /// Administrative on/off switch.
    pub active: bool,
}

impl DiscountCode {
    /// Check the definition is acceptable for creation.
    ///
    /// # Errors
    ///
    /// Returns a [`CodeError`] describing the first problem found.
    pub fn validate(&self) -> Result<(), CodeError> {
        if self.value <= Decimal::ZERO {
            return Err(CodeError::NonPositiveValue);
        }

        if self.kind == DiscountKind::Percentage && self.value > Decimal::ONE_HUNDRED {
            return Err(CodeError::PercentageAboveHundred);
        }

        if let Scope::Product { products } = &self.scope
            && products.is_empty()
        {
            return Err(CodeError::EmptyProductScope);
        }

        if self.policy.max_uses_total == Some(0) {
            return Err(CodeError::ZeroCap("max uses total"));
        }

        if self.policy.max_uses_per_user == 0 {
            return Err(CodeError::ZeroCap("max uses per user"));
        }

        if self
            .policy
            .minimum_order_amount
            .is_some_and(|minimum| minimum < Decimal::ZERO)
        {
            return Err(CodeError::NegativeMinimumOrder);
        }

        Ok(())
    }

    /// Remaining redemptions across all users, `None` when uncapped.
    #[must_use]
    pub fn remaining_uses(&self) -> Option<u32> {
        self.policy
            .max_uses_total
            .map(|max| max.saturating_sub(self.total_uses))
    }

    /// Whether the code has expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.policy.expires_at.is_some_and(|expires| expires <= now)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// A shared, site-wide, ungated 10% code with default policy.
    pub(crate) fn shared_code(name: &str) -> DiscountCode {
        DiscountCode {
            name: CodeName::parse(name).expect("fixture code names are valid"),
            kind: DiscountKind::Percentage,
            value: Decimal::from(10),
            code_type: CodeType::Promotional,
            scope: Scope::SiteWide,
            ownership: Ownership::Shared,
            gate: Gate::None,
            policy: UsagePolicy::default(),
            total_uses: 0,
            free_shipping: false,
            auto_apply: false,
            priority_level: 0,
            active: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{fixtures::shared_code, *};

    #[test]
    fn valid_code_passes_validation() {
        assert_eq!(shared_code("SPRING").validate(), Ok(()));
    }

    #[test]
    fn zero_value_is_rejected() {
        let mut code = shared_code("ZERO");
        code.value = Decimal::ZERO;

        assert_eq!(code.validate(), Err(CodeError::NonPositiveValue));
    }

    #[test]
    fn percentage_over_hundred_is_rejected() {
        let mut code = shared_code("TOOMUCH");
        code.value = Decimal::from(101);

        assert_eq!(code.validate(), Err(CodeError::PercentageAboveHundred));
    }

    #[test]
    fn fixed_value_over_hundred_is_allowed() {
        let mut code = shared_code("BIGFIXED");
        code.kind = DiscountKind::Fixed;
        code.value = Decimal::from(250);

        assert_eq!(code.validate(), Ok(()));
    }

    #[test]
    fn empty_product_scope_is_rejected() {
        let mut code = shared_code("NOPRODUCTS");
        code.scope = Scope::Product {
            products: FxHashSet::default(),
        };

        assert_eq!(code.validate(), Err(CodeError::EmptyProductScope));
    }

    #[test]
    fn zero_per_user_cap_is_rejected() {
        let mut code = shared_code("NOUSES");
        code.policy.max_uses_per_user = 0;

        assert_eq!(code.validate(), Err(CodeError::ZeroCap("max uses per user")));
    }

    #[test]
    fn remaining_uses_saturates() {
        let mut code = shared_code("CAPPED");
        code.policy.max_uses_total = Some(3);
        code.total_uses = 5;

        assert_eq!(code.remaining_uses(), Some(0));
        assert_eq!(shared_code("OPEN").remaining_uses(), None);
    }

    #[test]
    fn code_type_parses_storage_names() {
        assert_eq!("welcome".parse::<CodeType>(), Ok(CodeType::Welcome));
        assert!("mystery".parse::<CodeType>().is_err());
    }
}
