//! Gating
//!
//! A gate is an external condition a shopper must meet before a code becomes eligible:
//! holding or staking enough of a token, being a club member, or appearing on an
//! allow-list. The parameters live on the discount code; evaluating balance and membership
//! gates requires lookups, which the application crate performs.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

use rust_decimal::Decimal;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use thiserror::Error;

use crate::ids::{Fid, WalletAddress};

/// Gate categories, as stored in the `gating_type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatingType {
    /// No gate.
    None,
    /// Wallets must hold a minimum token balance.
    TokenBalance,
    /// Wallets must have a minimum amount staked.
    StakingBalance,
    /// User must be a club member.
    ClubMembership,
    /// User must be on an allow-list.
    WhitelistUser,
    /// One of the user's wallets must be on an allow-list.
    WhitelistWallet,
    /// Wallets must hold one of several tokens, possibly on different chains.
    ContractHolding,
}

impl GatingType {
    /// Every gating type, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::None,
        Self::TokenBalance,
        Self::StakingBalance,
        Self::ClubMembership,
        Self::WhitelistUser,
        Self::WhitelistWallet,
        Self::ContractHolding,
    ];

    /// Storage name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::TokenBalance => "token_balance",
            Self::StakingBalance => "staking_balance",
            Self::ClubMembership => "club_membership",
            Self::WhitelistUser => "whitelist_user",
            Self::WhitelistWallet => "whitelist_wallet",
            Self::ContractHolding => "contract_holding",
        }
    }
}

impl Display for GatingType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Unknown gating type name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown gating type: {0}")]
pub struct UnknownGatingType(pub String);

impl FromStr for GatingType {
    type Err = UnknownGatingType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|gating| gating.as_str() == s)
            .ok_or_else(|| UnknownGatingType(s.to_string()))
    }
}

/// Whether a balance lookup asks for tokens held or tokens staked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceKind {
    /// Tokens held in the wallet.
    Held,
    /// Tokens locked in the staking contract.
    Staked,
}

impl BalanceKind {
    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Held => "held",
            Self::Staked => "staked",
        }
    }
}

/// Token contract on a specific chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenDescriptor {
    /// EVM chain id (8453 for Base).
    pub chain_id: u64,

    /// Token contract address.
    pub contract: WalletAddress,

    /// Ticker shown to shoppers, e.g. `PERK`.
    pub symbol: String,
}

fn one() -> Decimal {
    Decimal::ONE
}

/// Gate parameters, persisted as JSON next to the gating type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Gate {
    /// Always satisfied.
    #[default]
    None,

    /// Held balance across the shopper's wallets must reach `required_balance`.
    TokenBalance {
        /// Token to look up.
        token: TokenDescriptor,
        /// Minimum combined balance, in whole tokens.
        required_balance: Decimal,
    },

    /// Staked balance across the shopper's wallets must reach `required_balance`.
    StakingBalance {
        /// Staked token to look up.
        token: TokenDescriptor,
        /// Minimum combined stake, in whole tokens.
        required_balance: Decimal,
    },

    /// Shopper's profile must carry the club membership flag.
    ClubMembership,

    /// Shopper's FID must be listed.
    WhitelistUser {
        /// Allowed FIDs.
        users: FxHashSet<Fid>,
    },

    /// One of the shopper's wallets must be listed.
    WhitelistWallet {
        /// Allowed wallets.
        wallets: FxHashSet<WalletAddress>,
    },

    /// Any one of the listed contracts must be held with at least `required_balance`.
    ContractHolding {
        /// Qualifying contracts.
        contracts: SmallVec<[TokenDescriptor; 2]>,
        /// Minimum balance per contract, in whole tokens.
        #[serde(default = "one")]
        required_balance: Decimal,
    },
}

impl Gate {
    /// Category of this gate.
    #[must_use]
    pub const fn gating_type(&self) -> GatingType {
        match self {
            Self::None => GatingType::None,
            Self::TokenBalance { .. } => GatingType::TokenBalance,
            Self::StakingBalance { .. } => GatingType::StakingBalance,
            Self::ClubMembership => GatingType::ClubMembership,
            Self::WhitelistUser { .. } => GatingType::WhitelistUser,
            Self::WhitelistWallet { .. } => GatingType::WhitelistWallet,
            Self::ContractHolding { .. } => GatingType::ContractHolding,
        }
    }

    /// `true` for every gate other than [`Gate::None`].
    #[must_use]
    pub const fn is_gated(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Check a user allow-list.
#[must_use]
pub fn user_listed(users: &FxHashSet<Fid>, user: Fid) -> GateOutcome {
    if users.contains(&user) {
        GateOutcome::satisfied(GateDetail::Listed)
    } else {
        GateOutcome::unsatisfied(GateDetail::NotListed)
    }
}

/// Check a wallet allow-list against any of the shopper's wallets.
#[must_use]
pub fn wallet_listed(allowed: &FxHashSet<WalletAddress>, wallets: &[WalletAddress]) -> GateOutcome {
    if wallets.is_empty() {
        return GateOutcome::unsatisfied(GateDetail::NoWallets);
    }

    if wallets.iter().any(|wallet| allowed.contains(wallet)) {
        GateOutcome::satisfied(GateDetail::Listed)
    } else {
        GateOutcome::unsatisfied(GateDetail::NotListed)
    }
}

/// Compare a looked-up balance against a requirement.
#[must_use]
pub fn balance_meets(symbol: &str, balance: Decimal, required: Decimal) -> GateOutcome {
    let detail = GateDetail::Balance {
        symbol: symbol.to_string(),
        balance,
        required,
    };

    if balance >= required {
        GateOutcome::satisfied(detail)
    } else {
        GateOutcome::unsatisfied(detail)
    }
}

/// Why a gate was or was not satisfied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GateDetail {
    /// The code has no gate.
    Ungated,

    /// A balance was compared against the requirement.
    Balance {
        /// Token ticker.
        symbol: String,
        /// Combined balance that was found.
        balance: Decimal,
        /// Balance that was required.
        required: Decimal,
    },

    /// One of several contracts was held in sufficient quantity.
    Holding {
        /// Ticker of the qualifying token.
        symbol: String,
    },

    /// None of the contracts were held in sufficient quantity.
    NoQualifyingHolding,

    /// Membership flag value.
    Membership {
        /// Whether the user is a member.
        member: bool,
    },

    /// The user or one of their wallets is on the allow-list.
    Listed,

    /// Neither the user nor any wallet is on the allow-list.
    NotListed,

    /// The user has no known wallets, so wallet-based gates cannot pass.
    NoWallets,

    /// The external lookup failed.
    LookupFailed {
        /// Error description, for logs and diagnostics.
        reason: String,
    },

    /// The external lookup did not answer in time.
    TimedOut,
}

/// Result of evaluating one gate for one shopper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateOutcome {
    /// Whether the gate passed.
    pub satisfied: bool,

    /// Supporting detail.
    pub detail: GateDetail,
}

impl GateOutcome {
    /// Passing outcome.
    #[must_use]
    pub const fn satisfied(detail: GateDetail) -> Self {
        Self {
            satisfied: true,
            detail,
        }
    }

    /// Failing outcome.
    #[must_use]
    pub const fn unsatisfied(detail: GateDetail) -> Self {
        Self {
            satisfied: false,
            detail,
        }
    }

    /// Outcome for an ungated code.
    #[must_use]
    pub const fn open() -> Self {
        Self::satisfied(GateDetail::Ungated)
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    fn wallet(n: u8) -> TestResult<WalletAddress> {
        Ok(WalletAddress::parse(&format!("0x{n:040x}"))?)
    }

    #[test]
    fn gating_type_round_trips_through_storage_name() -> TestResult {
        for gating in GatingType::ALL {
            assert_eq!(gating.as_str().parse::<GatingType>()?, gating);
        }

        Ok(())
    }

    #[test]
    fn unknown_gating_type_is_rejected() {
        assert!("nft_holder".parse::<GatingType>().is_err());
    }

    #[test]
    fn gate_reports_its_type() -> TestResult {
        let gate = Gate::StakingBalance {
            token: TokenDescriptor {
                chain_id: 8453,
                contract: wallet(1)?,
                symbol: "PERK".to_string(),
            },
            required_balance: Decimal::from(1_000),
        };

        assert_eq!(gate.gating_type(), GatingType::StakingBalance);
        assert!(gate.is_gated());
        assert!(!Gate::None.is_gated());

        Ok(())
    }

    #[test]
    fn wallet_allow_list_matches_any_wallet() -> TestResult {
        let allowed: FxHashSet<WalletAddress> = [wallet(2)?].into_iter().collect();

        let outcome = wallet_listed(&allowed, &[wallet(1)?, wallet(2)?]);

        assert!(outcome.satisfied, "second wallet is listed");
        assert_eq!(outcome.detail, GateDetail::Listed);

        Ok(())
    }

    #[test]
    fn wallet_allow_list_without_wallets_fails() -> TestResult {
        let allowed: FxHashSet<WalletAddress> = [wallet(2)?].into_iter().collect();

        let outcome = wallet_listed(&allowed, &[]);

        assert!(!outcome.satisfied, "no wallets cannot match");
        assert_eq!(outcome.detail, GateDetail::NoWallets);

        Ok(())
    }

    #[test]
    fn user_allow_list() {
        let users: FxHashSet<Fid> = [Fid::new(3), Fid::new(5)].into_iter().collect();

        assert!(user_listed(&users, Fid::new(5)).satisfied);
        assert!(!user_listed(&users, Fid::new(4)).satisfied);
    }

    #[test]
    fn balance_exactly_at_requirement_passes() {
        let outcome = balance_meets("PERK", Decimal::from(100), Decimal::from(100));

        assert!(outcome.satisfied, "balance equal to requirement should pass");
    }

    #[test]
    fn balance_below_requirement_fails() {
        let outcome = balance_meets("PERK", Decimal::new(9_999, 2), Decimal::from(100));

        assert!(!outcome.satisfied, "99.99 is below 100");
    }

    #[test]
    fn contract_holding_defaults_to_one_token() -> TestResult {
        let gate: Gate = serde_json::from_str(
            r#"{
                "type": "contract_holding",
                "contracts": [
                    {"chain_id": 8453, "contract": "0x00000000000000000000000000000000000000aa", "symbol": "CLUB"}
                ]
            }"#,
        )?;

        assert!(
            matches!(gate, Gate::ContractHolding { required_balance, .. } if required_balance == Decimal::ONE),
            "expected default requirement of one token, got {gate:?}"
        );

        Ok(())
    }
}
