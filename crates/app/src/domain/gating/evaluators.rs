//! One evaluator per gating type.

use std::sync::Arc;

use async_trait::async_trait;
use perkshop::{
    context::EligibilityContext,
    gating::{
        BalanceKind, Gate, GateDetail, GateOutcome, GatingType, balance_meets, user_listed,
        wallet_listed,
    },
};
use rust_decimal::Decimal;
use tracing::warn;

use crate::domain::gating::sources::{BalanceSource, MembershipSource};

/// Decides whether a shopper meets one kind of gate.
///
/// Implementations never fail: lookups that error are reported as unsatisfied outcomes.
#[async_trait]
pub trait GateEvaluator: Send + Sync {
    /// Gating type this evaluator handles.
    fn gating_type(&self) -> GatingType;

    async fn evaluate(&self, gate: &Gate, ctx: &EligibilityContext) -> GateOutcome;
}

fn mismatched(expected: GatingType, gate: &Gate) -> GateOutcome {
    GateOutcome::unsatisfied(GateDetail::LookupFailed {
        reason: format!(
            "{expected} evaluator received {} parameters",
            gate.gating_type()
        ),
    })
}

fn lookup_failed(reason: impl ToString) -> GateOutcome {
    GateOutcome::unsatisfied(GateDetail::LookupFailed {
        reason: reason.to_string(),
    })
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OpenGateEvaluator;

#[async_trait]
impl GateEvaluator for OpenGateEvaluator {
    fn gating_type(&self) -> GatingType {
        GatingType::None
    }

    async fn evaluate(&self, _gate: &Gate, _ctx: &EligibilityContext) -> GateOutcome {
        GateOutcome::open()
    }
}

/// Token and staking balance gates.
#[derive(Clone)]
pub struct BalanceGateEvaluator {
    source: Arc<dyn BalanceSource>,
    kind: BalanceKind,
}

impl BalanceGateEvaluator {
    #[must_use]
    pub fn held(source: Arc<dyn BalanceSource>) -> Self {
        Self {
            source,
            kind: BalanceKind::Held,
        }
    }

    #[must_use]
    pub fn staked(source: Arc<dyn BalanceSource>) -> Self {
        Self {
            source,
            kind: BalanceKind::Staked,
        }
    }
}

#[async_trait]
impl GateEvaluator for BalanceGateEvaluator {
    fn gating_type(&self) -> GatingType {
        match self.kind {
            BalanceKind::Held => GatingType::TokenBalance,
            BalanceKind::Staked => GatingType::StakingBalance,
        }
    }

    async fn evaluate(&self, gate: &Gate, ctx: &EligibilityContext) -> GateOutcome {
        let (token, required) = match (self.kind, gate) {
            (BalanceKind::Held, Gate::TokenBalance { token, required_balance })
            | (BalanceKind::Staked, Gate::StakingBalance { token, required_balance }) => {
                (token, *required_balance)
            }
            _ => return mismatched(self.gating_type(), gate),
        };

        if ctx.wallets.is_empty() {
            return GateOutcome::unsatisfied(GateDetail::NoWallets);
        }

        match self.source.balance(&ctx.wallets, token, self.kind).await {
            Ok(balance) => balance_meets(&token.symbol, balance, required),
            Err(error) => {
                warn!(
                    user_fid = %ctx.user,
                    chain_id = token.chain_id,
                    contract = %token.contract,
                    kind = self.kind.as_str(),
                    error = %error,
                    "balance lookup failed; gate not satisfied"
                );

                lookup_failed(error)
            }
        }
    }
}

#[derive(Clone)]
pub struct MembershipGateEvaluator {
    source: Arc<dyn MembershipSource>,
}

impl MembershipGateEvaluator {
    #[must_use]
    pub fn new(source: Arc<dyn MembershipSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl GateEvaluator for MembershipGateEvaluator {
    fn gating_type(&self) -> GatingType {
        GatingType::ClubMembership
    }

    async fn evaluate(&self, gate: &Gate, ctx: &EligibilityContext) -> GateOutcome {
        if !matches!(gate, Gate::ClubMembership) {
            return mismatched(self.gating_type(), gate);
        }

        match self.source.is_club_member(ctx.user).await {
            Ok(true) => GateOutcome::satisfied(GateDetail::Membership { member: true }),
            Ok(false) => GateOutcome::unsatisfied(GateDetail::Membership { member: false }),
            Err(error) => {
                warn!(user_fid = %ctx.user, error = %error, "membership lookup failed; gate not satisfied");

                lookup_failed(error)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UserAllowListEvaluator;

#[async_trait]
impl GateEvaluator for UserAllowListEvaluator {
    fn gating_type(&self) -> GatingType {
        GatingType::WhitelistUser
    }

    async fn evaluate(&self, gate: &Gate, ctx: &EligibilityContext) -> GateOutcome {
        match gate {
            Gate::WhitelistUser { users } => user_listed(users, ctx.user),
            _ => mismatched(self.gating_type(), gate),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WalletAllowListEvaluator;

#[async_trait]
impl GateEvaluator for WalletAllowListEvaluator {
    fn gating_type(&self) -> GatingType {
        GatingType::WhitelistWallet
    }

    async fn evaluate(&self, gate: &Gate, ctx: &EligibilityContext) -> GateOutcome {
        match gate {
            Gate::WhitelistWallet { wallets } => wallet_listed(wallets, &ctx.wallets),
            _ => mismatched(self.gating_type(), gate),
        }
    }
}

/// Holding any one of several contracts, each on its own chain.
#[derive(Clone)]
pub struct ContractHoldingEvaluator {
    source: Arc<dyn BalanceSource>,
}

impl ContractHoldingEvaluator {
    #[must_use]
    pub fn new(source: Arc<dyn BalanceSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl GateEvaluator for ContractHoldingEvaluator {
    fn gating_type(&self) -> GatingType {
        GatingType::ContractHolding
    }

    async fn evaluate(&self, gate: &Gate, ctx: &EligibilityContext) -> GateOutcome {
        let Gate::ContractHolding {
            contracts,
            required_balance,
        } = gate
        else {
            return mismatched(self.gating_type(), gate);
        };

        if ctx.wallets.is_empty() {
            return GateOutcome::unsatisfied(GateDetail::NoWallets);
        }

        let lookups = contracts.iter().map(|token| async move {
            let balance = match self
                .source
                .balance(&ctx.wallets, token, BalanceKind::Held)
                .await
            {
                Ok(balance) => balance,
                Err(error) => {
                    warn!(
                        user_fid = %ctx.user,
                        chain_id = token.chain_id,
                        contract = %token.contract,
                        error = %error,
                        "holding lookup failed; counting as no holding"
                    );

                    Decimal::ZERO
                }
            };

            (token, balance)
        });

        let balances = futures::future::join_all(lookups).await;

        balances
            .into_iter()
            .find(|(_, balance)| balance >= required_balance)
            .map_or_else(
                || GateOutcome::unsatisfied(GateDetail::NoQualifyingHolding),
                |(token, _)| {
                    GateOutcome::satisfied(GateDetail::Holding {
                        symbol: token.symbol.clone(),
                    })
                },
            )
    }
}
