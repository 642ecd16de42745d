//! Gating evaluator registry.

use std::{sync::Arc, time::Duration};

use perkshop::{
    context::EligibilityContext,
    gating::{Gate, GateDetail, GateOutcome, GatingType},
};
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::domain::gating::{
    evaluators::{
        BalanceGateEvaluator, ContractHoldingEvaluator, GateEvaluator, MembershipGateEvaluator,
        OpenGateEvaluator, UserAllowListEvaluator, WalletAllowListEvaluator,
    },
    sources::{BalanceSource, MembershipSource},
};

/// Default bound on a single gate evaluation.
pub const DEFAULT_GATING_TIMEOUT: Duration = Duration::from_millis(3_000);

/// Dispatches each gate to the evaluator registered for its type, under a timeout.
#[derive(Clone)]
pub struct GatingEvaluator {
    evaluators: FxHashMap<GatingType, Arc<dyn GateEvaluator>>,
    timeout: Duration,
}

impl std::fmt::Debug for GatingEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut registered: Vec<_> = self.evaluators.keys().copied().collect();
        registered.sort_unstable();

        f.debug_struct("GatingEvaluator")
            .field("registered", &registered)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl GatingEvaluator {
    /// Registry with no evaluators. Every gate, including `none`, is unsatisfied until one
    /// is registered for it.
    #[must_use]
    pub fn empty(timeout: Duration) -> Self {
        Self {
            evaluators: FxHashMap::default(),
            timeout,
        }
    }

    /// Registry with the standard evaluator for every gating type.
    #[must_use]
    pub fn new(
        balances: Arc<dyn BalanceSource>,
        membership: Arc<dyn MembershipSource>,
        timeout: Duration,
    ) -> Self {
        Self::empty(timeout)
            .with_evaluator(Arc::new(OpenGateEvaluator))
            .with_evaluator(Arc::new(BalanceGateEvaluator::held(balances.clone())))
            .with_evaluator(Arc::new(BalanceGateEvaluator::staked(balances.clone())))
            .with_evaluator(Arc::new(MembershipGateEvaluator::new(membership)))
            .with_evaluator(Arc::new(UserAllowListEvaluator))
            .with_evaluator(Arc::new(WalletAllowListEvaluator))
            .with_evaluator(Arc::new(ContractHoldingEvaluator::new(balances)))
    }

    /// Register `evaluator`, replacing any evaluator already registered for its type.
    #[must_use]
    pub fn with_evaluator(mut self, evaluator: Arc<dyn GateEvaluator>) -> Self {
        self.evaluators.insert(evaluator.gating_type(), evaluator);
        self
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Evaluate `gate` for the shopper in `ctx`.
    ///
    /// Never fails: a missing evaluator, a failed lookup or a timeout all produce an
    /// unsatisfied outcome.
    pub async fn evaluate(&self, gate: &Gate, ctx: &EligibilityContext) -> GateOutcome {
        let gating_type = gate.gating_type();

        let Some(evaluator) = self.evaluators.get(&gating_type) else {
            warn!(gating_type = %gating_type, "no evaluator registered; gate not satisfied");

            return GateOutcome::unsatisfied(GateDetail::LookupFailed {
                reason: format!("no evaluator for {gating_type}"),
            });
        };

        match tokio::time::timeout(self.timeout, evaluator.evaluate(gate, ctx)).await {
            Ok(outcome) => {
                debug!(
                    gating_type = %gating_type,
                    user_fid = %ctx.user,
                    satisfied = outcome.satisfied,
                    "evaluated gate"
                );

                outcome
            }
            Err(_elapsed) => {
                warn!(
                    gating_type = %gating_type,
                    user_fid = %ctx.user,
                    timeout_ms = self.timeout.as_millis(),
                    "gate evaluation timed out; gate not satisfied"
                );

                GateOutcome::unsatisfied(GateDetail::TimedOut)
            }
        }
    }
}
