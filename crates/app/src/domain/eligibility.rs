//! Validity Checker

use std::sync::Arc;

use perkshop::{
    context::EligibilityContext,
    eligibility::{Verdict, check_constraints, conclude},
};
use tracing::debug;

use crate::domain::{
    discounts::{DiscountStore, DiscountsStoreError, records::DiscountCodeRecord},
    gating::GatingEvaluator,
};

/// Runs the full ordered validity check for stored codes.
///
/// The per-user count is read from the store on every call and the gate is evaluated
/// live, so a verdict is only good for the request it was produced in.
#[derive(Clone)]
pub struct ValidityChecker {
    store: Arc<dyn DiscountStore>,
    gating: Arc<GatingEvaluator>,
}

impl std::fmt::Debug for ValidityChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidityChecker")
            .field("gating", &self.gating)
            .finish_non_exhaustive()
    }
}

impl ValidityChecker {
    #[must_use]
    pub fn new(store: Arc<dyn DiscountStore>, gating: Arc<GatingEvaluator>) -> Self {
        Self { store, gating }
    }

    /// Check `record` for the shopper and cart in `ctx`.
    ///
    /// The gate is only evaluated once every cheaper check has passed.
    ///
    /// # Errors
    ///
    /// Returns an error when the usage count cannot be read.
    pub async fn check(
        &self,
        record: &DiscountCodeRecord,
        ctx: &EligibilityContext,
    ) -> Result<Verdict, DiscountsStoreError> {
        let prior_user_uses = self.store.count_user_uses(record.uuid, ctx.user).await?;

        if let Err(reason) = check_constraints(&record.code, ctx, prior_user_uses) {
            debug!(code = %record.code.name, user_fid = %ctx.user, %reason, "code ineligible");

            return Ok(Verdict::invalid(reason));
        }

        let gate = self.gating.evaluate(&record.code.gate, ctx).await;

        let verdict = conclude(&record.code, gate);

        debug!(
            code = %record.code.name,
            user_fid = %ctx.user,
            valid = verdict.is_valid(),
            "checked code"
        );

        Ok(verdict)
    }
}
