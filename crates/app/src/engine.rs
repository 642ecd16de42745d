//! Discount Engine
//!
//! The operations storefront code calls: list what a shopper can use, pick the best, and
//! redeem exactly once when an order is placed.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use mockall::automock;
use perkshop::{
    amounts::{DiscountAmount, compute_amount},
    context::EligibilityContext,
    eligibility::{IneligibleReason, Verdict},
    ids::{CodeName, Fid, OrderId, ProductId},
    selection::{EligibleDiscount, rank_candidates, select_best},
};
use rust_decimal::Decimal;
use rustc_hash::FxHashSet;
use tracing::{Span, error, info, warn};

use crate::domain::{
    discounts::{
        DiscountStore, DiscountsStoreError,
        data::{CommitOutcome, NewUsage},
        records::{DiscountCodeRecord, UsageRecord, UsageUuid},
    },
    eligibility::ValidityChecker,
    gating::WalletResolver,
    redemptions::{OrderDiscountOutcome, RedeemError, Redemption},
};

#[derive(Clone)]
pub struct DiscountEngine {
    store: Arc<dyn DiscountStore>,
    checker: ValidityChecker,
    wallets: Arc<dyn WalletResolver>,
}

impl std::fmt::Debug for DiscountEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscountEngine")
            .field("checker", &self.checker)
            .finish_non_exhaustive()
    }
}

impl DiscountEngine {
    #[must_use]
    pub fn new(
        store: Arc<dyn DiscountStore>,
        checker: ValidityChecker,
        wallets: Arc<dyn WalletResolver>,
    ) -> Self {
        Self {
            store,
            checker,
            wallets,
        }
    }

    /// Owned, supplied and auto-apply codes, each appearing once.
    async fn candidates(
        &self,
        ctx: &EligibilityContext,
        supplied: Option<CodeName>,
    ) -> Result<Vec<DiscountCodeRecord>, DiscountsStoreError> {
        let mut candidates = self.store.owned_codes(ctx.user).await?;

        if let Some(name) = supplied
            && let Some(record) = self.store.find_code(&name).await?
        {
            candidates.push(record);
        }

        candidates.extend(self.store.auto_apply_codes(ctx.evaluated_at).await?);

        let mut seen = FxHashSet::default();
        candidates.retain(|record| seen.insert(record.uuid));

        Ok(candidates)
    }

    /// Terms come from the usage row, so later edits to the code do not change a replay.
    fn replay(usage: UsageRecord) -> Redemption {
        Redemption {
            amount: DiscountAmount {
                amount: usage.discount_amount,
                free_shipping: usage.free_shipping,
            },
            usage,
            replayed: true,
        }
    }
}

#[async_trait]
impl DiscountsService for DiscountEngine {
    async fn context_for(
        &self,
        user: Fid,
        products: Vec<ProductId>,
        subtotal: Decimal,
    ) -> EligibilityContext {
        let wallets = match self.wallets.wallets(user).await {
            Ok(wallets) => wallets,
            Err(error) => {
                warn!(user_fid = %user, error = %error, "wallet resolution failed; continuing without wallets");

                Vec::new()
            }
        };

        EligibilityContext::new(user, wallets, products, subtotal)
    }

    #[tracing::instrument(
        name = "discounts.engine.list_eligible",
        skip(self, ctx, supplied),
        fields(
            user_fid = %ctx.user,
            supplied = ?supplied.as_ref().map(CodeName::as_str),
            candidate_count = tracing::field::Empty,
            eligible_count = tracing::field::Empty
        ),
        err
    )]
    async fn list_eligible(
        &self,
        ctx: &EligibilityContext,
        supplied: Option<CodeName>,
    ) -> Result<Vec<EligibleDiscount>, DiscountsStoreError> {
        let span = Span::current();

        let candidates = self.candidates(ctx, supplied).await?;

        span.record("candidate_count", candidates.len());

        let verdicts = join_all(
            candidates
                .iter()
                .map(|record| self.checker.check(record, ctx)),
        )
        .await;

        let mut eligible = Vec::new();

        for (record, verdict) in candidates.into_iter().zip(verdicts) {
            if verdict?.is_valid() {
                eligible.push(EligibleDiscount::priced(record.code, ctx.subtotal));
            }
        }

        rank_candidates(&mut eligible);

        span.record("eligible_count", eligible.len());

        Ok(eligible)
    }

    async fn validate_code(
        &self,
        code: &CodeName,
        ctx: &EligibilityContext,
    ) -> Result<Verdict, DiscountsStoreError> {
        match self.store.find_code(code).await? {
            Some(record) => self.checker.check(&record, ctx).await,
            None => Ok(Verdict::invalid(IneligibleReason::NotFound)),
        }
    }

    async fn best_discount(
        &self,
        ctx: &EligibilityContext,
        supplied: Option<CodeName>,
    ) -> Result<Option<EligibleDiscount>, DiscountsStoreError> {
        let eligible = self.list_eligible(ctx, supplied).await?;

        Ok(select_best(&eligible).cloned())
    }

    #[tracing::instrument(
        name = "discounts.engine.redeem",
        skip(self, code, ctx, order),
        fields(
            code = %code,
            user_fid = %ctx.user,
            order_id = %order,
            replayed = tracing::field::Empty
        ),
        err
    )]
    async fn redeem(
        &self,
        code: &CodeName,
        ctx: &EligibilityContext,
        order: &OrderId,
    ) -> Result<Redemption, RedeemError> {
        let span = Span::current();

        let Some(record) = self.store.find_code(code).await? else {
            return Err(IneligibleReason::NotFound.into());
        };

        if let Some(usage) = self.store.find_usage_by_order(record.uuid, order).await? {
            if usage.user != ctx.user {
                return Err(IneligibleReason::AlreadyUsed.into());
            }

            span.record("replayed", true);

            return Ok(Self::replay(usage));
        }

        self.checker.check(&record, ctx).await?.into_result()?;

        let amount = compute_amount(&record.code, ctx.subtotal);

        let outcome = self
            .store
            .commit_usage(NewUsage {
                uuid: UsageUuid::new(),
                discount_code_uuid: record.uuid,
                user: ctx.user,
                order_id: order.clone(),
                discount_amount: amount.amount,
                original_subtotal: ctx.subtotal.max(Decimal::ZERO),
                free_shipping: amount.free_shipping,
            })
            .await?;

        match outcome {
            CommitOutcome::Recorded(usage) => {
                span.record("replayed", false);

                info!(usage_uuid = %usage.uuid, amount = %amount.amount, "redeemed discount code");

                Ok(Redemption {
                    usage,
                    amount,
                    replayed: false,
                })
            }
            CommitOutcome::Replayed(usage) => {
                span.record("replayed", true);

                Ok(Self::replay(usage))
            }
            CommitOutcome::Rejected(reason) => Err(reason.into()),
        }
    }

    async fn apply_to_order(
        &self,
        code: &CodeName,
        ctx: &EligibilityContext,
        order: &OrderId,
    ) -> OrderDiscountOutcome {
        match self.redeem(code, ctx, order).await {
            Ok(redemption) => OrderDiscountOutcome::Applied(redemption),
            Err(RedeemError::Ineligible(reason)) => {
                warn!(
                    code = %code,
                    user_fid = %ctx.user,
                    order_id = %order,
                    %reason,
                    "discount not applied to order"
                );

                OrderDiscountOutcome::Skipped(reason)
            }
            Err(RedeemError::Store(store_error)) => {
                error!(
                    code = %code,
                    user_fid = %ctx.user,
                    order_id = %order,
                    error = %store_error,
                    "failed to record discount usage; order placed without discount"
                );

                OrderDiscountOutcome::Failed(store_error.to_string())
            }
        }
    }
}

#[automock]
#[async_trait]
pub trait DiscountsService: Send + Sync {
    /// Build an evaluation context for `user`, resolving their wallets.
    ///
    /// Wallet resolution failures produce an empty wallet set, so wallet-based gates fail
    /// closed instead of the request failing.
    async fn context_for(
        &self,
        user: Fid,
        products: Vec<ProductId>,
        subtotal: Decimal,
    ) -> EligibilityContext;

    /// Every code the shopper could use right now, most preferred first.
    async fn list_eligible(
        &self,
        ctx: &EligibilityContext,
        supplied: Option<CodeName>,
    ) -> Result<Vec<EligibleDiscount>, DiscountsStoreError>;

    /// Full validity check of a typed-in code.
    async fn validate_code(
        &self,
        code: &CodeName,
        ctx: &EligibilityContext,
    ) -> Result<Verdict, DiscountsStoreError>;

    /// The single preferred eligible code, if any.
    async fn best_discount(
        &self,
        ctx: &EligibilityContext,
        supplied: Option<CodeName>,
    ) -> Result<Option<EligibleDiscount>, DiscountsStoreError>;

    /// Record that `code` was used on `order`.
    ///
    /// Re-validates with fresh counts and a fresh gate evaluation. Calling again for an
    /// order that already redeemed the code returns the original usage.
    async fn redeem(
        &self,
        code: &CodeName,
        ctx: &EligibilityContext,
        order: &OrderId,
    ) -> Result<Redemption, RedeemError>;

    /// Redeem for a placed order without ever failing the order.
    async fn apply_to_order(
        &self,
        code: &CodeName,
        ctx: &EligibilityContext,
        order: &OrderId,
    ) -> OrderDiscountOutcome;
}
