//! Discount Store
//!
//! Persistence for codes and the usage ledger. [`DiscountStore::commit_usage`] is the only
//! operation that records a redemption: it re-checks the order, the total cap and the
//! per-user cap while holding the code's row lock, so concurrent redemptions of the same
//! code are serialised and caps cannot be overshot.

use async_trait::async_trait;
use jiff::Timestamp;
use mockall::automock;
use perkshop::{
    eligibility::IneligibleReason,
    ids::{CodeName, Fid, OrderId},
};
use tracing::{Span, info};

use crate::{
    database::Db,
    domain::discounts::{
        DiscountsStoreError,
        data::{CommitOutcome, NewDiscountCode, NewUsage},
        records::{DiscountCodeRecord, DiscountCodeUuid, UsageRecord},
        repositories::{PgCodesRepository, PgUsagesRepository},
    },
};

#[derive(Debug, Clone)]
pub struct PgDiscountStore {
    db: Db,
    codes: PgCodesRepository,
    usages: PgUsagesRepository,
}

impl PgDiscountStore {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            codes: PgCodesRepository::new(),
            usages: PgUsagesRepository::new(),
        }
    }

    /// Resolve a unique violation raised while inserting `usage`.
    ///
    /// The original transaction is gone by now, so this reads the committed winner.
    async fn resolve_conflict(&self, usage: &NewUsage) -> Result<CommitOutcome, DiscountsStoreError> {
        let mut tx = self.db.begin().await?;

        let existing = self
            .usages
            .find_by_order(&mut tx, usage.discount_code_uuid, &usage.order_id)
            .await?;

        tx.commit().await?;

        Ok(match existing {
            Some(record) if record.user == usage.user => CommitOutcome::Replayed(record),
            _ => CommitOutcome::Rejected(IneligibleReason::AlreadyUsed),
        })
    }
}

#[async_trait]
impl DiscountStore for PgDiscountStore {
    async fn find_code(
        &self,
        code: &CodeName,
    ) -> Result<Option<DiscountCodeRecord>, DiscountsStoreError> {
        let mut tx = self.db.begin().await?;

        let record = self.codes.find_code(&mut tx, code).await?;

        tx.commit().await?;

        Ok(record)
    }

    async fn find_welcome_code(
        &self,
        user: Fid,
    ) -> Result<Option<DiscountCodeRecord>, DiscountsStoreError> {
        let mut tx = self.db.begin().await?;

        let record = self.codes.find_welcome_code(&mut tx, user).await?;

        tx.commit().await?;

        Ok(record)
    }

    async fn owned_codes(&self, user: Fid) -> Result<Vec<DiscountCodeRecord>, DiscountsStoreError> {
        let mut tx = self.db.begin().await?;

        let records = self.codes.list_owned_codes(&mut tx, user).await?;

        tx.commit().await?;

        Ok(records)
    }

    async fn auto_apply_codes(
        &self,
        point_in_time: Timestamp,
    ) -> Result<Vec<DiscountCodeRecord>, DiscountsStoreError> {
        let mut tx = self.db.begin().await?;

        let records = self
            .codes
            .list_auto_apply_codes(&mut tx, point_in_time)
            .await?;

        tx.commit().await?;

        Ok(records)
    }

    #[tracing::instrument(
        name = "discounts.store.create_code",
        skip(self, code),
        fields(
            code_uuid = %code.uuid,
            code = %code.code.name,
            gating_type = %code.code.gate.gating_type()
        ),
        err
    )]
    async fn create_code(
        &self,
        code: NewDiscountCode,
    ) -> Result<DiscountCodeRecord, DiscountsStoreError> {
        let mut tx = self.db.begin().await?;

        let record = self.codes.create_code(&mut tx, code).await?;

        tx.commit().await?;

        info!(code_uuid = %record.uuid, code = %record.code.name, "created discount code");

        Ok(record)
    }

    #[tracing::instrument(
        name = "discounts.store.set_active",
        skip(self, code),
        fields(code = %code),
        err
    )]
    async fn set_active(
        &self,
        code: &CodeName,
        active: bool,
    ) -> Result<DiscountCodeRecord, DiscountsStoreError> {
        let mut tx = self.db.begin().await?;

        let record = self.codes.set_active(&mut tx, code, active).await?;

        tx.commit().await?;

        info!(code_uuid = %record.uuid, active, "updated discount code state");

        Ok(record)
    }

    async fn count_user_uses(
        &self,
        code: DiscountCodeUuid,
        user: Fid,
    ) -> Result<u32, DiscountsStoreError> {
        let mut tx = self.db.begin().await?;

        let count = self.usages.count_user_uses(&mut tx, code, user).await?;

        tx.commit().await?;

        Ok(count)
    }

    async fn find_usage_by_order(
        &self,
        code: DiscountCodeUuid,
        order: &OrderId,
    ) -> Result<Option<UsageRecord>, DiscountsStoreError> {
        let mut tx = self.db.begin().await?;

        let usage = self.usages.find_by_order(&mut tx, code, order).await?;

        tx.commit().await?;

        Ok(usage)
    }

    async fn usages_for_code(
        &self,
        code: DiscountCodeUuid,
    ) -> Result<Vec<UsageRecord>, DiscountsStoreError> {
        let mut tx = self.db.begin().await?;

        let usages = self.usages.list_for_code(&mut tx, code).await?;

        tx.commit().await?;

        Ok(usages)
    }

    #[tracing::instrument(
        name = "discounts.store.commit_usage",
        skip(self, usage),
        fields(
            code_uuid = %usage.discount_code_uuid,
            user_fid = %usage.user,
            order_id = %usage.order_id,
            user_slot = tracing::field::Empty,
            outcome = tracing::field::Empty
        ),
        err
    )]
    async fn commit_usage(&self, usage: NewUsage) -> Result<CommitOutcome, DiscountsStoreError> {
        let span = Span::current();

        let mut tx = self.db.begin().await?;

        let Some(locked) = self
            .codes
            .lock_code(&mut tx, usage.discount_code_uuid)
            .await?
        else {
            span.record("outcome", "not_found");
            return Ok(CommitOutcome::Rejected(IneligibleReason::NotFound));
        };

        let code = &locked.code;

        if let Some(existing) = self
            .usages
            .find_by_order(&mut tx, usage.discount_code_uuid, &usage.order_id)
            .await?
        {
            if existing.user == usage.user {
                span.record("outcome", "replayed");
                return Ok(CommitOutcome::Replayed(existing));
            }

            span.record("outcome", "order_taken");
            return Ok(CommitOutcome::Rejected(IneligibleReason::AlreadyUsed));
        }

        if !code.active {
            span.record("outcome", "inactive");
            return Ok(CommitOutcome::Rejected(IneligibleReason::Inactive));
        }

        if code
            .policy
            .max_uses_total
            .is_some_and(|max| code.total_uses >= max)
        {
            span.record("outcome", "exhausted");
            return Ok(CommitOutcome::Rejected(IneligibleReason::Exhausted));
        }

        let prior = self
            .usages
            .count_user_uses(&mut tx, usage.discount_code_uuid, usage.user)
            .await?;

        if prior >= code.policy.max_uses_per_user {
            span.record("outcome", "already_used");
            return Ok(CommitOutcome::Rejected(IneligibleReason::AlreadyUsed));
        }

        let user_slot = prior + 1;

        span.record("user_slot", user_slot);

        let record = match self.usages.create_usage(&mut tx, &usage, user_slot).await {
            Ok(record) => record,
            Err(error) => {
                let error = DiscountsStoreError::from(error);

                if !matches!(error, DiscountsStoreError::AlreadyExists) {
                    return Err(error);
                }

                tx.rollback().await?;
                span.record("outcome", "conflict");

                return self.resolve_conflict(&usage).await;
            }
        };

        self.codes
            .increment_uses(&mut tx, usage.discount_code_uuid)
            .await?;

        tx.commit().await?;

        span.record("outcome", "recorded");

        info!(
            usage_uuid = %record.uuid,
            code_uuid = %record.discount_code_uuid,
            user_fid = %record.user,
            user_slot = record.user_slot,
            "recorded discount usage"
        );

        Ok(CommitOutcome::Recorded(record))
    }
}

#[automock]
#[async_trait]
pub trait DiscountStore: Send + Sync {
    /// Look up a code by its normalised name.
    async fn find_code(
        &self,
        code: &CodeName,
    ) -> Result<Option<DiscountCodeRecord>, DiscountsStoreError>;

    /// The welcome code issued to `user`, if any.
    async fn find_welcome_code(
        &self,
        user: Fid,
    ) -> Result<Option<DiscountCodeRecord>, DiscountsStoreError>;

    /// Active codes owned by `user`.
    async fn owned_codes(&self, user: Fid) -> Result<Vec<DiscountCodeRecord>, DiscountsStoreError>;

    /// Active auto-apply codes that have not expired at `point_in_time`.
    async fn auto_apply_codes(
        &self,
        point_in_time: Timestamp,
    ) -> Result<Vec<DiscountCodeRecord>, DiscountsStoreError>;

    async fn create_code(
        &self,
        code: NewDiscountCode,
    ) -> Result<DiscountCodeRecord, DiscountsStoreError>;

    async fn set_active(
        &self,
        code: &CodeName,
        active: bool,
    ) -> Result<DiscountCodeRecord, DiscountsStoreError>;

    /// Usage rows stored for (`code`, `user`).
    async fn count_user_uses(
        &self,
        code: DiscountCodeUuid,
        user: Fid,
    ) -> Result<u32, DiscountsStoreError>;

    async fn find_usage_by_order(
        &self,
        code: DiscountCodeUuid,
        order: &OrderId,
    ) -> Result<Option<UsageRecord>, DiscountsStoreError>;

    async fn usages_for_code(
        &self,
        code: DiscountCodeUuid,
    ) -> Result<Vec<UsageRecord>, DiscountsStoreError>;

    /// Atomically record a usage and bump the code's counter, or say why it was refused.
    async fn commit_usage(&self, usage: NewUsage) -> Result<CommitOutcome, DiscountsStoreError>;
}

#[cfg(test)]
mod tests {
    use perkshop::{
        codes::{CodeType, Ownership, Scope},
        gating::Gate,
    };
    use rust_decimal::Decimal;
    use testresult::TestResult;

    use super::*;
    use crate::{
        domain::discounts::records::UsageUuid,
        test::{
            TestContext,
            fixtures::{code, new_code, perk_token, product},
        },
    };

    fn usage(code: DiscountCodeUuid, user: u64, order: &str) -> TestResult<NewUsage> {
        Ok(NewUsage {
            uuid: UsageUuid::new(),
            discount_code_uuid: code,
            user: Fid::new(user),
            order_id: OrderId::new(order)?,
            discount_amount: Decimal::new(5_00, 2),
            original_subtotal: Decimal::new(50_00, 2),
            free_shipping: true,
        })
    }

    #[tokio::test]
    async fn created_code_round_trips() -> TestResult {
        let ctx = TestContext::new().await;

        let mut definition = code("STAKERS")?;
        definition.gate = Gate::StakingBalance {
            token: perk_token()?,
            required_balance: Decimal::from(1_000),
        };
        definition.scope = Scope::Product {
            products: [product(1)?, product(2)?].into_iter().collect(),
        };
        definition.policy.max_uses_total = Some(100);
        definition.policy.minimum_order_amount = Some(Decimal::new(25_00, 2));

        let created = ctx.store.create_code(new_code(definition.clone())).await?;

        let found = ctx
            .store
            .find_code(&definition.name)
            .await?
            .ok_or("code should exist")?;

        assert_eq!(found.uuid, created.uuid);
        assert_eq!(found.code, definition);

        Ok(())
    }

    #[tokio::test]
    async fn duplicate_names_are_rejected() -> TestResult {
        let ctx = TestContext::new().await;

        ctx.store.create_code(new_code(code("TWICE")?)).await?;

        let result = ctx.store.create_code(new_code(code("TWICE")?)).await;

        assert!(
            matches!(result, Err(DiscountsStoreError::AlreadyExists)),
            "expected AlreadyExists, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn one_welcome_code_per_user() -> TestResult {
        let ctx = TestContext::new().await;

        let mut first = code("WELCOME-AAAAAAAA")?;
        first.code_type = CodeType::Welcome;
        first.ownership = Ownership::User { owner: Fid::new(8) };

        let mut second = first.clone();
        second.name = CodeName::parse("WELCOME-BBBBBBBB")?;

        ctx.store.create_code(new_code(first)).await?;

        let result = ctx.store.create_code(new_code(second)).await;

        assert!(
            matches!(result, Err(DiscountsStoreError::AlreadyExists)),
            "expected AlreadyExists, got {result:?}"
        );

        assert!(
            ctx.store.find_welcome_code(Fid::new(8)).await?.is_some(),
            "welcome code should be found by owner"
        );

        Ok(())
    }

    #[tokio::test]
    async fn set_active_unknown_code_is_not_found() -> TestResult {
        let ctx = TestContext::new().await;

        let result = ctx
            .store
            .set_active(&CodeName::parse("NOPE")?, false)
            .await;

        assert!(
            matches!(result, Err(DiscountsStoreError::NotFound)),
            "expected NotFound, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn commit_records_usage_and_counts_it() -> TestResult {
        let ctx = TestContext::new().await;

        let created = ctx.store.create_code(new_code(code("ONCE")?)).await?;

        let outcome = ctx.store.commit_usage(usage(created.uuid, 1, "order-1")?).await?;

        let CommitOutcome::Recorded(recorded) = outcome else {
            return Err(format!("expected Recorded, got {outcome:?}").into());
        };

        assert_eq!(recorded.user_slot, 1);
        assert_eq!(recorded.discount_amount, Decimal::new(5_00, 2));
        assert!(recorded.free_shipping, "free shipping is kept on the usage");
        assert_eq!(ctx.store.count_user_uses(created.uuid, Fid::new(1)).await?, 1);

        let refreshed = ctx
            .store
            .find_code(&created.code.name)
            .await?
            .ok_or("code should exist")?;

        assert_eq!(refreshed.code.total_uses, 1);

        Ok(())
    }

    #[tokio::test]
    async fn same_order_is_replayed_not_recounted() -> TestResult {
        let ctx = TestContext::new().await;

        let created = ctx.store.create_code(new_code(code("REPLAY")?)).await?;

        ctx.store.commit_usage(usage(created.uuid, 1, "order-9")?).await?;

        let again = ctx.store.commit_usage(usage(created.uuid, 1, "order-9")?).await?;

        assert!(
            matches!(again, CommitOutcome::Replayed(_)),
            "expected Replayed, got {again:?}"
        );

        let stolen = ctx.store.commit_usage(usage(created.uuid, 2, "order-9")?).await?;

        assert_eq!(stolen, CommitOutcome::Rejected(IneligibleReason::AlreadyUsed));
        assert_eq!(ctx.store.usages_for_code(created.uuid).await?.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn caps_are_enforced_under_the_lock() -> TestResult {
        let ctx = TestContext::new().await;

        let mut definition = code("TWOTOTAL")?;
        definition.policy.max_uses_total = Some(2);

        let created = ctx.store.create_code(new_code(definition)).await?;

        ctx.store.commit_usage(usage(created.uuid, 1, "a")?).await?;

        let second_for_user = ctx.store.commit_usage(usage(created.uuid, 1, "b")?).await?;

        assert_eq!(
            second_for_user,
            CommitOutcome::Rejected(IneligibleReason::AlreadyUsed)
        );

        ctx.store.commit_usage(usage(created.uuid, 2, "c")?).await?;

        let over_cap = ctx.store.commit_usage(usage(created.uuid, 3, "d")?).await?;

        assert_eq!(over_cap, CommitOutcome::Rejected(IneligibleReason::Exhausted));

        Ok(())
    }

    #[tokio::test]
    async fn concurrent_commits_for_one_user_record_once() -> TestResult {
        let ctx = TestContext::new().await;

        let created = ctx.store.create_code(new_code(code("RACE")?)).await?;

        let (left, right) = tokio::join!(
            ctx.store.commit_usage(usage(created.uuid, 4, "left")?),
            ctx.store.commit_usage(usage(created.uuid, 4, "right")?),
        );

        let outcomes = [left?, right?];

        let recorded = outcomes
            .iter()
            .filter(|outcome| matches!(outcome, CommitOutcome::Recorded(_)))
            .count();

        assert_eq!(recorded, 1, "exactly one commit should win: {outcomes:?}");
        assert!(
            outcomes
                .iter()
                .any(|outcome| *outcome == CommitOutcome::Rejected(IneligibleReason::AlreadyUsed)),
            "the loser should see AlreadyUsed: {outcomes:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn usage_rows_are_append_only() -> TestResult {
        let ctx = TestContext::new().await;

        let created = ctx.store.create_code(new_code(code("LEDGER")?)).await?;

        ctx.store.commit_usage(usage(created.uuid, 1, "order-1")?).await?;

        let result = sqlx::query("UPDATE discount_usages SET discount_amount = 0")
            .execute(ctx.db.pool())
            .await;

        assert!(result.is_err(), "usage rows must not be updated");

        Ok(())
    }
}
