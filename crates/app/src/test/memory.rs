//! In-memory discount store.
//!
//! Reads yield to the runtime before touching state so that concurrent callers interleave
//! the way they would against a database. `commit_usage` runs under one lock with no await
//! points, mirroring the row lock the `PostgreSQL` store takes.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use jiff::Timestamp;
use perkshop::{
    codes::CodeType,
    eligibility::IneligibleReason,
    ids::{CodeName, Fid, OrderId},
};

use crate::domain::discounts::{
    DiscountStore, DiscountsStoreError,
    data::{CommitOutcome, NewDiscountCode, NewUsage},
    records::{DiscountCodeRecord, DiscountCodeUuid, UsageRecord},
};

#[derive(Debug, Default)]
struct State {
    codes: Vec<DiscountCodeRecord>,
    usages: Vec<UsageRecord>,
}

#[derive(Debug, Default)]
pub(crate) struct InMemoryDiscountStore {
    state: Mutex<State>,
}

impl InMemoryDiscountStore {
    pub(crate) fn with_codes(codes: impl IntoIterator<Item = DiscountCodeRecord>) -> Self {
        Self {
            state: Mutex::new(State {
                codes: codes.into_iter().collect(),
                usages: Vec::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("in-memory store lock poisoned")
    }

    /// Current copy of a stored code.
    pub(crate) fn code(&self, uuid: DiscountCodeUuid) -> Option<DiscountCodeRecord> {
        self.state()
            .codes
            .iter()
            .find(|record| record.uuid == uuid)
            .cloned()
    }

    pub(crate) fn usage_count(&self) -> usize {
        self.state().usages.len()
    }
}

fn count(usages: &[UsageRecord], code: DiscountCodeUuid, user: Fid) -> u32 {
    let count = usages
        .iter()
        .filter(|usage| usage.discount_code_uuid == code && usage.user == user)
        .count();

    u32::try_from(count).unwrap_or(u32::MAX)
}

#[async_trait]
impl DiscountStore for InMemoryDiscountStore {
    async fn find_code(
        &self,
        code: &CodeName,
    ) -> Result<Option<DiscountCodeRecord>, DiscountsStoreError> {
        tokio::task::yield_now().await;

        Ok(self
            .state()
            .codes
            .iter()
            .find(|record| &record.code.name == code)
            .cloned())
    }

    async fn find_welcome_code(
        &self,
        user: Fid,
    ) -> Result<Option<DiscountCodeRecord>, DiscountsStoreError> {
        tokio::task::yield_now().await;

        Ok(self
            .state()
            .codes
            .iter()
            .find(|record| {
                record.code.code_type == CodeType::Welcome
                    && record.code.ownership.owner() == Some(user)
            })
            .cloned())
    }

    async fn owned_codes(&self, user: Fid) -> Result<Vec<DiscountCodeRecord>, DiscountsStoreError> {
        tokio::task::yield_now().await;

        Ok(self
            .state()
            .codes
            .iter()
            .filter(|record| record.code.active && record.code.ownership.owner() == Some(user))
            .cloned()
            .collect())
    }

    async fn auto_apply_codes(
        &self,
        point_in_time: Timestamp,
    ) -> Result<Vec<DiscountCodeRecord>, DiscountsStoreError> {
        tokio::task::yield_now().await;

        Ok(self
            .state()
            .codes
            .iter()
            .filter(|record| {
                record.code.auto_apply
                    && record.code.active
                    && !record.code.is_expired_at(point_in_time)
            })
            .cloned()
            .collect())
    }

    async fn create_code(
        &self,
        code: NewDiscountCode,
    ) -> Result<DiscountCodeRecord, DiscountsStoreError> {
        tokio::task::yield_now().await;

        let mut state = self.state();

        let welcome_taken = code.code.code_type == CodeType::Welcome
            && state.codes.iter().any(|record| {
                record.code.code_type == CodeType::Welcome
                    && record.code.ownership.owner() == code.code.ownership.owner()
            });

        if welcome_taken
            || state
                .codes
                .iter()
                .any(|record| record.uuid == code.uuid || record.code.name == code.code.name)
        {
            return Err(DiscountsStoreError::AlreadyExists);
        }

        let now = Timestamp::now();

        let mut stored = code.code;
        stored.total_uses = 0;

        let record = DiscountCodeRecord {
            uuid: code.uuid,
            code: stored,
            created_at: now,
            updated_at: now,
        };

        state.codes.push(record.clone());

        Ok(record)
    }

    async fn set_active(
        &self,
        code: &CodeName,
        active: bool,
    ) -> Result<DiscountCodeRecord, DiscountsStoreError> {
        tokio::task::yield_now().await;

        let mut state = self.state();

        let record = state
            .codes
            .iter_mut()
            .find(|record| &record.code.name == code)
            .ok_or(DiscountsStoreError::NotFound)?;

        record.code.active = active;
        record.updated_at = Timestamp::now();

        Ok(record.clone())
    }

    async fn count_user_uses(
        &self,
        code: DiscountCodeUuid,
        user: Fid,
    ) -> Result<u32, DiscountsStoreError> {
        tokio::task::yield_now().await;

        Ok(count(&self.state().usages, code, user))
    }

    async fn find_usage_by_order(
        &self,
        code: DiscountCodeUuid,
        order: &OrderId,
    ) -> Result<Option<UsageRecord>, DiscountsStoreError> {
        tokio::task::yield_now().await;

        Ok(self
            .state()
            .usages
            .iter()
            .find(|usage| usage.discount_code_uuid == code && &usage.order_id == order)
            .cloned())
    }

    async fn usages_for_code(
        &self,
        code: DiscountCodeUuid,
    ) -> Result<Vec<UsageRecord>, DiscountsStoreError> {
        tokio::task::yield_now().await;

        Ok(self
            .state()
            .usages
            .iter()
            .filter(|usage| usage.discount_code_uuid == code)
            .cloned()
            .collect())
    }

    async fn commit_usage(&self, usage: NewUsage) -> Result<CommitOutcome, DiscountsStoreError> {
        tokio::task::yield_now().await;

        let mut state = self.state();
        let State { codes, usages } = &mut *state;

        let Some(code) = codes
            .iter_mut()
            .find(|record| record.uuid == usage.discount_code_uuid)
        else {
            return Ok(CommitOutcome::Rejected(IneligibleReason::NotFound));
        };

        if let Some(existing) = usages.iter().find(|existing| {
            existing.discount_code_uuid == usage.discount_code_uuid
                && existing.order_id == usage.order_id
        }) {
            if existing.user == usage.user {
                return Ok(CommitOutcome::Replayed(existing.clone()));
            }

            return Ok(CommitOutcome::Rejected(IneligibleReason::AlreadyUsed));
        }

        if !code.code.active {
            return Ok(CommitOutcome::Rejected(IneligibleReason::Inactive));
        }

        if code
            .code
            .policy
            .max_uses_total
            .is_some_and(|max| code.code.total_uses >= max)
        {
            return Ok(CommitOutcome::Rejected(IneligibleReason::Exhausted));
        }

        let prior = count(usages.as_slice(), usage.discount_code_uuid, usage.user);

        if prior >= code.code.policy.max_uses_per_user {
            return Ok(CommitOutcome::Rejected(IneligibleReason::AlreadyUsed));
        }

        let record = UsageRecord {
            uuid: usage.uuid,
            discount_code_uuid: usage.discount_code_uuid,
            user: usage.user,
            user_slot: prior + 1,
            order_id: usage.order_id,
            discount_amount: usage.discount_amount,
            original_subtotal: usage.original_subtotal,
            free_shipping: usage.free_shipping,
            used_at: Timestamp::now(),
        };

        usages.push(record.clone());
        code.code.total_uses += 1;

        Ok(CommitOutcome::Recorded(record))
    }
}
