//! Discount administration: code creation, activation and welcome codes.

use std::sync::Arc;

use async_trait::async_trait;
use jiff::{SignedDuration, Timestamp};
use mockall::automock;
use perkshop::{
    codes::{CodeError, CodeType, DiscountCode, DiscountKind, Ownership, Scope, UsagePolicy},
    gating::Gate,
    ids::{CodeName, Fid, IdError},
};
use rand::Rng;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{Span, info};

use crate::domain::discounts::{
    DiscountsStoreError,
    data::NewDiscountCode,
    records::{DiscountCodeRecord, DiscountCodeUuid, UsageRecord},
    store::DiscountStore,
};

const WELCOME_PREFIX: &str = "WELCOME-";
const WELCOME_SUFFIX_LEN: usize = 8;
const WELCOME_NAME_ATTEMPTS: usize = 3;

// No 0/O or 1/I, so codes survive being read aloud.
const WELCOME_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

#[derive(Debug, Error)]
pub enum DiscountAdminError {
    #[error("discount code not found")]
    NotFound,

    #[error("invalid discount code: {0}")]
    Invalid(#[from] CodeError),

    #[error("invalid code name: {0}")]
    InvalidName(#[from] IdError),

    #[error("could not compute welcome code expiry")]
    Expiry(#[source] jiff::Error),

    #[error("welcome codes must stay valid for at least one day")]
    NoWelcomeLifetime,

    #[error("could not allocate a unique welcome code name")]
    NameCollision,

    #[error(transparent)]
    Store(#[from] DiscountsStoreError),
}

/// Terms of the code every new user receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WelcomeSettings {
    pub percentage: Decimal,
    pub valid_for_days: u32,
}

impl Default for WelcomeSettings {
    fn default() -> Self {
        Self {
            percentage: Decimal::from(15),
            valid_for_days: 30,
        }
    }
}

#[derive(Clone)]
pub struct DiscountAdminService {
    store: Arc<dyn DiscountStore>,
    welcome: WelcomeSettings,
}

impl std::fmt::Debug for DiscountAdminService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscountAdminService")
            .field("welcome", &self.welcome)
            .finish_non_exhaustive()
    }
}

impl DiscountAdminService {
    #[must_use]
    pub fn new(store: Arc<dyn DiscountStore>, welcome: WelcomeSettings) -> Self {
        Self { store, welcome }
    }

    fn welcome_code(&self, user: Fid) -> Result<DiscountCode, DiscountAdminError> {
        if self.welcome.valid_for_days == 0 {
            return Err(DiscountAdminError::NoWelcomeLifetime);
        }

        let lifetime = SignedDuration::from_hours(i64::from(self.welcome.valid_for_days) * 24);

        let expires_at = Timestamp::now()
            .checked_add(lifetime)
            .map_err(DiscountAdminError::Expiry)?;

        let code = DiscountCode {
            name: CodeName::parse(&welcome_code_name())?,
            kind: DiscountKind::Percentage,
            value: self.welcome.percentage,
            code_type: CodeType::Welcome,
            scope: Scope::SiteWide,
            ownership: Ownership::User { owner: user },
            gate: Gate::None,
            policy: UsagePolicy {
                max_uses_total: Some(1),
                max_uses_per_user: 1,
                expires_at: Some(expires_at),
                minimum_order_amount: None,
            },
            total_uses: 0,
            free_shipping: false,
            auto_apply: false,
            priority_level: 0,
            active: true,
        };

        code.validate()?;

        Ok(code)
    }
}

fn welcome_code_name() -> String {
    let mut rng = rand::thread_rng();

    let suffix: String = (0..WELCOME_SUFFIX_LEN)
        .filter_map(|_| {
            let index = rng.gen_range(0..WELCOME_ALPHABET.len());
            WELCOME_ALPHABET.get(index).copied().map(char::from)
        })
        .collect();

    format!("{WELCOME_PREFIX}{suffix}")
}

#[async_trait]
impl DiscountAdmin for DiscountAdminService {
    async fn create_code(
        &self,
        code: NewDiscountCode,
    ) -> Result<DiscountCodeRecord, DiscountAdminError> {
        code.code.validate()?;

        Ok(self.store.create_code(code).await?)
    }

    async fn set_active(
        &self,
        code: &CodeName,
        active: bool,
    ) -> Result<DiscountCodeRecord, DiscountAdminError> {
        match self.store.set_active(code, active).await {
            Ok(record) => Ok(record),
            Err(DiscountsStoreError::NotFound) => Err(DiscountAdminError::NotFound),
            Err(error) => Err(error.into()),
        }
    }

    #[tracing::instrument(
        name = "discounts.admin.generate_welcome_code",
        skip(self),
        fields(user_fid = %user, code = tracing::field::Empty, existing = tracing::field::Empty),
        err
    )]
    async fn generate_welcome_code(
        &self,
        user: Fid,
    ) -> Result<DiscountCodeRecord, DiscountAdminError> {
        let span = Span::current();

        if let Some(existing) = self.store.find_welcome_code(user).await? {
            span.record("existing", true);
            span.record("code", tracing::field::display(&existing.code.name));

            return Ok(existing);
        }

        for _ in 0..WELCOME_NAME_ATTEMPTS {
            let code = NewDiscountCode {
                uuid: DiscountCodeUuid::new(),
                code: self.welcome_code(user)?,
            };

            match self.store.create_code(code).await {
                Ok(record) => {
                    span.record("existing", false);
                    span.record("code", tracing::field::display(&record.code.name));

                    info!(code_uuid = %record.uuid, "issued welcome code");

                    return Ok(record);
                }
                Err(DiscountsStoreError::AlreadyExists) => {
                    // Either a concurrent request issued this user's code, or the name clashed.
                    if let Some(existing) = self.store.find_welcome_code(user).await? {
                        span.record("existing", true);
                        span.record("code", tracing::field::display(&existing.code.name));

                        return Ok(existing);
                    }
                }
                Err(error) => return Err(error.into()),
            }
        }

        Err(DiscountAdminError::NameCollision)
    }

    async fn get_code(&self, code: &CodeName) -> Result<DiscountCodeRecord, DiscountAdminError> {
        self.store
            .find_code(code)
            .await?
            .ok_or(DiscountAdminError::NotFound)
    }

    async fn usage_history(&self, code: &CodeName) -> Result<Vec<UsageRecord>, DiscountAdminError> {
        let record = self.get_code(code).await?;

        Ok(self.store.usages_for_code(record.uuid).await?)
    }
}

#[automock]
#[async_trait]
pub trait DiscountAdmin: Send + Sync {
    /// Validate and store a new code.
    async fn create_code(
        &self,
        code: NewDiscountCode,
    ) -> Result<DiscountCodeRecord, DiscountAdminError>;

    /// Switch a code on or off.
    async fn set_active(
        &self,
        code: &CodeName,
        active: bool,
    ) -> Result<DiscountCodeRecord, DiscountAdminError>;

    /// Issue `user`'s welcome code, or return the one they already have.
    async fn generate_welcome_code(
        &self,
        user: Fid,
    ) -> Result<DiscountCodeRecord, DiscountAdminError>;

    async fn get_code(&self, code: &CodeName) -> Result<DiscountCodeRecord, DiscountAdminError>;

    /// Every recorded use of `code`, oldest first.
    async fn usage_history(&self, code: &CodeName) -> Result<Vec<UsageRecord>, DiscountAdminError>;
}
