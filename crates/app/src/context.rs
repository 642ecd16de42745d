//! App Context

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::{
    config::{DatabaseConfig, GatingConfig, WelcomeConfig},
    database::{self, Db},
    domain::{
        discounts::{DiscountAdmin, DiscountAdminService, DiscountStore, PgDiscountStore},
        eligibility::ValidityChecker,
        gating::{BalanceSource, GatingEvaluator, HttpBalanceSource, UnconfiguredBalanceSource},
        profiles::{PgMembershipSource, PgWalletResolver},
    },
    engine::{DiscountEngine, DiscountsService},
};

#[derive(Debug, Error)]
pub enum AppInitError {
    #[error("failed to connect to database")]
    Database(#[source] sqlx::Error),
}

/// Services wired against Postgres and the configured gate sources.
#[derive(Clone)]
pub struct AppContext {
    pub discounts: Arc<dyn DiscountsService>,
    pub admin: Arc<dyn DiscountAdmin>,
}

impl AppContext {
    /// Build application context from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error when establishing a database connection fails.
    pub async fn from_config(
        database: &DatabaseConfig,
        gating: &GatingConfig,
        welcome: &WelcomeConfig,
    ) -> Result<Self, AppInitError> {
        let pool = database::connect(&database.database_url)
            .await
            .map_err(AppInitError::Database)?;

        Ok(Self::from_db(Db::new(pool), gating, welcome))
    }

    #[must_use]
    pub fn from_db(db: Db, gating: &GatingConfig, welcome: &WelcomeConfig) -> Self {
        let balances: Arc<dyn BalanceSource> = match gating.balance_api() {
            Some(config) => {
                info!(url = %config.url, "using token balance service");

                Arc::new(HttpBalanceSource::new(config))
            }
            None => {
                warn!("no balance service configured; token and staking gates will fail closed");

                Arc::new(UnconfiguredBalanceSource)
            }
        };

        let store: Arc<dyn DiscountStore> = Arc::new(PgDiscountStore::new(db.clone()));

        let evaluator = GatingEvaluator::new(
            balances,
            Arc::new(PgMembershipSource::new(db.clone())),
            gating.timeout(),
        );

        let engine = DiscountEngine::new(
            store.clone(),
            ValidityChecker::new(store.clone(), Arc::new(evaluator)),
            Arc::new(PgWalletResolver::new(db)),
        );

        Self {
            discounts: Arc::new(engine),
            admin: Arc::new(DiscountAdminService::new(store, welcome.into())),
        }
    }
}
