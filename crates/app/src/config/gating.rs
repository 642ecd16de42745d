//! Gating Config

use std::time::Duration;

use clap::Args;

use crate::domain::gating::BalanceApiConfig;

/// Settings for the external sources gate evaluation depends on.
#[derive(Debug, Args)]
pub struct GatingConfig {
    /// Base URL of the token balance service; balance gates fail closed when unset
    #[arg(long, env = "BALANCE_API_URL")]
    pub balance_api_url: Option<String>,

    /// API key sent to the token balance service
    #[arg(long, env = "BALANCE_API_KEY", hide_env_values = true)]
    pub balance_api_key: Option<String>,

    /// Upper bound on a single gate evaluation, in milliseconds
    #[arg(long, env = "GATING_TIMEOUT_MS", default_value_t = 3_000_u64)]
    pub gating_timeout_ms: u64,
}

impl GatingConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.gating_timeout_ms)
    }

    /// Balance service settings, when a URL is configured.
    #[must_use]
    pub fn balance_api(&self) -> Option<BalanceApiConfig> {
        self.balance_api_url
            .as_ref()
            .filter(|url| !url.trim().is_empty())
            .map(|url| BalanceApiConfig {
                url: url.clone(),
                api_key: self.balance_api_key.clone(),
            })
    }
}
