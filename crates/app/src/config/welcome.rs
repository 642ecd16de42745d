//! Welcome Code Config

use clap::Args;
use rust_decimal::Decimal;

use crate::domain::discounts::WelcomeSettings;

/// Terms for generated welcome codes.
#[derive(Debug, Args)]
pub struct WelcomeConfig {
    /// Percentage off granted by a welcome code
    #[arg(long, env = "WELCOME_PERCENTAGE", default_value = "15")]
    pub welcome_percentage: Decimal,

    /// Days a welcome code stays valid after it is issued
    #[arg(
        long,
        env = "WELCOME_VALID_DAYS",
        default_value_t = 30_u32,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub welcome_valid_days: u32,
}

impl From<&WelcomeConfig> for WelcomeSettings {
    fn from(config: &WelcomeConfig) -> Self {
        Self {
            percentage: config.welcome_percentage,
            valid_for_days: config.welcome_valid_days,
        }
    }
}
