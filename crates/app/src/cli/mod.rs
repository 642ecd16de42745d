use clap::{Args, Parser, Subcommand};
use perkshop_app::{
    config::{DatabaseConfig, GatingConfig, LoggingConfig, WelcomeConfig},
    context::AppContext,
    observability,
};

mod codes;
mod db;
mod eligible;
mod redeem;

#[derive(Debug, Parser)]
#[command(name = "perkshop", about = "Perkshop discount CLI", long_about = None)]
pub(crate) struct Cli {
    #[command(flatten)]
    logging: LoggingConfig,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db(db::DbCommand),
    /// Manage discount codes
    Codes(codes::CodesCommand),
    /// List the codes a shopper can use on a cart
    Eligible(eligible::EligibleArgs),
    /// Redeem a code against an order
    Redeem(redeem::RedeemArgs),
}

impl Cli {
    pub(crate) async fn run(self) -> Result<(), String> {
        observability::init_logging(&self.logging)
            .map_err(|error| format!("failed to initialise logging: {error}"))?;

        match self.command {
            Commands::Db(command) => db::run(command).await,
            Commands::Codes(command) => codes::run(command).await,
            Commands::Eligible(args) => eligible::run(args).await,
            Commands::Redeem(args) => redeem::run(args).await,
        }
    }
}

/// Settings every command that talks to the discount services needs.
#[derive(Debug, Args)]
pub(crate) struct ServiceArgs {
    #[command(flatten)]
    database: DatabaseConfig,

    #[command(flatten)]
    gating: GatingConfig,

    #[command(flatten)]
    welcome: WelcomeConfig,
}

impl ServiceArgs {
    pub(crate) async fn context(&self) -> Result<AppContext, String> {
        AppContext::from_config(&self.database, &self.gating, &self.welcome)
            .await
            .map_err(|error| format!("failed to initialise services: {error}"))
    }
}
