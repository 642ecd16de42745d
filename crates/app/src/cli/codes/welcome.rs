use clap::Args;
use perkshop::ids::Fid;

use crate::cli::ServiceArgs;

#[derive(Debug, Args)]
pub(crate) struct WelcomeCodeArgs {
    #[command(flatten)]
    services: ServiceArgs,

    /// User to issue the code to
    #[arg(long)]
    fid: Fid,
}

pub(crate) async fn run(args: WelcomeCodeArgs) -> Result<(), String> {
    let context = args.services.context().await?;

    let record = context
        .admin
        .generate_welcome_code(args.fid)
        .await
        .map_err(|error| format!("failed to issue welcome code: {error}"))?;

    super::print_code(&record);

    Ok(())
}
