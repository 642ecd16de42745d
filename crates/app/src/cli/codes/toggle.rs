use clap::Args;
use perkshop::ids::CodeName;

use crate::cli::ServiceArgs;

#[derive(Debug, Args)]
pub(crate) struct ToggleCodeArgs {
    #[command(flatten)]
    services: ServiceArgs,

    #[arg(long)]
    code: CodeName,
}

pub(crate) async fn run(args: ToggleCodeArgs, active: bool) -> Result<(), String> {
    let context = args.services.context().await?;

    let record = context
        .admin
        .set_active(&args.code, active)
        .await
        .map_err(|error| format!("failed to update code: {error}"))?;

    println!("code: {}", record.code.name);
    println!("active: {}", record.code.active);

    Ok(())
}
