use clap::Args;
use perkshop::ids::CodeName;

use crate::cli::ServiceArgs;

#[derive(Debug, Args)]
pub(crate) struct ShowCodeArgs {
    #[command(flatten)]
    services: ServiceArgs,

    #[arg(long)]
    code: CodeName,

    /// Also list every recorded use
    #[arg(long)]
    usages: bool,
}

pub(crate) async fn run(args: ShowCodeArgs) -> Result<(), String> {
    let context = args.services.context().await?;

    let record = context
        .admin
        .get_code(&args.code)
        .await
        .map_err(|error| format!("failed to load code: {error}"))?;

    super::print_code(&record);

    if !args.usages {
        return Ok(());
    }

    let usages = context
        .admin
        .usage_history(&args.code)
        .await
        .map_err(|error| format!("failed to load usages: {error}"))?;

    if usages.is_empty() {
        println!("no recorded uses");
        return Ok(());
    }

    for usage in usages {
        println!();
        println!("usage_uuid: {}", usage.uuid);
        println!("user_fid: {}", usage.user);
        println!("order_id: {}", usage.order_id);
        println!("discount_amount: {}", usage.discount_amount);
        println!("original_subtotal: {}", usage.original_subtotal);
        println!("used_at: {}", usage.used_at);
    }

    Ok(())
}
