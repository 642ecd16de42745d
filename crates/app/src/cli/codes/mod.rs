use clap::{Args, Subcommand};
use perkshop::codes::Ownership;
use perkshop_app::domain::discounts::records::DiscountCodeRecord;

mod create;
mod show;
mod toggle;
mod welcome;

#[derive(Debug, Args)]
pub(crate) struct CodesCommand {
    #[command(subcommand)]
    command: CodesSubcommand,
}

#[derive(Debug, Subcommand)]
enum CodesSubcommand {
    /// Create a discount code
    Create(create::CreateCodeArgs),
    /// Print a discount code
    Show(show::ShowCodeArgs),
    /// Re-activate a discount code
    Enable(toggle::ToggleCodeArgs),
    /// Deactivate a discount code
    Disable(toggle::ToggleCodeArgs),
    /// Issue a user's welcome code, or print the one they already have
    Welcome(welcome::WelcomeCodeArgs),
}

pub(crate) async fn run(command: CodesCommand) -> Result<(), String> {
    match command.command {
        CodesSubcommand::Create(args) => create::run(args).await,
        CodesSubcommand::Show(args) => show::run(args).await,
        CodesSubcommand::Enable(args) => toggle::run(args, true).await,
        CodesSubcommand::Disable(args) => toggle::run(args, false).await,
        CodesSubcommand::Welcome(args) => welcome::run(args).await,
    }
}

fn print_code(record: &DiscountCodeRecord) {
    let code = &record.code;

    println!("code_uuid: {}", record.uuid);
    println!("code: {}", code.name);
    println!("kind: {}", code.kind);
    println!("value: {}", code.value);
    println!("code_type: {}", code.code_type);
    println!("scope: {}", code.scope.as_str());
    println!(
        "owner_fid: {}",
        match code.ownership {
            Ownership::Shared => "shared".to_string(),
            Ownership::User { owner } => owner.to_string(),
        }
    );
    println!("gating_type: {}", code.gate.gating_type());
    println!("uses: {}", code.total_uses);
    println!(
        "remaining_uses: {}",
        code.remaining_uses()
            .map_or_else(|| "unlimited".to_string(), |left| left.to_string())
    );
    println!("max_uses_per_user: {}", code.policy.max_uses_per_user);
    println!(
        "expires_at: {}",
        code.policy
            .expires_at
            .map_or_else(|| "never".to_string(), |value| value.to_string())
    );
    println!(
        "minimum_order_amount: {}",
        code.policy
            .minimum_order_amount
            .map_or_else(|| "none".to_string(), |value| value.to_string())
    );
    println!("free_shipping: {}", code.free_shipping);
    println!("auto_apply: {}", code.auto_apply);
    println!("priority_level: {}", code.priority_level);
    println!("active: {}", code.active);
}
