use clap::Args;
use perkshop::ids::{CodeName, Fid, ProductId};
use rust_decimal::Decimal;

use crate::cli::ServiceArgs;

#[derive(Debug, Args)]
pub(crate) struct EligibleArgs {
    #[command(flatten)]
    services: ServiceArgs,

    /// Shopper's FID
    #[arg(long)]
    fid: Fid,

    /// Products in the cart
    #[arg(long = "product")]
    products: Vec<ProductId>,

    /// Cart subtotal
    #[arg(long)]
    subtotal: Decimal,

    /// Code the shopper typed in
    #[arg(long)]
    code: Option<CodeName>,
}

pub(crate) async fn run(args: EligibleArgs) -> Result<(), String> {
    let context = args.services.context().await?;
    let discounts = &context.discounts;

    let ctx = discounts
        .context_for(args.fid, args.products, args.subtotal)
        .await;

    if let Some(code) = &args.code {
        let verdict = discounts
            .validate_code(code, &ctx)
            .await
            .map_err(|error| format!("failed to validate code: {error}"))?;

        match verdict.reason {
            None => println!("{code}: valid"),
            Some(reason) => println!("{code}: {}", reason.user_message()),
        }

        println!();
    }

    let eligible = discounts
        .list_eligible(&ctx, args.code)
        .await
        .map_err(|error| format!("failed to list eligible codes: {error}"))?;

    if eligible.is_empty() {
        println!("no eligible codes for user {}", args.fid);
        return Ok(());
    }

    for (index, candidate) in eligible.iter().enumerate() {
        println!(
            "{marker} {code} {kind} {value} -> {amount}{shipping}",
            marker = if index == 0 { "*" } else { " " },
            code = candidate.code.name,
            kind = candidate.code.kind,
            value = candidate.code.value,
            amount = candidate.amount.amount,
            shipping = if candidate.amount.free_shipping {
                " +free shipping"
            } else {
                ""
            },
        );
    }

    Ok(())
}
