use clap::Args;
use perkshop::ids::{CodeName, Fid, OrderId, ProductId};
use perkshop_app::domain::redemptions::OrderDiscountOutcome;
use rust_decimal::Decimal;

use crate::cli::ServiceArgs;

#[derive(Debug, Args)]
pub(crate) struct RedeemArgs {
    #[command(flatten)]
    services: ServiceArgs,

    #[arg(long)]
    code: CodeName,

    /// Shopper's FID
    #[arg(long)]
    fid: Fid,

    /// Order the code is applied to
    #[arg(long)]
    order_id: OrderId,

    /// Cart subtotal before the discount
    #[arg(long)]
    subtotal: Decimal,

    /// Products in the cart
    #[arg(long = "product")]
    products: Vec<ProductId>,
}

pub(crate) async fn run(args: RedeemArgs) -> Result<(), String> {
    let context = args.services.context().await?;
    let discounts = &context.discounts;

    let ctx = discounts
        .context_for(args.fid, args.products, args.subtotal)
        .await;

    match discounts
        .apply_to_order(&args.code, &ctx, &args.order_id)
        .await
    {
        OrderDiscountOutcome::Applied(redemption) => {
            println!("usage_uuid: {}", redemption.usage.uuid);
            println!("discount_amount: {}", redemption.amount.amount);
            println!("free_shipping: {}", redemption.amount.free_shipping);
            println!("replayed: {}", redemption.replayed);

            Ok(())
        }
        OrderDiscountOutcome::Skipped(reason) => {
            Err(format!("discount not applied: {}", reason.user_message()))
        }
        OrderDiscountOutcome::Failed(error) => {
            Err(format!("failed to record discount usage: {error}"))
        }
    }
}
