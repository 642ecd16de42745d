use clap::Args;
use jiff::Timestamp;
use perkshop::{
    codes::{CodeType, DiscountCode, DiscountKind, Ownership, Scope, UsagePolicy},
    gating::Gate,
    ids::{CodeName, Fid, ProductId},
};
use perkshop_app::domain::discounts::{
    data::NewDiscountCode, records::DiscountCodeUuid,
};
use rust_decimal::Decimal;

use crate::cli::ServiceArgs;

#[derive(Debug, Args)]
pub(crate) struct CreateCodeArgs {
    #[command(flatten)]
    services: ServiceArgs,

    /// Code shoppers type in; stored upper-cased
    #[arg(long)]
    code: CodeName,

    /// `percentage` or `fixed`
    #[arg(long, default_value = "percentage")]
    kind: DiscountKind,

    /// Percentage points or currency amount
    #[arg(long)]
    value: Decimal,

    /// Informational category, e.g. promotional, referral or club
    #[arg(long, default_value = "promotional")]
    code_type: CodeType,

    /// Restrict the code to carts containing one of these products
    #[arg(long = "product")]
    products: Vec<ProductId>,

    /// Make the code usable only by this user
    #[arg(long)]
    owner_fid: Option<Fid>,

    /// Gate as JSON, e.g. '{"type":"club_membership"}'
    #[arg(long)]
    gate: Option<String>,

    /// Maximum redemptions across all users
    #[arg(long)]
    max_uses_total: Option<u32>,

    /// Maximum redemptions per user
    #[arg(long, default_value_t = 1_u32)]
    max_uses_per_user: u32,

    /// Expiry instant, e.g. 2026-12-31T23:59:59Z
    #[arg(long)]
    expires_at: Option<Timestamp>,

    /// Minimum cart subtotal
    #[arg(long)]
    minimum_order_amount: Option<Decimal>,

    #[arg(long)]
    free_shipping: bool,

    /// Offer the code without the shopper typing it in
    #[arg(long)]
    auto_apply: bool,

    /// Tie-breaker between otherwise equal codes; higher wins
    #[arg(long, default_value_t = 0_i32, allow_negative_numbers = true)]
    priority_level: i32,

    /// Create the code switched off
    #[arg(long)]
    inactive: bool,
}

pub(crate) async fn run(args: CreateCodeArgs) -> Result<(), String> {
    let gate = match args.gate.as_deref() {
        Some(json) => serde_json::from_str::<Gate>(json)
            .map_err(|error| format!("invalid gate: {error}"))?,
        None => Gate::None,
    };

    let scope = if args.products.is_empty() {
        Scope::SiteWide
    } else {
        Scope::Product {
            products: args.products.into_iter().collect(),
        }
    };

    let ownership = args
        .owner_fid
        .map_or(Ownership::Shared, |owner| Ownership::User { owner });

    let code = DiscountCode {
        name: args.code,
        kind: args.kind,
        value: args.value,
        code_type: args.code_type,
        scope,
        ownership,
        gate,
        policy: UsagePolicy {
            max_uses_total: args.max_uses_total,
            max_uses_per_user: args.max_uses_per_user,
            expires_at: args.expires_at,
            minimum_order_amount: args.minimum_order_amount,
        },
        total_uses: 0,
        free_shipping: args.free_shipping,
        auto_apply: args.auto_apply,
        priority_level: args.priority_level,
        active: !args.inactive,
    };

    let context = args.services.context().await?;

    let record = context
        .admin
        .create_code(NewDiscountCode {
            uuid: DiscountCodeUuid::new(),
            code,
        })
        .await
        .map_err(|error| format!("failed to create code: {error}"))?;

    super::print_code(&record);

    Ok(())
}
