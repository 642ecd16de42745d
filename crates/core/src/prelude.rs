//! Prelude
//!
//! Re-exports the types most callers need.

pub use crate::{
    amounts::{DiscountAmount, compute_amount},
    codes::{CodeError, CodeType, DiscountCode, DiscountKind, Ownership, Scope, UsagePolicy},
    context::EligibilityContext,
    eligibility::{IneligibleReason, Verdict, check_constraints, conclude},
    gating::{BalanceKind, Gate, GateDetail, GateOutcome, GatingType, TokenDescriptor},
    ids::{CodeName, Fid, IdError, OrderId, ProductId, WalletAddress},
    selection::{EligibleDiscount, rank_candidates, select_best},
};
