//! Gating
//!
//! Evaluates code gates against live balances and profile data.

pub mod balances;
pub mod evaluators;
pub mod registry;
pub mod sources;

pub use balances::{BalanceApiConfig, HttpBalanceSource};
pub use evaluators::GateEvaluator;
pub use registry::{DEFAULT_GATING_TIMEOUT, GatingEvaluator};
pub use sources::{
    BalanceSource, MembershipSource, SourceError, UnconfiguredBalanceSource, WalletResolver,
};
