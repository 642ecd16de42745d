//! Perkshop
//!
//! Discount eligibility, selection and pricing rules for the Perkshop storefront.
//!
//! Everything in this crate is pure: no I/O, no clocks other than the instant carried by
//! an [`context::EligibilityContext`]. External lookups (token balances, club membership,
//! wallet resolution) and persistence live in the application crate.

pub mod amounts;
pub mod codes;
pub mod context;
pub mod eligibility;
pub mod gating;
pub mod ids;
pub mod prelude;
pub mod selection;
