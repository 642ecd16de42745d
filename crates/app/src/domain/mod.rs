//! Perkshop Domain Concerns

pub mod discounts;
pub mod eligibility;
pub mod gating;
pub mod profiles;
pub mod redemptions;
