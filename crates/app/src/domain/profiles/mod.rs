//! Profiles

mod repository;
pub mod service;

pub use service::{PgMembershipSource, PgWalletResolver};
