//! Discounts

pub mod admin;
pub mod data;
mod errors;
pub mod records;
mod repositories;
pub mod store;

pub use admin::{DiscountAdmin, DiscountAdminError, DiscountAdminService, WelcomeSettings};
pub use errors::DiscountsStoreError;
pub use store::{DiscountStore, PgDiscountStore};
