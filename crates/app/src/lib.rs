//! Perkshop discount eligibility and redemption: persistence, gate sources and the
//! checkout-facing engine.

pub mod config;
pub mod context;
pub mod database;
pub mod domain;
pub mod engine;
pub mod observability;

#[cfg(test)]
mod test;

mod uuids;
