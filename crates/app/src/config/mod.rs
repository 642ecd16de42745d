//! Runtime configuration, read from CLI flags and the environment.

pub mod db;
pub mod gating;
pub mod logging;
pub mod welcome;

pub use db::DatabaseConfig;
pub use gating::GatingConfig;
pub use logging::{LogFormat, LoggingConfig};
pub use welcome::WelcomeConfig;
