//! Settings persistence.

pub mod config;

pub use config::{ConfigError, Settings};
