//! Configuration loading and bootstrap of providers, stores and hosts.

pub mod bootstrap;
pub mod config;
pub mod secret;

pub use config::{Config, ConfigError};
pub use secret::Secret;
