//! Shared types

pub mod error;

pub use error::{BridgeError, ConfigError, ExchangeError, Result};
