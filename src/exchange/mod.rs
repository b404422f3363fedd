//! Token exchange against the secondary service
//!
//! Provides:
//! - The exchanger that performs the single outbound call
//! - The session credential it produces and its `Set-Cookie` rendering
//! - The JSON wire types of the token endpoint

pub mod client;
pub mod credential;
pub mod wire;

pub use client::{ExchangeRequest, Exchanger, DEFAULT_EXCHANGE_TIMEOUT};
pub use credential::{SameSite, SessionCredential, SESSION_TTL_HOURS};
