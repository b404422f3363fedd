//! Exchange eligibility
//!
//! Provides:
//! - The static trust policy (allowed referer, host, secondary service)
//! - Identity secrets and their resolution (shared token or per-user table)
//! - The gate that turns request metadata into a decision

pub mod gate;
pub mod identity;
pub mod trust;

pub use gate::{Gate, GateDecision, RequestMeta, SkipReason};
pub use identity::{IdentityResolution, IdentitySecret, IdentityTable, DEFAULT_SUBJECT_HEADER};
pub use trust::{parent_domain, TrustPolicy, EXCHANGE_PATH};
