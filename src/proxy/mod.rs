//! Forwarding to the upstream behind the bridge

pub mod upstream;

pub use upstream::{UpstreamProxy, DEFAULT_UPSTREAM_TIMEOUT};
