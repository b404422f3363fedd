//! The bridge as a middleware step of a host pipeline

pub mod bridge;
pub mod install;

pub use bridge::{Bridge, Next};
pub use install::InstallationStrategy;
