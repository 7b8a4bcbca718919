//! Storage Layer
//!
//! File-backed persistence for the bridge configuration.

pub mod config;

pub use config::{BridgeConfig, BridgeConfigService, BridgeConfigUpdate};
