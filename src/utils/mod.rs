//! Utilities
//!
//! Common utilities used throughout the service layer.

pub mod error;

pub use error::*;
