//! Data Models
//!
//! Data structures exposed to callers of the bridge service.

pub mod progress;
pub mod report;

pub use progress::*;
pub use report::*;
