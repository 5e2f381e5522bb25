//! Shared types for the redemption engine
//!
//! Domain models, the error taxonomy, and id/time utilities used by the
//! engine crate and its callers.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use error::{RedemptionError, RedemptionResult};
pub use serde::{Deserialize, Serialize};
