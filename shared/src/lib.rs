//! Shared types for the club operations platform
//!
//! Domain models, typed operation requests and small utilities used by the
//! server crates. Models derive `sqlx::FromRow` behind the `db` feature so
//! non-database consumers stay dependency-light.

pub mod models;
pub mod request;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};
