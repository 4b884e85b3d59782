//! Core Module

pub mod cache;
pub mod config;
pub mod state;

pub use cache::{Clock, ShiftStatusCache, SystemClock};
pub use config::{Config, FraudPolicy};
pub use state::ServerState;
