//! Club operations engine
//!
//! Owns the nightly lifecycle of a jornada and everything money-shaped that
//! hangs off it: staffing with frozen payroll snapshots, the drink delivery
//! ledger with fraud heuristics, register reconciliation and idempotent
//! settlement of worker pay. The HTTP boundary lives elsewhere and talks to
//! this crate through the typed requests in `shared::request`.

pub mod audit;
pub mod core;
pub mod db;
pub mod deliveries;
pub mod directory;
pub mod notify;
pub mod payroll;
pub mod registers;
pub mod settlement;
pub mod shifts;
pub mod utils;

pub use crate::core::{Config, ServerState};
pub use crate::utils::{AppError, AppResult};
