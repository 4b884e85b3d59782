//! Audit log module — tamper-evident audit trail
//!
//! ```text
//! sensitive operation
//!   ├─ AuditService::log() → mpsc → AuditWorker → SQLite (audit_log)
//!   └─ AuditStorage::append_in_tx() → caller's transaction (financial ops)
//!
//! SHA-256 hash chain: genesis → entry₁ → entry₂ → ... → entryₙ
//! ```
//!
//! Guarantees: every entry embeds the previous entry's hash, there is no
//! update/delete surface, and `verify_chain` recomputes the whole chain on
//! demand.

pub mod service;
pub mod storage;
pub mod types;
pub mod worker;

pub use service::{AuditLogRequest, AuditService};
pub use storage::{AuditStorage, AuditStorageError};
pub use types::{
    AuditAction, AuditChainBreak, AuditChainVerification, AuditEntry, AuditQuery,
};
pub use worker::AuditWorker;
