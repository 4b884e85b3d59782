//! Audit log service
//!
//! Two write paths:
//! - `log()` — mpsc channel to the background worker, for lifecycle events
//!   where fire-and-forget is acceptable;
//! - `storage().append_in_tx()` — direct append inside a caller-owned
//!   transaction (behind `chain_guard()`), for financial mutations whose
//!   audit entry must commit or roll back with the mutation.

use std::sync::Arc;

use sqlx::SqlitePool;
use tokio::sync::mpsc;

use super::storage::{AuditStorage, AuditStorageError};
use super::types::*;

/// A log request travelling to the background worker
pub struct AuditLogRequest {
    pub action: AuditAction,
    pub resource_type: String,
    pub resource_id: String,
    pub operator_id: Option<String>,
    pub operator_name: Option<String>,
    pub details: serde_json::Value,
}

/// Audit log service
pub struct AuditService {
    storage: AuditStorage,
    tx: mpsc::Sender<AuditLogRequest>,
}

impl std::fmt::Debug for AuditService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditService").finish_non_exhaustive()
    }
}

impl AuditService {
    /// Create the service; the caller spawns [`super::AuditWorker`] with the
    /// returned receiver.
    pub fn new(pool: SqlitePool, buffer_size: usize) -> (Arc<Self>, mpsc::Receiver<AuditLogRequest>) {
        let (tx, rx) = mpsc::channel(buffer_size);
        let storage = AuditStorage::new(pool);
        (Arc::new(Self { storage, tx }), rx)
    }

    /// Record an audit entry asynchronously (non-blocking for the caller)
    ///
    /// Blocks on a full channel rather than dropping: audit entries must
    /// not be lost.
    pub async fn log(
        &self,
        action: AuditAction,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
        operator_id: Option<String>,
        operator_name: Option<String>,
        details: serde_json::Value,
    ) {
        let req = AuditLogRequest {
            action,
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
            operator_id,
            operator_name,
            details,
        };

        if self.tx.send(req).await.is_err() {
            tracing::error!("Audit log channel closed - audit entry lost!");
        }
    }

    /// Write an entry synchronously (startup/shutdown paths)
    pub async fn log_sync(
        &self,
        action: AuditAction,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
        details: serde_json::Value,
    ) -> Result<AuditEntry, AuditStorageError> {
        self.storage
            .append(
                action,
                resource_type.into(),
                resource_id.into(),
                None,
                None,
                details,
            )
            .await
    }

    /// Query audit entries
    pub async fn query(&self, q: &AuditQuery) -> Result<(Vec<AuditEntry>, u64), AuditStorageError> {
        self.storage.query(q).await
    }

    /// Verify chain integrity over an id range
    pub async fn verify_chain(
        &self,
        from: Option<i64>,
        to: Option<i64>,
    ) -> Result<AuditChainVerification, AuditStorageError> {
        self.storage.verify_chain(from, to).await
    }

    /// Storage handle for transactional appends
    pub fn storage(&self) -> &AuditStorage {
        &self.storage
    }
}
