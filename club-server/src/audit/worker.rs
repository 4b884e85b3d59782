//! Audit log background worker
//!
//! Consumes `AuditLogRequest`s from the mpsc channel and appends them to
//! storage. Exits when the channel closes.

use super::service::AuditLogRequest;
use super::storage::AuditStorage;

pub struct AuditWorker {
    storage: AuditStorage,
}

impl AuditWorker {
    pub fn new(storage: AuditStorage) -> Self {
        Self { storage }
    }

    /// Run the worker (blocks until the channel closes)
    pub async fn run(self, mut rx: tokio::sync::mpsc::Receiver<AuditLogRequest>) {
        tracing::debug!("Audit log worker started");

        while let Some(req) = rx.recv().await {
            match self
                .storage
                .append(
                    req.action,
                    req.resource_type,
                    req.resource_id,
                    req.operator_id,
                    req.operator_name,
                    req.details,
                )
                .await
            {
                Ok(entry) => {
                    tracing::debug!(
                        audit_id = entry.id,
                        action = %entry.action,
                        resource = %entry.resource_type,
                        "Audit entry recorded"
                    );
                }
                Err(e) => {
                    tracing::error!("Failed to write audit entry: {:?}", e);
                }
            }
        }

        tracing::debug!("Audit log channel closed, worker stopping");
    }
}
