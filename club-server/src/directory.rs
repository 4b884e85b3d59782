//! Worker identity collaborator
//!
//! The engine does not own employee records; the boundary injects a
//! directory that resolves worker ids. Used when copying schedule
//! assignments into a roster, where stale schedules can reference workers
//! that no longer exist.

use async_trait::async_trait;

/// Resolved worker identity
#[derive(Debug, Clone)]
pub struct WorkerProfile {
    pub worker_id: String,
    pub name: String,
    pub active: bool,
}

/// id → identity/active lookup
#[async_trait]
pub trait WorkerDirectory: Send + Sync {
    /// Resolve a worker id; None means unknown
    async fn find(&self, worker_id: &str) -> Option<WorkerProfile>;
}

/// Default directory that accepts every id as an active worker
///
/// Matches the trust model of direct roster additions, where the request
/// already carries the worker's identity snapshot.
pub struct PermissiveDirectory;

#[async_trait]
impl WorkerDirectory for PermissiveDirectory {
    async fn find(&self, worker_id: &str) -> Option<WorkerProfile> {
        Some(WorkerProfile {
            worker_id: worker_id.to_string(),
            name: String::new(),
            active: true,
        })
    }
}
