//! Server state
//!
//! Holds the shared handles every service needs: configuration, the SQLite
//! pool, the audit service, the boundary shift-status cache, the close
//! notifier and the worker directory. `Clone` is shallow (Arc).

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::audit::{AuditService, AuditWorker};
use crate::core::cache::ShiftStatusCache;
use crate::core::Config;
use crate::db::DbService;
use crate::directory::{PermissiveDirectory, WorkerDirectory};
use crate::notify::{CloseNotifier, LogNotifier, WebhookNotifier};
use crate::utils::{AppError, AppResult};

#[derive(Clone)]
pub struct ServerState {
    /// Engine configuration (immutable)
    pub config: Config,
    /// SQLite connection pool
    pub pool: SqlitePool,
    /// Tamper-evident audit log
    pub audit: Arc<AuditService>,
    /// Boundary read-through cache for the current shift status
    pub shift_cache: Arc<ShiftStatusCache>,
    /// Shift-close notification sink (at-most-once, failures logged)
    pub notifier: Arc<dyn CloseNotifier>,
    /// Worker identity collaborator
    pub directory: Arc<dyn WorkerDirectory>,
}

impl ServerState {
    /// Initialize the engine: working directory, database (with
    /// migrations), audit worker and default collaborators.
    pub async fn initialize(config: &Config) -> AppResult<Self> {
        let db_dir = config.database_dir();
        std::fs::create_dir_all(&db_dir)
            .map_err(|e| AppError::internal(format!("Failed to create {db_dir:?}: {e}")))?;

        let db_path = db_dir.join("club.db");
        let db = DbService::new(&db_path.to_string_lossy()).await?;

        let state = Self::with_pool(config.clone(), db.pool)?;

        if let Err(e) = state
            .audit
            .log_sync(
                crate::audit::AuditAction::SystemStartup,
                "system",
                "server:main",
                serde_json::json!({ "environment": state.config.environment }),
            )
            .await
        {
            tracing::error!("Failed to record startup audit entry: {e:?}");
        }

        Ok(state)
    }

    /// Record the shutdown audit entry; call before dropping the state
    pub async fn shutdown(&self) {
        if let Err(e) = self
            .audit
            .log_sync(
                crate::audit::AuditAction::SystemShutdown,
                "system",
                "server:main",
                serde_json::Value::Null,
            )
            .await
        {
            tracing::error!("Failed to record shutdown audit entry: {e:?}");
        }
    }

    /// Build state over an existing pool; used by tests and by embedders
    /// that manage their own database handle.
    pub fn with_pool(config: Config, pool: SqlitePool) -> AppResult<Self> {
        let (audit, audit_rx) = AuditService::new(pool.clone(), config.audit_buffer_size);
        tokio::spawn(AuditWorker::new(audit.storage().clone()).run(audit_rx));

        let notifier: Arc<dyn CloseNotifier> = match &config.close_webhook_url {
            Some(url) => Arc::new(WebhookNotifier::new(url.clone())),
            None => Arc::new(LogNotifier),
        };

        let shift_cache = Arc::new(ShiftStatusCache::new(config.shift_cache_ttl_ms));

        Ok(Self {
            config,
            pool,
            audit,
            shift_cache,
            notifier,
            directory: Arc::new(PermissiveDirectory),
        })
    }

    /// Replace the worker directory collaborator
    pub fn with_directory(mut self, directory: Arc<dyn WorkerDirectory>) -> Self {
        self.directory = directory;
        self
    }

    /// Replace the close notifier
    pub fn with_notifier(mut self, notifier: Arc<dyn CloseNotifier>) -> Self {
        self.notifier = notifier;
        self
    }
}
