//! Audit log SQLite storage
//!
//! Append-only: there is no update or delete interface. A SHA-256 hash
//! chain makes any after-the-fact edit detectable.
//!
//! Appends are serialized by an in-process mutex (this engine is the single
//! writer process). Transactional callers take [`AuditStorage::chain_guard`]
//! BEFORE opening their transaction, then append through
//! [`AuditStorage::append_in_tx`], so audit and mutation commit together
//! without deadlocking against the background worker.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use thiserror::Error;

use super::types::{
    AuditAction, AuditChainBreak, AuditChainVerification, AuditEntry, AuditQuery,
};
use crate::db::repository::SqliteTx;

/// Storage error
#[derive(Debug, Error)]
pub enum AuditStorageError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<sqlx::Error> for AuditStorageError {
    fn from(err: sqlx::Error) -> Self {
        AuditStorageError::Database(err.to_string())
    }
}

impl From<AuditStorageError> for crate::utils::AppError {
    fn from(err: AuditStorageError) -> Self {
        crate::utils::AppError::internal(err.to_string())
    }
}

pub type AuditStorageResult<T> = Result<T, AuditStorageError>;

/// Row shape in SQLite (details kept as raw JSON text)
#[derive(Debug, Clone, sqlx::FromRow)]
struct AuditRow {
    id: i64,
    timestamp: i64,
    action: AuditAction,
    resource_type: String,
    resource_id: String,
    operator_id: Option<String>,
    operator_name: Option<String>,
    details: String,
    prev_hash: String,
    curr_hash: String,
}

impl From<AuditRow> for AuditEntry {
    fn from(r: AuditRow) -> Self {
        let details = serde_json::from_str(&r.details).unwrap_or(serde_json::Value::Null);
        AuditEntry {
            id: r.id,
            timestamp: r.timestamp,
            action: r.action,
            resource_type: r.resource_type,
            resource_id: r.resource_id,
            operator_id: r.operator_id,
            operator_name: r.operator_name,
            details,
            prev_hash: r.prev_hash,
            curr_hash: r.curr_hash,
        }
    }
}

const AUDIT_SELECT: &str = "SELECT id, timestamp, action, resource_type, resource_id, operator_id, operator_name, details, prev_hash, curr_hash FROM audit_log";

/// Audit log storage (SQLite)
#[derive(Clone)]
pub struct AuditStorage {
    pool: SqlitePool,
    /// Serializes all appends; prevents read-modify-write races on the chain
    append_lock: Arc<tokio::sync::Mutex<()>>,
}

impl AuditStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            append_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// Acquire the chain lock. Hold the guard across any transaction that
    /// calls [`append_in_tx`](Self::append_in_tx).
    pub async fn chain_guard(&self) -> tokio::sync::OwnedMutexGuard<()> {
        self.append_lock.clone().lock_owned().await
    }

    /// Append one entry in its own transaction
    pub async fn append(
        &self,
        action: AuditAction,
        resource_type: String,
        resource_id: String,
        operator_id: Option<String>,
        operator_name: Option<String>,
        details: serde_json::Value,
    ) -> AuditStorageResult<AuditEntry> {
        let _guard = self.chain_guard().await;
        let mut tx = self.pool.begin().await?;
        let entry = Self::append_in_tx(
            &mut tx,
            action,
            resource_type,
            resource_id,
            operator_id,
            operator_name,
            details,
        )
        .await?;
        tx.commit().await?;
        Ok(entry)
    }

    /// Append inside a caller-owned transaction
    ///
    /// The caller must hold the guard from [`chain_guard`](Self::chain_guard)
    /// taken before the transaction began.
    pub async fn append_in_tx(
        tx: &mut SqliteTx<'_>,
        action: AuditAction,
        resource_type: String,
        resource_id: String,
        operator_id: Option<String>,
        operator_name: Option<String>,
        details: serde_json::Value,
    ) -> AuditStorageResult<AuditEntry> {
        // 1. Read the tip of the chain
        let last = sqlx::query_as::<_, (i64, String)>(
            "SELECT id, curr_hash FROM audit_log ORDER BY id DESC LIMIT 1",
        )
        .fetch_optional(&mut **tx)
        .await?;

        let (id, prev_hash) = match last {
            Some((last_id, hash)) => (last_id + 1, hash),
            None => (1, "genesis".to_string()),
        };

        // 2. Hash every stored field
        let timestamp = shared::util::now_millis();
        let details_json = serde_json::to_string(&details)?;
        let curr_hash = compute_audit_hash(
            &prev_hash,
            id,
            timestamp,
            &action,
            &resource_type,
            &resource_id,
            operator_id.as_deref(),
            operator_name.as_deref(),
            &details_json,
        );

        // 3. Insert with an explicit sequence id
        sqlx::query(
            "INSERT INTO audit_log (id, timestamp, action, resource_type, resource_id, operator_id, operator_name, details, prev_hash, curr_hash) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )
        .bind(id)
        .bind(timestamp)
        .bind(action)
        .bind(&resource_type)
        .bind(&resource_id)
        .bind(&operator_id)
        .bind(&operator_name)
        .bind(&details_json)
        .bind(&prev_hash)
        .bind(&curr_hash)
        .execute(&mut **tx)
        .await?;

        Ok(AuditEntry {
            id,
            timestamp,
            action,
            resource_type,
            resource_id,
            operator_id,
            operator_name,
            details,
            prev_hash,
            curr_hash,
        })
    }

    /// Query entries, newest first
    pub async fn query(&self, q: &AuditQuery) -> AuditStorageResult<(Vec<AuditEntry>, u64)> {
        let mut conditions = Vec::new();
        if q.from.is_some() {
            conditions.push("timestamp >= ?");
        }
        if q.to.is_some() {
            conditions.push("timestamp <= ?");
        }
        if q.action.is_some() {
            conditions.push("action = ?");
        }
        if q.operator_id.is_some() {
            conditions.push("operator_id = ?");
        }
        if q.resource_type.is_some() {
            conditions.push("resource_type = ?");
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };

        let count_sql = format!("SELECT COUNT(*) FROM audit_log{where_clause}");
        let select_sql =
            format!("{AUDIT_SELECT}{where_clause} ORDER BY id DESC LIMIT ? OFFSET ?");

        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        let mut select_query = sqlx::query_as::<_, AuditRow>(&select_sql);

        if let Some(from) = q.from {
            count_query = count_query.bind(from);
            select_query = select_query.bind(from);
        }
        if let Some(to) = q.to {
            count_query = count_query.bind(to);
            select_query = select_query.bind(to);
        }
        if let Some(action) = q.action {
            count_query = count_query.bind(action);
            select_query = select_query.bind(action);
        }
        if let Some(ref operator_id) = q.operator_id {
            count_query = count_query.bind(operator_id.clone());
            select_query = select_query.bind(operator_id.clone());
        }
        if let Some(ref resource_type) = q.resource_type {
            count_query = count_query.bind(resource_type.clone());
            select_query = select_query.bind(resource_type.clone());
        }

        let total = count_query.fetch_one(&self.pool).await? as u64;
        let rows = select_query
            .bind(q.limit)
            .bind(q.offset)
            .fetch_all(&self.pool)
            .await?;

        Ok((rows.into_iter().map(AuditEntry::from).collect(), total))
    }

    /// Last N entries, newest first
    pub async fn query_last(&self, count: i64) -> AuditStorageResult<Vec<AuditEntry>> {
        let sql = format!("{AUDIT_SELECT} ORDER BY id DESC LIMIT ?");
        let rows = sqlx::query_as::<_, AuditRow>(&sql)
            .bind(count)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(AuditEntry::from).collect())
    }

    /// Total number of entries
    pub async fn count(&self) -> AuditStorageResult<u64> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM audit_log")
            .fetch_one(&self.pool)
            .await?;
        Ok(total as u64)
    }

    /// Walk the chain in sequence order, recomputing every hash
    pub async fn verify_chain(
        &self,
        from: Option<i64>,
        to: Option<i64>,
    ) -> AuditStorageResult<AuditChainVerification> {
        let sql = format!(
            "{AUDIT_SELECT} WHERE id >= ? AND id <= ? ORDER BY id ASC"
        );
        let rows = sqlx::query_as::<_, AuditRow>(&sql)
            .bind(from.unwrap_or(1))
            .bind(to.unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;

        let mut breaks = Vec::new();
        let mut prev_hash: Option<String> = None;

        for row in &rows {
            if let Some(ref expected_prev) = prev_hash {
                if &row.prev_hash != expected_prev {
                    breaks.push(AuditChainBreak {
                        entry_id: row.id,
                        expected_hash: expected_prev.clone(),
                        actual_hash: row.prev_hash.clone(),
                    });
                }
            }

            let recomputed = compute_audit_hash(
                &row.prev_hash,
                row.id,
                row.timestamp,
                &row.action,
                &row.resource_type,
                &row.resource_id,
                row.operator_id.as_deref(),
                row.operator_name.as_deref(),
                &row.details,
            );
            if recomputed != row.curr_hash {
                breaks.push(AuditChainBreak {
                    entry_id: row.id,
                    expected_hash: recomputed,
                    actual_hash: row.curr_hash.clone(),
                });
            }

            prev_hash = Some(row.curr_hash.clone());
        }

        Ok(AuditChainVerification {
            total_entries: rows.len() as u64,
            chain_intact: breaks.is_empty(),
            breaks,
        })
    }
}

/// SHA-256 over every stored field
///
/// Variable-length fields are `\x00`-separated so `("ab","cd")` and
/// `("abc","d")` cannot collide; fixed-width integers use LE bytes;
/// optionals carry a tag byte so None and Some("") stay distinct.
#[allow(clippy::too_many_arguments)]
fn compute_audit_hash(
    prev_hash: &str,
    id: i64,
    timestamp: i64,
    action: &AuditAction,
    resource_type: &str,
    resource_id: &str,
    operator_id: Option<&str>,
    operator_name: Option<&str>,
    details_json: &str,
) -> String {
    let mut hasher = Sha256::new();

    hasher.update(prev_hash.as_bytes());
    hasher.update(b"\x00");

    hasher.update(id.to_le_bytes());
    hasher.update(timestamp.to_le_bytes());

    // serde snake_case, matches the stored TEXT value
    let action_str = serde_json::to_string(action).unwrap_or_default();
    hasher.update(action_str.as_bytes());
    hasher.update(b"\x00");

    hasher.update(resource_type.as_bytes());
    hasher.update(b"\x00");
    hasher.update(resource_id.as_bytes());
    hasher.update(b"\x00");

    hash_optional(&mut hasher, operator_id);
    hash_optional(&mut hasher, operator_name);

    hasher.update(details_json.as_bytes());
    hasher.update(b"\x00");

    hex::encode(hasher.finalize())
}

/// Optional field hashing: `\x00` = None, `\x01` + bytes + `\x00` = Some
fn hash_optional(hasher: &mut Sha256, value: Option<&str>) {
    match value {
        Some(v) => {
            hasher.update(b"\x01");
            hasher.update(v.as_bytes());
        }
        None => {
            hasher.update(b"\x00");
        }
    }
    hasher.update(b"\x00");
}
