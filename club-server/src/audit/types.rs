//! Audit log type definitions
//!
//! Core data structures of the tamper-evident audit trail. Entries are
//! immutable, never deleted, and chained with SHA-256 hashes.

use serde::{Deserialize, Serialize};

/// Audit action (closed enum, never free text)
///
/// Grouped by domain so every sensitive operation has an explicit tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum AuditAction {
    // ═══ System lifecycle ═══
    SystemStartup,
    SystemShutdown,

    // ═══ Jornada lifecycle ═══
    JornadaCreated,
    JornadaOpened,
    JornadaClosed,
    ChecklistCompleted,

    // ═══ Staffing ═══
    RosterEntryAdded,
    RosterEntryRemoved,
    /// Frozen payment replaced with an explicit value (financial)
    PaymentOverridden,

    // ═══ Registers ═══
    RegisterOpened,
    RegisterClosed,
    RegisterCloseAccepted,
    RegisterCloseResolved,

    // ═══ Deliveries / fraud ═══
    DeliveryDeleted,
    FraudAuthorized,

    // ═══ Settlement (financial) ═══
    SettlementPaid,
    AdvanceCreated,

    // ═══ Configuration ═══
    SalaryConfigChanged,
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // serde snake_case, stable across versions
        let s = serde_json::to_string(self).unwrap_or_default();
        write!(f, "{}", s.trim_matches('"'))
    }
}

/// One immutable audit entry
///
/// `prev_hash` links to the previous entry; `curr_hash` covers every stored
/// field including `prev_hash`, so any modification breaks the chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Sequence number (monotonic)
    pub id: i64,
    /// Unix millis
    pub timestamp: i64,
    pub action: AuditAction,
    /// Resource type ("jornada", "employee_shift", "register_close", ...)
    pub resource_type: String,
    pub resource_id: String,
    /// Acting operator; system events carry None
    pub operator_id: Option<String>,
    pub operator_name: Option<String>,
    /// Structured details (JSON)
    pub details: serde_json::Value,
    pub prev_hash: String,
    pub curr_hash: String,
}

/// Audit query parameters
#[derive(Debug, Clone, Deserialize)]
pub struct AuditQuery {
    /// Lower timestamp bound (inclusive, Unix millis)
    pub from: Option<i64>,
    /// Upper timestamp bound (inclusive)
    pub to: Option<i64>,
    pub action: Option<AuditAction>,
    pub operator_id: Option<String>,
    pub resource_type: Option<String>,
    #[serde(default)]
    pub offset: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    50
}

impl Default for AuditQuery {
    fn default() -> Self {
        Self {
            from: None,
            to: None,
            action: None,
            operator_id: None,
            resource_type: None,
            offset: 0,
            limit: default_limit(),
        }
    }
}

/// Chain verification result
#[derive(Debug, Serialize)]
pub struct AuditChainVerification {
    pub total_entries: u64,
    pub chain_intact: bool,
    pub breaks: Vec<AuditChainBreak>,
}

/// One break point in the chain
#[derive(Debug, Serialize)]
pub struct AuditChainBreak {
    pub entry_id: i64,
    pub expected_hash: String,
    pub actual_hash: String,
}
