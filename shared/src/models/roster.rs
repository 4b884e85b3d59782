//! Roster Model
//!
//! One worker scheduled for one role during one jornada, carrying the
//! payroll snapshot frozen at assignment time.

use serde::{Deserialize, Serialize};

/// Roster entry - staffing record with frozen pay
///
/// The snapshot fields (`base_snapshot`, `bonus_snapshot`, `total_payment`)
/// are written once when the worker is assigned and never recomputed from
/// the salary configuration afterwards. NULL snapshot means the role had no
/// configuration at assignment time; an override fixes it later.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct RosterEntry {
    pub id: i64,
    pub jornada_id: i64,
    pub worker_id: String,
    pub worker_name: String,
    /// Role name as assigned (display; dispatch goes through role_config_id)
    pub role_name: String,
    /// Salary configuration resolved once at assignment time
    pub role_config_id: Option<i64>,
    /// Scheduled start (HH:MM)
    pub starts_at: String,
    /// Scheduled end (HH:MM); earlier than starts_at means past midnight
    pub ends_at: String,
    pub hourly_cost: f64,
    /// Informational hourly_cost x worked hours
    pub total_cost: f64,
    /// "caja 1", "barra principal", ...
    pub area: Option<String>,
    /// Frozen base salary per shift
    pub base_snapshot: Option<f64>,
    /// Frozen fixed bonus
    pub bonus_snapshot: Option<f64>,
    /// Frozen total payment (base + bonus, or an override value)
    pub total_payment: Option<f64>,
    /// Whether the frozen total was manually corrected
    pub is_override: bool,
    pub override_reason: Option<String>,
    pub override_by: Option<String>,
    pub override_at: Option<i64>,
    pub created_at: i64,
}

impl RosterEntry {
    /// Whether the payroll snapshot was resolved at assignment time
    pub fn is_frozen(&self) -> bool {
        self.total_payment.is_some()
    }
}
