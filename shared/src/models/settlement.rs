//! Settlement Models
//!
//! Payable rows derived from the roster when a jornada closes, plus
//! advances and the payment ledger.

use serde::{Deserialize, Serialize};

/// Settlement row - one payable shift for one worker
///
/// Created at jornada close from the roster snapshot. Once `paid` the
/// payment amount is permanently protected from recomputation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct EmployeeShift {
    pub id: i64,
    pub jornada_id: Option<i64>,
    pub worker_id: String,
    pub worker_name: String,
    /// Operating date (YYYY-MM-DD)
    pub shift_date: String,
    pub shift_type: Option<String>,
    pub role_name: Option<String>,
    /// Frozen base salary carried over from the roster snapshot
    pub base_payment: Option<f64>,
    /// Frozen total owed for the shift
    pub total_payment: Option<f64>,
    pub bonus: f64,
    pub deduction: f64,
    pub paid: bool,
    pub paid_at: Option<i64>,
    pub notes: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl EmployeeShift {
    /// Amount owed for this row; paid rows always report the stored value
    pub fn amount_owed(&self) -> f64 {
        self.total_payment.unwrap_or(0.0)
    }
}

/// Advance / deduction kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(
    feature = "db",
    derive(sqlx::Type),
    sqlx(rename_all = "snake_case")
)]
pub enum AdvanceKind {
    Advance,
    Deduction,
    Exceptional,
}

/// Signed monetary adjustment against a worker's pending settlement
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct EmployeeAdvance {
    pub id: i64,
    pub worker_id: String,
    pub worker_name: String,
    pub kind: AdvanceKind,
    /// Positive for advances, negative for deductions
    pub amount: f64,
    pub description: Option<String>,
    /// Date of the adjustment (YYYY-MM-DD)
    pub advance_date: String,
    /// Whether the adjustment was consumed into a payment
    pub applied: bool,
    pub applied_at: Option<i64>,
    pub created_by: Option<String>,
    pub notes: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Payment ledger type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(
    feature = "db",
    derive(sqlx::Type),
    sqlx(rename_all = "snake_case")
)]
pub enum PaymentType {
    /// Partial payment against the outstanding balance
    Partial,
    /// Full settlement of everything owed
    Full,
}

/// One payment made to a worker (full settlement or partial)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct EmployeePayment {
    pub id: i64,
    pub worker_id: String,
    pub worker_name: String,
    pub payment_type: PaymentType,
    pub amount: f64,
    /// Outstanding balance before / after the payment
    pub pending_before: Option<f64>,
    pub pending_after: Option<f64>,
    /// JSON array of EmployeeShift ids settled by this payment
    pub settled_row_ids: Option<String>,
    pub description: Option<String>,
    pub paid_by: String,
    pub paid_at: i64,
    pub created_at: i64,
}

impl EmployeePayment {
    /// Settled row ids decoded; malformed JSON reads as empty
    pub fn settled_ids(&self) -> Vec<i64> {
        self.settled_row_ids
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default()
    }
}
