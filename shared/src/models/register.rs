//! Register Models
//!
//! Register openings (one per physical register per jornada) and the
//! reconciliation records written when a register is counted and closed.

use serde::{Deserialize, Serialize};

/// Register opening state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(
    feature = "db",
    derive(sqlx::Type),
    sqlx(rename_all = "snake_case")
)]
pub enum RegisterState {
    Open,
    Closed,
}

/// One physical register opened by one cashier with an initial cash float
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct RegisterOpening {
    pub id: i64,
    pub jornada_id: i64,
    pub register_id: String,
    pub register_name: String,
    pub cashier_id: String,
    pub cashier_name: String,
    /// Initial cash float
    pub initial_float: f64,
    pub opened_by: String,
    pub state: RegisterState,
    pub opened_at: i64,
    pub created_at: i64,
}

/// Amounts per payment tender
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TenderTotals {
    pub cash: f64,
    pub debit: f64,
    pub credit: f64,
}

impl TenderTotals {
    pub fn new(cash: f64, debit: f64, credit: f64) -> Self {
        Self {
            cash,
            debit,
            credit,
        }
    }

    pub fn sum(&self) -> f64 {
        self.cash + self.debit + self.credit
    }
}

/// Reconciliation status of a register close
///
/// `pending` until an administrator accepts (balanced) or resolves a
/// discrepancy under investigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(
    feature = "db",
    derive(sqlx::Type),
    sqlx(rename_all = "snake_case")
)]
pub enum CloseStatus {
    Pending,
    Balanced,
    Resolved,
}

/// One register-closing event
///
/// A register may accumulate several close rows across a jornada; all are
/// retained for audit and the most recent one drives presentation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct RegisterClose {
    pub id: i64,
    pub register_id: String,
    pub register_name: String,
    pub jornada_id: i64,
    pub cashier_id: String,
    pub cashier_name: String,
    pub closed_at: i64,

    // Expected totals
    pub expected_cash: f64,
    pub expected_debit: f64,
    pub expected_credit: f64,

    // Counted totals
    pub actual_cash: f64,
    pub actual_debit: f64,
    pub actual_credit: f64,

    // Differences (actual - expected)
    pub diff_cash: f64,
    pub diff_debit: f64,
    pub diff_credit: f64,
    pub difference_total: f64,

    // Statistics
    pub total_sales: i64,
    pub total_amount: f64,

    pub notes: Option<String>,
    pub status: CloseStatus,
    pub resolved_by: Option<String>,
    pub resolved_at: Option<i64>,
    pub resolution_notes: Option<String>,
    pub created_at: i64,
}

impl RegisterClose {
    pub fn expected(&self) -> TenderTotals {
        TenderTotals::new(self.expected_cash, self.expected_debit, self.expected_credit)
    }

    pub fn actual(&self) -> TenderTotals {
        TenderTotals::new(self.actual_cash, self.actual_debit, self.actual_credit)
    }
}
