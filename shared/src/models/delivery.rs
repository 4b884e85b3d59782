//! Delivery Ledger Models
//!
//! Append-only redemption facts plus flagged fraud attempts.

use serde::{Deserialize, Serialize};

/// One redemption fact: a quantity of one item handed over from one ticket
///
/// Never updated. The redeemed quantity for a (ticket, item) pair is always
/// the sum of its delivery rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Delivery {
    pub id: i64,
    pub ticket_id: String,
    pub item_name: String,
    pub qty: i64,
    /// Bartender who handed the items over
    pub server_id: String,
    pub server_name: String,
    /// Service bar ("Barra Principal", "Terraza", ...)
    pub bar: String,
    /// Set when recorded from the admin console instead of a scanner
    pub admin_user: Option<String>,
    pub delivered_at: i64,
    pub created_at: i64,
}

/// Fraud heuristic kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(
    feature = "db",
    derive(sqlx::Type),
    sqlx(rename_all = "snake_case")
)]
pub enum FraudKind {
    /// Ticket redeemed more times than the configured threshold
    MultipleAttempts,
    /// Ticket presented too long after its sale
    OldTicket,
}

impl FraudKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MultipleAttempts => "multiple_attempts",
            Self::OldTicket => "old_ticket",
        }
    }
}

/// A flagged redemption attempt
///
/// Append-only except for the `authorized` flag, which an administrator can
/// flip to let the retried redemption pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct FraudAttempt {
    pub id: i64,
    pub ticket_id: String,
    pub kind: FraudKind,
    /// Delivery count observed when a multiple_attempts flag was raised;
    /// authorization covers up to this count, a larger count re-flags
    pub attempt_count: Option<i64>,
    pub item_name: Option<String>,
    pub qty: Option<i64>,
    pub server_name: String,
    pub bar: String,
    pub authorized: bool,
    pub flagged_at: i64,
    pub created_at: i64,
}

/// Outcome of a fraud evaluation for a redemption attempt
#[derive(Debug, Clone, Serialize)]
pub struct FraudVerdict {
    pub is_fraud: bool,
    pub kind: Option<FraudKind>,
    pub message: String,
}

impl FraudVerdict {
    pub fn clean() -> Self {
        Self {
            is_fraud: false,
            kind: None,
            message: String::new(),
        }
    }

    pub fn flagged(kind: FraudKind, message: impl Into<String>) -> Self {
        Self {
            is_fraud: true,
            kind: Some(kind),
            message: message.into(),
        }
    }
}
