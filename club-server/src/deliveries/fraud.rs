//! Fraud heuristics evaluator
//!
//! Stateless rules over a ticket's redemption history, first match wins:
//!
//! 1. `multiple_attempts` — more deliveries recorded for the ticket than
//!    the configured threshold.
//! 2. `old_ticket` — the ticket was sold longer ago than the configured
//!    age limit.
//!
//! Authorization is kind-scoped: an authorized `old_ticket` attempt
//! suppresses that rule permanently (ticket age only grows), while an
//! authorized `multiple_attempts` attempt covers only the delivery count
//! it was raised at; a higher count is a fresh trigger and flags again.

use crate::core::FraudPolicy;
use crate::db::repository::delivery;
use crate::utils::{time, AppResult};
use shared::models::{FraudKind, FraudVerdict};
use shared::request::DeliverItem;
use sqlx::SqlitePool;

/// Evaluate a redemption attempt. On a positive match the fraud attempt is
/// recorded (`authorized = false`) before the verdict is returned, so the
/// administrative authorization flow has a row to flip.
pub async fn evaluate(
    pool: &SqlitePool,
    policy: &FraudPolicy,
    req: &DeliverItem,
    now: i64,
) -> AppResult<FraudVerdict> {
    // Rule 1: delivery count
    let attempts = delivery::count_for_ticket(pool, req.ticket_id()).await?;
    if attempts > policy.max_delivery_attempts {
        let covered = delivery::latest_authorized_attempt(
            pool,
            req.ticket_id(),
            FraudKind::MultipleAttempts,
        )
        .await?
        .map(|a| a.attempt_count.unwrap_or(0) >= attempts)
        .unwrap_or(false);

        if !covered {
            delivery::insert_attempt(
                pool,
                req.ticket_id(),
                FraudKind::MultipleAttempts,
                Some(attempts),
                Some(req.item_name()),
                Some(req.qty()),
                req.server_name(),
                req.bar(),
                now,
            )
            .await?;
            return Ok(FraudVerdict::flagged(
                FraudKind::MultipleAttempts,
                format!(
                    "Ticket {} already has {attempts} recorded deliveries (max {}); authorization required",
                    req.ticket_id(),
                    policy.max_delivery_attempts
                ),
            ));
        }
    }

    // Rule 2: ticket age
    if let Some(sale_ts) = req.sale_timestamp_ms() {
        let age_ms = now - sale_ts;
        if age_ms > time::hours_to_millis(policy.max_ticket_age_hours) {
            let authorized = delivery::latest_authorized_attempt(
                pool,
                req.ticket_id(),
                FraudKind::OldTicket,
            )
            .await?;

            if authorized.is_none() {
                delivery::insert_attempt(
                    pool,
                    req.ticket_id(),
                    FraudKind::OldTicket,
                    None,
                    Some(req.item_name()),
                    Some(req.qty()),
                    req.server_name(),
                    req.bar(),
                    now,
                )
                .await?;
                let age_days = age_ms as f64 / (24.0 * 60.0 * 60.0 * 1000.0);
                return Ok(FraudVerdict::flagged(
                    FraudKind::OldTicket,
                    format!(
                        "Ticket {} is {age_days:.1} days old (max {}h); authorization required",
                        req.ticket_id(),
                        policy.max_ticket_age_hours
                    ),
                ));
            }
        }
    }

    Ok(FraudVerdict::clean())
}
