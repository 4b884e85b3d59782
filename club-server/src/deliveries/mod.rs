//! Delivery ledger
//!
//! Append-only redemption facts. Recording never deduplicates: the
//! redeemed quantity for a ticket+item is always the sum of its rows. The
//! pending-quantity guard is mandatory on every record; the fraud
//! evaluator runs before a redemption is permitted.

pub mod fraud;

use crate::audit::AuditAction;
use crate::core::ServerState;
use crate::db::repository::delivery;
use crate::utils::{AppError, AppResult};
use shared::models::{Delivery, FraudAttempt, FraudKind, FraudVerdict};
use shared::request::DeliverItem;

/// Delivery ledger service
pub struct DeliveryService {
    state: ServerState,
}

impl DeliveryService {
    pub fn new(state: ServerState) -> Self {
        Self { state }
    }

    fn pool(&self) -> &sqlx::SqlitePool {
        &self.state.pool
    }

    /// Run the fraud heuristics for a redemption attempt. A positive match
    /// records the fraud attempt before returning the verdict.
    pub async fn evaluate_fraud(&self, req: &DeliverItem) -> AppResult<FraudVerdict> {
        fraud::evaluate(
            self.pool(),
            &self.state.config.fraud,
            req,
            shared::util::now_millis(),
        )
        .await
    }

    /// Append one delivery fact after the mandatory pending-quantity guard.
    /// Does NOT consult the fraud evaluator; callers check first (or use
    /// [`deliver`](Self::deliver)).
    pub async fn record(
        &self,
        req: &DeliverItem,
        admin_user: Option<&str>,
    ) -> AppResult<Delivery> {
        let delivered = delivery::sum_delivered(self.pool(), req.ticket_id(), req.item_name())
            .await?;
        let pending = req.sold_qty() - delivered;
        if req.qty() > pending {
            return Err(AppError::validation(format!(
                "Cannot deliver {} x {}: only {} of {} still pending on ticket {}",
                req.qty(),
                req.item_name(),
                pending.max(0),
                req.sold_qty(),
                req.ticket_id()
            )));
        }

        let recorded = delivery::insert(
            self.pool(),
            req.ticket_id(),
            req.item_name(),
            req.qty(),
            req.server_id(),
            req.server_name(),
            req.bar(),
            admin_user,
            shared::util::now_millis(),
        )
        .await?;

        tracing::info!(
            ticket = req.ticket_id(),
            item = req.item_name(),
            qty = req.qty(),
            server = req.server_name(),
            bar = req.bar(),
            "Delivery recorded"
        );

        Ok(recorded)
    }

    /// Evaluate then record. A flagged verdict denies the redemption with a
    /// conflict carrying the evaluator's message; after administrative
    /// authorization the identical call passes.
    pub async fn deliver(&self, req: &DeliverItem) -> AppResult<Delivery> {
        let verdict = self.evaluate_fraud(req).await?;
        if verdict.is_fraud {
            return Err(AppError::conflict(verdict.message));
        }
        self.record(req, None).await
    }

    /// Authorize the most recent unauthorized fraud attempt of a kind for a
    /// ticket. The retried redemption then passes that rule.
    pub async fn authorize_fraud(
        &self,
        ticket_id: &str,
        kind: FraudKind,
        actor: &str,
    ) -> AppResult<FraudAttempt> {
        let attempt = delivery::authorize_latest_attempt(self.pool(), ticket_id, kind)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!(
                    "No unauthorized {} attempt for ticket {ticket_id}",
                    kind.as_str()
                ))
            })?;

        self.state
            .audit
            .log(
                AuditAction::FraudAuthorized,
                "fraud_attempt",
                attempt.id.to_string(),
                None,
                Some(actor.to_string()),
                serde_json::json!({
                    "ticket_id": ticket_id,
                    "kind": kind.as_str(),
                    "attempt_count": attempt.attempt_count,
                }),
            )
            .await;

        tracing::info!(
            ticket = ticket_id,
            kind = kind.as_str(),
            by = actor,
            "Fraud attempt authorized"
        );

        Ok(attempt)
    }

    /// Administrative delete of a delivery fact; the only mutation the
    /// ledger allows
    pub async fn delete_delivery(&self, delivery_id: i64, admin: &str) -> AppResult<bool> {
        let existing = delivery::find_by_id(self.pool(), delivery_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Delivery {delivery_id} not found")))?;

        let deleted = delivery::delete(self.pool(), delivery_id).await?;
        if deleted {
            self.state
                .audit
                .log(
                    AuditAction::DeliveryDeleted,
                    "delivery",
                    delivery_id.to_string(),
                    None,
                    Some(admin.to_string()),
                    serde_json::json!({
                        "ticket_id": existing.ticket_id,
                        "item_name": existing.item_name,
                        "qty": existing.qty,
                    }),
                )
                .await;
        }
        Ok(deleted)
    }

    /// Redemption history for a ticket
    pub async fn deliveries_for_ticket(&self, ticket_id: &str) -> AppResult<Vec<Delivery>> {
        Ok(delivery::find_by_ticket(self.pool(), ticket_id).await?)
    }

    /// Flag history for a ticket
    pub async fn fraud_attempts_for_ticket(
        &self,
        ticket_id: &str,
    ) -> AppResult<Vec<FraudAttempt>> {
        Ok(delivery::find_attempts_by_ticket(self.pool(), ticket_id).await?)
    }
}
