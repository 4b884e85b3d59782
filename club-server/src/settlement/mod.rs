//! Settlement service
//!
//! Marks settlement rows paid under a claim protocol that is safe across
//! concurrent callers and processes: inside the transaction, the
//! conditional `UPDATE ... WHERE paid = 0` is the first write, so the
//! database write lock serializes claimers and `rows_affected` re-checks
//! the flag under that lock. The audit entry is appended in the same
//! transaction; audit and mutation never diverge.
//!
//! Bulk settlement repeats the claim per row inside one outer transaction
//! (all-or-nothing) and writes a single payment ledger row on full success.

use crate::audit::{AuditAction, AuditStorage};
use crate::core::ServerState;
use crate::db::repository::{advance, employee_shift, payment};
use crate::utils::{money, AppError, AppResult};
use shared::models::{EmployeeAdvance, EmployeePayment, EmployeeShift, PaymentType};
use shared::request::{CreateAdvance, MarkPaid, RequestMeta};

/// Settlement service
pub struct SettlementService {
    state: ServerState,
}

impl SettlementService {
    pub fn new(state: ServerState) -> Self {
        Self { state }
    }

    fn pool(&self) -> &sqlx::SqlitePool {
        &self.state.pool
    }

    /// Mark one settlement row as paid.
    ///
    /// Exactly one of N concurrent calls succeeds; the rest fail with
    /// `Conflict` and leave no trace, including no audit entry.
    pub async fn mark_paid(&self, req: MarkPaid) -> AppResult<EmployeeShift> {
        // Chain lock before the transaction; see audit::storage.
        let _chain = self.state.audit.storage().chain_guard().await;

        let now = shared::util::now_millis();
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| AppError::database(e.to_string()))?;

        // Claim first: the conditional write takes the database write lock
        // and re-checks `paid` under it.
        let claimed = employee_shift::claim_paid(&mut tx, req.row_id(), now).await?;

        let row = employee_shift::find_by_id_tx(&mut tx, req.row_id())
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("Settlement row {} not found", req.row_id()))
            })?;

        if claimed == 0 {
            // Row exists but was already paid (possibly a moment ago).
            return Err(AppError::conflict(format!(
                "Settlement row {} is already marked paid",
                req.row_id()
            )));
        }

        // Frozen amount must be positive; anything else is a data problem,
        // not a silent no-op. Rolls back the claim.
        let amount = row.total_payment.unwrap_or(0.0);
        if amount <= 0.0 {
            tx.rollback()
                .await
                .map_err(|e| AppError::database(e.to_string()))?;
            return Err(AppError::validation(format!(
                "Settlement row {} has an invalid payment amount ({amount})",
                req.row_id()
            )));
        }

        Self::append_paid_audit(&mut tx, &row, amount, req.actor(), req.meta()).await?;

        tx.commit()
            .await
            .map_err(|e| AppError::database(e.to_string()))?;

        tracing::info!(
            row_id = row.id,
            worker = %row.worker_name,
            amount,
            by = req.actor(),
            "Settlement row marked paid"
        );

        Ok(row)
    }

    /// Settle everything owed to one worker.
    ///
    /// One outer transaction: every unpaid row is claimed, pending advances
    /// are consumed, and one ledger row summarizes the batch. Any failure
    /// rolls the whole batch back.
    pub async fn pay_worker(
        &self,
        worker_id: &str,
        actor: &str,
        meta: &RequestMeta,
        description: Option<&str>,
    ) -> AppResult<EmployeePayment> {
        let _chain = self.state.audit.storage().chain_guard().await;

        let now = shared::util::now_millis();
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| AppError::database(e.to_string()))?;

        let rows = employee_shift::find_unpaid_by_worker_tx(&mut tx, worker_id).await?;
        if rows.is_empty() {
            return Err(AppError::validation(format!(
                "Worker {worker_id} has no unpaid settlement rows"
            )));
        }

        // The whole batch settles or none of it does; one bad row fails it.
        for row in &rows {
            let amount = row.total_payment.unwrap_or(0.0);
            if amount <= 0.0 {
                return Err(AppError::validation(format!(
                    "Settlement row {} has an invalid payment amount ({amount}); fix it via override before paying",
                    row.id
                )));
            }
        }

        let pending_before =
            money::round2(rows.iter().map(|r| r.total_payment.unwrap_or(0.0)).sum());
        let advances = advance::sum_pending_tx(&mut tx, worker_id).await?;
        let amount = money::round2(pending_before - advances);
        if amount < 0.0 {
            return Err(AppError::integrity(format!(
                "Pending advances ({advances:.2}) exceed the amount owed ({pending_before:.2}) for worker {worker_id}"
            )));
        }

        let mut settled_ids = Vec::with_capacity(rows.len());
        for row in &rows {
            let claimed = employee_shift::claim_paid(&mut tx, row.id, now).await?;
            if claimed == 0 {
                return Err(AppError::conflict(format!(
                    "Settlement row {} was paid concurrently; batch aborted",
                    row.id
                )));
            }
            Self::append_paid_audit(&mut tx, row, row.total_payment.unwrap_or(0.0), actor, meta)
                .await?;
            settled_ids.push(row.id);
        }

        advance::mark_all_applied(&mut tx, worker_id, now).await?;

        let settled_json = serde_json::to_string(&settled_ids)
            .map_err(|e| AppError::internal(format!("Failed to encode row ids: {e}")))?;
        let worker_name = rows[0].worker_name.clone();
        let payment_id = payment::insert(
            &mut tx,
            worker_id,
            &worker_name,
            PaymentType::Full,
            amount,
            pending_before,
            0.0,
            &settled_json,
            description,
            actor,
            now,
        )
        .await?;

        let ledger = payment::find_by_id_tx(&mut tx, payment_id)
            .await?
            .ok_or_else(|| AppError::internal("Payment ledger row vanished after insert"))?;

        tx.commit()
            .await
            .map_err(|e| AppError::database(e.to_string()))?;

        tracing::info!(
            worker_id,
            worker = %worker_name,
            rows = settled_ids.len(),
            amount,
            advances_applied = advances,
            by = actor,
            "Worker settled in full"
        );

        Ok(ledger)
    }

    /// Hand over part of what is owed without settling any row.
    ///
    /// Recorded as an advance (consumed by the next full settlement) plus a
    /// `partial` ledger row, in one transaction.
    pub async fn pay_partial(
        &self,
        worker_id: &str,
        amount: f64,
        actor: &str,
        description: Option<&str>,
    ) -> AppResult<EmployeePayment> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(AppError::validation(format!(
                "Partial payment must be positive, got {amount}"
            )));
        }

        let _chain = self.state.audit.storage().chain_guard().await;

        let now = shared::util::now_millis();
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| AppError::database(e.to_string()))?;

        let unpaid = employee_shift::sum_unpaid_tx(&mut tx, worker_id).await?;
        let pending_advances = advance::sum_pending_tx(&mut tx, worker_id).await?;
        let pending_before = money::round2(unpaid - pending_advances);
        if money::dec(amount) > money::dec(pending_before) {
            return Err(AppError::validation(format!(
                "Partial payment ({amount:.2}) exceeds the outstanding balance ({pending_before:.2}) for worker {worker_id}"
            )));
        }

        let rows = employee_shift::find_unpaid_by_worker_tx(&mut tx, worker_id).await?;
        let worker_name = rows
            .first()
            .map(|r| r.worker_name.clone())
            .unwrap_or_else(|| worker_id.to_string());

        let amount = money::round2(amount);
        let today = crate::utils::time::today_in(self.state.config.timezone);
        advance::insert(
            &mut tx,
            worker_id,
            &worker_name,
            shared::models::AdvanceKind::Advance,
            amount,
            description.or(Some("partial payment")),
            &today,
            actor,
            now,
        )
        .await?;

        let payment_id = payment::insert(
            &mut tx,
            worker_id,
            &worker_name,
            PaymentType::Partial,
            amount,
            pending_before,
            money::round2(pending_before - amount),
            "[]",
            description,
            actor,
            now,
        )
        .await?;

        AuditStorage::append_in_tx(
            &mut tx,
            AuditAction::AdvanceCreated,
            "employee_payment".to_string(),
            payment_id.to_string(),
            None,
            Some(actor.to_string()),
            serde_json::json!({
                "worker_id": worker_id,
                "amount": amount,
                "pending_before": pending_before,
                "payment_type": "partial",
            }),
        )
        .await?;

        let ledger = payment::find_by_id_tx(&mut tx, payment_id)
            .await?
            .ok_or_else(|| AppError::internal("Payment ledger row vanished after insert"))?;

        tx.commit()
            .await
            .map_err(|e| AppError::database(e.to_string()))?;

        tracing::info!(
            worker_id,
            amount,
            by = actor,
            "Partial payment recorded"
        );

        Ok(ledger)
    }

    /// Create an advance (or deduction) against a worker's pending
    /// settlement. Positive amounts are capped by what is actually owed,
    /// validated here at creation time.
    pub async fn create_advance(&self, req: CreateAdvance) -> AppResult<EmployeeAdvance> {
        let _chain = self.state.audit.storage().chain_guard().await;

        let now = shared::util::now_millis();
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| AppError::database(e.to_string()))?;

        if req.amount() > 0.0 {
            let unpaid = employee_shift::sum_unpaid_tx(&mut tx, req.worker_id()).await?;
            let pending = advance::sum_pending_tx(&mut tx, req.worker_id()).await?;
            let available = money::round2(unpaid - pending);
            if money::dec(req.amount()) > money::dec(available) {
                return Err(AppError::validation(format!(
                    "Advance ({:.2}) exceeds the available settlement balance ({available:.2}) for worker {}",
                    req.amount(),
                    req.worker_id()
                )));
            }
        }

        let amount = money::round2(req.amount());
        let id = advance::insert(
            &mut tx,
            req.worker_id(),
            req.worker_name(),
            req.kind(),
            amount,
            req.description(),
            req.advance_date(),
            req.created_by(),
            now,
        )
        .await?;

        AuditStorage::append_in_tx(
            &mut tx,
            AuditAction::AdvanceCreated,
            "employee_advance".to_string(),
            id.to_string(),
            None,
            Some(req.created_by().to_string()),
            serde_json::json!({
                "worker_id": req.worker_id(),
                "kind": req.kind(),
                "amount": amount,
            }),
        )
        .await?;

        tx.commit()
            .await
            .map_err(|e| AppError::database(e.to_string()))?;

        tracing::info!(
            worker_id = req.worker_id(),
            amount,
            kind = ?req.kind(),
            by = req.created_by(),
            "Advance created"
        );

        Ok(advance::find_by_id(self.pool(), id)
            .await?
            .ok_or_else(|| AppError::internal("Advance vanished after insert"))?)
    }

    /// Delete an advance that has not been applied to a payment yet
    pub async fn delete_advance(&self, advance_id: i64) -> AppResult<bool> {
        let existing = advance::find_by_id(self.pool(), advance_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Advance {advance_id} not found")))?;
        if existing.applied {
            return Err(AppError::conflict(format!(
                "Advance {advance_id} was already applied to a payment"
            )));
        }
        Ok(advance::delete_unapplied(self.pool(), advance_id).await?)
    }

    /// Outstanding settlement balance for a worker (unpaid rows minus
    /// pending advances)
    pub async fn pending_balance(&self, worker_id: &str) -> AppResult<f64> {
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| AppError::database(e.to_string()))?;
        let unpaid = employee_shift::sum_unpaid_tx(&mut tx, worker_id).await?;
        let pending = advance::sum_pending_tx(&mut tx, worker_id).await?;
        tx.commit()
            .await
            .map_err(|e| AppError::database(e.to_string()))?;
        Ok(money::round2(unpaid - pending))
    }

    pub async fn settlement_rows_for_worker(
        &self,
        worker_id: &str,
    ) -> AppResult<Vec<EmployeeShift>> {
        Ok(employee_shift::find_by_worker(self.pool(), worker_id).await?)
    }

    pub async fn payments_for_worker(&self, worker_id: &str) -> AppResult<Vec<EmployeePayment>> {
        Ok(payment::find_by_worker(self.pool(), worker_id).await?)
    }

    pub async fn advances_for_worker(&self, worker_id: &str) -> AppResult<Vec<EmployeeAdvance>> {
        Ok(advance::find_by_worker(self.pool(), worker_id).await?)
    }

    /// Audit entry for one paid row, inside the settlement transaction
    async fn append_paid_audit(
        tx: &mut crate::db::repository::SqliteTx<'_>,
        row: &EmployeeShift,
        amount: f64,
        actor: &str,
        meta: &RequestMeta,
    ) -> AppResult<()> {
        AuditStorage::append_in_tx(
            tx,
            AuditAction::SettlementPaid,
            "employee_shift".to_string(),
            row.id.to_string(),
            None,
            Some(actor.to_string()),
            serde_json::json!({
                "worker_id": row.worker_id,
                "shift_date": row.shift_date,
                "old": { "paid": false, "paid_at": null },
                "new": { "paid": true, "amount": amount },
                "ip_address": meta.ip_address,
                "user_agent": meta.user_agent,
                "request_path": meta.request_path,
            }),
        )
        .await?;
        Ok(())
    }
}
