//! Register reconciliation ledger
//!
//! Openings are per jornada and per physical register; every close writes a
//! new reconciliation record (all retained, the most recent one drives the
//! register's presentation state). The integrity check runs before any
//! persistence: a close payload whose expected and actual tender sums
//! disagree beyond one cent is internally inconsistent, which is a hard
//! failure rather than a till shortage.

use crate::audit::AuditAction;
use crate::core::ServerState;
use crate::db::repository::register::{self, NewRegisterClose};
use crate::db::repository::jornada;
use crate::utils::{money, AppError, AppResult};
use shared::models::{JornadaState, RegisterClose, RegisterOpening};
use shared::request::{CloseRegister, OpenRegister};

/// Register service
pub struct RegisterService {
    state: ServerState,
}

impl RegisterService {
    pub fn new(state: ServerState) -> Self {
        Self { state }
    }

    fn pool(&self) -> &sqlx::SqlitePool {
        &self.state.pool
    }

    /// Open one physical register for a jornada with its initial cash float
    pub async fn open_register(&self, req: OpenRegister) -> AppResult<RegisterOpening> {
        let target = jornada::find_by_id(self.pool(), req.jornada_id())
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("Jornada {} not found", req.jornada_id()))
            })?;
        if target.state == JornadaState::Closed {
            return Err(AppError::conflict(format!(
                "Jornada {} is closed; registers cannot be opened",
                target.id
            )));
        }

        if register::find_open_opening(self.pool(), req.jornada_id(), req.register_id())
            .await?
            .is_some()
        {
            return Err(AppError::conflict(format!(
                "Register {} is already open for jornada {}",
                req.register_name(),
                req.jornada_id()
            )));
        }

        let opening = register::insert_opening(
            self.pool(),
            req.jornada_id(),
            req.register_id(),
            req.register_name(),
            req.cashier_id(),
            req.cashier_name(),
            req.initial_float(),
            req.opened_by(),
            shared::util::now_millis(),
        )
        .await?;

        self.state
            .audit
            .log(
                AuditAction::RegisterOpened,
                "register_opening",
                opening.id.to_string(),
                Some(req.cashier_id().to_string()),
                Some(req.cashier_name().to_string()),
                serde_json::json!({
                    "jornada_id": req.jornada_id(),
                    "register_id": req.register_id(),
                    "initial_float": req.initial_float(),
                }),
            )
            .await;

        tracing::info!(
            register = req.register_name(),
            jornada_id = req.jornada_id(),
            cashier = req.cashier_name(),
            "Register opened"
        );

        Ok(opening)
    }

    /// Count and close a register, writing a reconciliation record.
    ///
    /// Tender differences are computed here (Decimal math); the record
    /// starts `pending` until accepted or resolved.
    pub async fn close_register(&self, req: CloseRegister) -> AppResult<RegisterClose> {
        let expected = req.expected();
        let actual = req.actual();

        // Integrity first: inconsistent payload, not a till shortage.
        let expected_sum = money::round2(expected.sum());
        let actual_sum = money::round2(actual.sum());
        if !money::within_tolerance(expected_sum, actual_sum) {
            return Err(AppError::integrity(format!(
                "Close payload inconsistent: expected tenders sum to {expected_sum:.2}, actual to {actual_sum:.2}"
            )));
        }

        let total_amount = match req.total_amount() {
            Some(amount) => {
                if !money::within_tolerance(amount, expected_sum) {
                    return Err(AppError::integrity(format!(
                        "total_amount {amount:.2} does not match tender sum {expected_sum:.2}"
                    )));
                }
                money::round2(amount)
            }
            None => actual_sum,
        };

        let target = jornada::find_by_id(self.pool(), req.jornada_id())
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("Jornada {} not found", req.jornada_id()))
            })?;

        let diff_cash = money::diff(actual.cash, expected.cash);
        let diff_debit = money::diff(actual.debit, expected.debit);
        let diff_credit = money::diff(actual.credit, expected.credit);
        let difference_total = money::round2(diff_cash + diff_debit + diff_credit);

        // Display name comes from the opening when one exists
        let register_name =
            register::find_open_opening(self.pool(), req.jornada_id(), req.register_id())
                .await?
                .map(|o| o.register_name)
                .unwrap_or_else(|| req.register_id().to_string());

        let now = shared::util::now_millis();
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| AppError::database(e.to_string()))?;

        let close_id = register::insert_close(
            &mut tx,
            NewRegisterClose {
                register_id: req.register_id(),
                register_name: &register_name,
                jornada_id: req.jornada_id(),
                cashier_id: req.cashier_id(),
                cashier_name: req.cashier_name(),
                closed_at: now,
                expected: (expected.cash, expected.debit, expected.credit),
                actual: (actual.cash, actual.debit, actual.credit),
                diffs: (diff_cash, diff_debit, diff_credit),
                difference_total,
                total_sales: req.total_sales(),
                total_amount,
                notes: req.notes(),
            },
        )
        .await?;

        register::close_opening(&mut tx, req.jornada_id(), req.register_id()).await?;

        tx.commit()
            .await
            .map_err(|e| AppError::database(e.to_string()))?;

        self.state
            .audit
            .log(
                AuditAction::RegisterClosed,
                "register_close",
                close_id.to_string(),
                Some(req.cashier_id().to_string()),
                Some(req.cashier_name().to_string()),
                serde_json::json!({
                    "jornada_id": req.jornada_id(),
                    "register_id": req.register_id(),
                    "shift_date": target.shift_date,
                    "difference_total": difference_total,
                }),
            )
            .await;

        tracing::info!(
            register = req.register_id(),
            jornada_id = req.jornada_id(),
            difference_total,
            "Register closed"
        );

        Ok(register::find_close_by_id(self.pool(), close_id)
            .await?
            .ok_or_else(|| AppError::internal("Register close vanished after insert"))?)
    }

    /// Accept a pending close as balanced and release the register
    pub async fn accept_close(&self, close_id: i64, actor: &str) -> AppResult<RegisterClose> {
        let now = shared::util::now_millis();
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| AppError::database(e.to_string()))?;

        let rows = register::accept_close(&mut tx, close_id, actor, now).await?;
        if rows == 0 {
            return Err(self.close_transition_error(close_id).await);
        }

        // Release any residual open opening for that register
        if let Some(accepted) = register::find_close_by_id(self.pool(), close_id).await? {
            register::close_opening(&mut tx, accepted.jornada_id, &accepted.register_id).await?;
        }

        tx.commit()
            .await
            .map_err(|e| AppError::database(e.to_string()))?;

        self.state
            .audit
            .log(
                AuditAction::RegisterCloseAccepted,
                "register_close",
                close_id.to_string(),
                None,
                Some(actor.to_string()),
                serde_json::Value::Null,
            )
            .await;

        Ok(register::find_close_by_id(self.pool(), close_id)
            .await?
            .ok_or_else(|| AppError::internal("Register close vanished after accept"))?)
    }

    /// Mark a pending close as resolved with investigation notes
    pub async fn resolve_close(
        &self,
        close_id: i64,
        actor: &str,
        notes: &str,
    ) -> AppResult<RegisterClose> {
        if notes.trim().is_empty() {
            return Err(AppError::validation("Resolution notes must not be empty"));
        }

        let now = shared::util::now_millis();
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| AppError::database(e.to_string()))?;

        let rows = register::resolve_close(&mut tx, close_id, actor, notes, now).await?;
        if rows == 0 {
            return Err(self.close_transition_error(close_id).await);
        }

        tx.commit()
            .await
            .map_err(|e| AppError::database(e.to_string()))?;

        self.state
            .audit
            .log(
                AuditAction::RegisterCloseResolved,
                "register_close",
                close_id.to_string(),
                None,
                Some(actor.to_string()),
                serde_json::json!({ "notes": notes }),
            )
            .await;

        Ok(register::find_close_by_id(self.pool(), close_id)
            .await?
            .ok_or_else(|| AppError::internal("Register close vanished after resolve"))?)
    }

    async fn close_transition_error(&self, close_id: i64) -> AppError {
        match register::find_close_by_id(self.pool(), close_id).await {
            Ok(Some(existing)) => AppError::conflict(format!(
                "Register close {close_id} is already '{:?}'",
                existing.status
            )),
            Ok(None) => AppError::not_found(format!("Register close {close_id} not found")),
            Err(e) => e.into(),
        }
    }

    /// Most recent close record for a register within a jornada
    pub async fn latest_close(
        &self,
        jornada_id: i64,
        register_id: &str,
    ) -> AppResult<Option<RegisterClose>> {
        Ok(register::find_latest_close(self.pool(), jornada_id, register_id).await?)
    }

    pub async fn openings(&self, jornada_id: i64) -> AppResult<Vec<RegisterOpening>> {
        Ok(register::find_openings_by_jornada(self.pool(), jornada_id).await?)
    }

    pub async fn closes(&self, jornada_id: i64) -> AppResult<Vec<RegisterClose>> {
        Ok(register::find_closes_by_jornada(self.pool(), jornada_id).await?)
    }
}
