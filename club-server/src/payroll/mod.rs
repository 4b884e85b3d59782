//! Payroll snapshot engine
//!
//! Resolves a role's salary configuration once at assignment time and
//! freezes the result onto the roster entry. The frozen amounts are
//! immutable evidence of what was promised: later configuration edits never
//! touch them, only an explicit override does.

use crate::audit::{AuditAction, AuditStorage};
use crate::core::ServerState;
use crate::db::repository::{jornada, roster};
use crate::utils::{money, AppError, AppResult};
use shared::models::{JornadaState, RosterEntry};
use shared::request::OverridePayment;
use sqlx::SqlitePool;

/// A resolved payroll snapshot
#[derive(Debug, Clone, Copy)]
pub struct Snapshot {
    pub config_id: i64,
    pub base: f64,
    pub bonus: f64,
    pub total: f64,
}

/// Resolve the current salary configuration for a role.
///
/// A missing configuration is not fatal: staffing proceeds with an
/// unfrozen snapshot and the amount is fixed later via override.
pub async fn freeze(pool: &SqlitePool, role_name: &str) -> AppResult<Option<Snapshot>> {
    let config = crate::db::repository::salary::find_by_role(pool, role_name).await?;

    match config {
        Some(cfg) => {
            let total = money::round2(cfg.base_per_shift + cfg.fixed_bonus);
            Ok(Some(Snapshot {
                config_id: cfg.id,
                base: cfg.base_per_shift,
                bonus: cfg.fixed_bonus,
                total,
            }))
        }
        None => {
            tracing::warn!(
                role = role_name,
                "No salary configuration for role; assignment left unfrozen"
            );
            Ok(None)
        }
    }
}

/// Payroll service: the override path over frozen snapshots
pub struct PayrollService {
    state: ServerState,
}

impl PayrollService {
    pub fn new(state: ServerState) -> Self {
        Self { state }
    }

    /// Create or update a role's salary configuration.
    ///
    /// Affects future assignments only; frozen snapshots keep the amounts
    /// they were assigned with.
    pub async fn set_role_salary(
        &self,
        role_name: &str,
        base_per_shift: f64,
        fixed_bonus: f64,
        actor: &str,
    ) -> AppResult<shared::models::RoleSalaryConfig> {
        let config = crate::db::repository::salary::upsert(
            &self.state.pool,
            role_name,
            base_per_shift,
            fixed_bonus,
        )
        .await?;

        self.state
            .audit
            .log(
                AuditAction::SalaryConfigChanged,
                "role_salary_config",
                config.id.to_string(),
                None,
                Some(actor.to_string()),
                serde_json::json!({
                    "role": config.role_name,
                    "base_per_shift": config.base_per_shift,
                    "fixed_bonus": config.fixed_bonus,
                }),
            )
            .await;

        Ok(config)
    }

    /// Replace a frozen total with an explicit value.
    ///
    /// Requires a justification; the audit entry commits in the same
    /// transaction as the mutation.
    pub async fn override_payment(&self, req: OverridePayment) -> AppResult<RosterEntry> {
        let _chain = self.state.audit.storage().chain_guard().await;
        let mut tx = self
            .state
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database(e.to_string()))?;

        let entry = roster::find_by_id_tx(&mut tx, req.entry_id())
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("Roster entry {} not found", req.entry_id()))
            })?;

        let parent = jornada::find_by_id_tx(&mut tx, entry.jornada_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("Jornada {} not found", entry.jornada_id))
            })?;
        if parent.state == JornadaState::Closed {
            return Err(AppError::conflict(format!(
                "Jornada {} is closed; its roster can no longer be corrected",
                parent.id
            )));
        }

        let now = shared::util::now_millis();
        let new_total = money::round2(req.new_total());
        roster::apply_override(&mut tx, entry.id, new_total, req.reason(), req.author(), now)
            .await?;

        AuditStorage::append_in_tx(
            &mut tx,
            AuditAction::PaymentOverridden,
            "roster_entry".to_string(),
            entry.id.to_string(),
            None,
            Some(req.author().to_string()),
            serde_json::json!({
                "worker_id": entry.worker_id,
                "old_total": entry.total_payment,
                "new_total": new_total,
                "reason": req.reason(),
            }),
        )
        .await?;

        tx.commit()
            .await
            .map_err(|e| AppError::database(e.to_string()))?;

        tracing::info!(
            entry_id = entry.id,
            worker = %entry.worker_name,
            new_total,
            by = req.author(),
            "Roster payment overridden"
        );

        Ok(roster::get(&self.state.pool, entry.id).await?)
    }
}
