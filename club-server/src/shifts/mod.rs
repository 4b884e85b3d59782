//! Shift state machine
//!
//! Owns the jornada lifecycle (`preparing → reviewing → open → closed`) and
//! gates everything that hangs off it: staffing while not yet open, the
//! single-open-shift invariant, and the close that materializes the roster
//! into settlement rows.
//!
//! Closing is terminal. Re-using a date goes through `create_shift`, which
//! deletes the replaced jornada explicitly; there is no path that recycles
//! a closed row back to `preparing`.

use crate::audit::AuditAction;
use crate::core::ServerState;
use crate::db::repository::{employee_shift, jornada, register, roster, salary};
use crate::notify::ShiftCloseSummary;
use crate::payroll;
use crate::utils::{money, time, AppError, AppResult};
use shared::models::{Jornada, JornadaState, RosterEntry, ShiftStatus};
use shared::request::{AddRosterEntry, CloseShift, CompleteChecklist, CreateShift, OpenShift};

/// Outcome of a successful close
#[derive(Debug, Clone)]
pub struct CloseOutcome {
    pub jornada: Jornada,
    /// Settlement rows created from the roster
    pub settled_rows: usize,
    /// Register openings force-closed with the shift
    pub registers_closed: u64,
}

/// Jornada lifecycle service
pub struct JornadaService {
    state: ServerState,
}

impl JornadaService {
    pub fn new(state: ServerState) -> Self {
        Self { state }
    }

    fn pool(&self) -> &sqlx::SqlitePool {
        &self.state.pool
    }

    /// Create a jornada for an operating date.
    ///
    /// An open jornada for the date is a conflict. A closed or still
    /// preparing one is replaced: deleted (cascading its roster and
    /// register openings) before the new row is inserted. Schedule
    /// assignments for the date are then copied into the roster; that copy
    /// is non-critical and a failure does not undo the creation.
    pub async fn create_shift(&self, req: CreateShift, created_by: &str) -> AppResult<Jornada> {
        if jornada::find_open_by_date(self.pool(), req.shift_date())
            .await?
            .is_some()
        {
            return Err(AppError::conflict(format!(
                "An open jornada already exists for {}",
                req.shift_date()
            )));
        }

        let bars: Vec<String> = if req.bars().is_empty() {
            vec![
                "Barra Principal".to_string(),
                "Barra Terraza".to_string(),
                "Barra VIP".to_string(),
            ]
        } else {
            req.bars().to_vec()
        };
        let bars_json = serde_json::to_string(&bars)
            .map_err(|e| AppError::internal(format!("Failed to encode bars: {e}")))?;

        let now = shared::util::now_millis();
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| AppError::database(e.to_string()))?;

        let replaced = jornada::delete_replaceable_by_date(&mut tx, req.shift_date()).await?;
        if replaced > 0 {
            tracing::info!(
                shift_date = req.shift_date(),
                replaced,
                "Replaced previous jornada(s) for the date"
            );
        }

        let id = jornada::insert(
            &mut tx,
            req.shift_date(),
            req.shift_type(),
            req.party_name(),
            req.scheduled_open(),
            req.scheduled_close(),
            req.djs(),
            &bars_json,
            now,
        )
        .await?;

        tx.commit()
            .await
            .map_err(|e| AppError::database(e.to_string()))?;

        self.state.shift_cache.invalidate();

        // Non-critical: pre-planned staffing is copied best-effort.
        if let Err(e) = self.copy_schedule(id, req.shift_date(), req.shift_type()).await {
            tracing::warn!(
                jornada_id = id,
                error = %e,
                "Schedule copy failed; jornada created without pre-planned roster"
            );
        }

        let created = jornada::find_by_id(self.pool(), id)
            .await?
            .ok_or_else(|| AppError::internal(format!("Jornada {id} vanished after insert")))?;

        self.state
            .audit
            .log(
                AuditAction::JornadaCreated,
                "jornada",
                id.to_string(),
                None,
                Some(created_by.to_string()),
                serde_json::json!({
                    "shift_date": created.shift_date,
                    "party_name": created.party_name,
                    "replaced": replaced,
                }),
            )
            .await;

        tracing::info!(
            jornada_id = id,
            shift_date = %created.shift_date,
            party = %created.party_name,
            by = created_by,
            "Jornada created"
        );

        Ok(created)
    }

    /// Copy schedule assignments for the date into the roster, freezing pay
    /// per entry. All-or-nothing within itself, but the caller treats a
    /// failure as non-critical.
    async fn copy_schedule(
        &self,
        jornada_id: i64,
        shift_date: &str,
        shift_type: &str,
    ) -> AppResult<usize> {
        let assignments = salary::find_schedule(self.pool(), shift_date, shift_type).await?;
        if assignments.is_empty() {
            return Ok(0);
        }

        let target = jornada::find_by_id(self.pool(), jornada_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Jornada {jornada_id} not found")))?;
        let starts_at = target.scheduled_open.clone();
        let ends_at = target.scheduled_close.clone().unwrap_or_else(|| "05:00".to_string());
        let hours = time::span_hours(&starts_at, &ends_at)?;

        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| AppError::database(e.to_string()))?;
        let now = shared::util::now_millis();
        let mut copied = 0usize;

        for assignment in &assignments {
            match self.state.directory.find(&assignment.worker_id).await {
                Some(profile) if profile.active => {}
                _ => {
                    tracing::warn!(
                        worker_id = %assignment.worker_id,
                        "Scheduled worker unknown or inactive; skipping"
                    );
                    continue;
                }
            }

            if roster::exists_for_worker(&mut tx, jornada_id, &assignment.worker_id).await? {
                tracing::warn!(
                    worker_id = %assignment.worker_id,
                    "Scheduled worker already on the roster; skipping"
                );
                continue;
            }

            let snapshot = payroll::freeze(self.pool(), &assignment.role_name).await?;
            let hourly_cost = snapshot
                .filter(|_| hours > 0.0)
                .map(|s| money::round2(s.total / hours))
                .unwrap_or(0.0);

            roster::insert(
                &mut tx,
                jornada_id,
                &assignment.worker_id,
                &assignment.worker_name,
                &assignment.role_name,
                snapshot.map(|s| s.config_id),
                &starts_at,
                &ends_at,
                hourly_cost,
                money::round2(hourly_cost * hours),
                None,
                snapshot.map(|s| (s.base, s.bonus, s.total)),
                now,
            )
            .await?;
            copied += 1;
        }

        tx.commit()
            .await
            .map_err(|e| AppError::database(e.to_string()))?;

        if copied > 0 {
            tracing::info!(jornada_id, copied, "Schedule assignments copied to roster");
        }
        Ok(copied)
    }

    /// Add one worker to the roster, freezing pay from the role's current
    /// configuration
    pub async fn add_roster_entry(&self, req: AddRosterEntry) -> AppResult<RosterEntry> {
        let target = jornada::find_by_id(self.pool(), req.jornada_id())
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("Jornada {} not found", req.jornada_id()))
            })?;

        match target.state {
            JornadaState::Open => {
                return Err(AppError::conflict(
                    "Cannot modify the roster of an open jornada",
                ));
            }
            JornadaState::Closed => {
                return Err(AppError::conflict(
                    "Cannot modify the roster of a closed jornada",
                ));
            }
            JornadaState::Preparing | JornadaState::Reviewing => {}
        }

        let hours = time::span_hours(req.starts_at(), req.ends_at())?;
        let total_cost = money::round2(req.hourly_cost() * hours);
        let snapshot = payroll::freeze(self.pool(), req.role_name()).await?;

        let now = shared::util::now_millis();
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| AppError::database(e.to_string()))?;

        if roster::exists_for_worker(&mut tx, req.jornada_id(), req.worker_id()).await? {
            return Err(AppError::conflict(format!(
                "Worker {} is already on the roster of jornada {}",
                req.worker_id(),
                req.jornada_id()
            )));
        }

        let id = roster::insert(
            &mut tx,
            req.jornada_id(),
            req.worker_id(),
            req.worker_name(),
            req.role_name(),
            snapshot.map(|s| s.config_id),
            req.starts_at(),
            req.ends_at(),
            req.hourly_cost(),
            total_cost,
            req.area(),
            snapshot.map(|s| (s.base, s.bonus, s.total)),
            now,
        )
        .await?;

        tx.commit()
            .await
            .map_err(|e| AppError::database(e.to_string()))?;

        self.state
            .audit
            .log(
                AuditAction::RosterEntryAdded,
                "roster_entry",
                id.to_string(),
                None,
                None,
                serde_json::json!({
                    "jornada_id": req.jornada_id(),
                    "worker_id": req.worker_id(),
                    "role": req.role_name(),
                    "frozen_total": snapshot.map(|s| s.total),
                }),
            )
            .await;

        tracing::info!(
            jornada_id = req.jornada_id(),
            worker = req.worker_name(),
            role = req.role_name(),
            frozen = snapshot.is_some(),
            "Worker added to roster"
        );

        Ok(roster::get(self.pool(), id).await?)
    }

    /// Remove a worker from the roster of a not-yet-open jornada
    pub async fn remove_roster_entry(&self, entry_id: i64) -> AppResult<bool> {
        let entry = roster::get(self.pool(), entry_id).await?;
        let parent = jornada::find_by_id(self.pool(), entry.jornada_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("Jornada {} not found", entry.jornada_id))
            })?;
        if matches!(parent.state, JornadaState::Open | JornadaState::Closed) {
            return Err(AppError::conflict(format!(
                "Cannot remove roster entries from a jornada in state '{}'",
                parent.state.as_str()
            )));
        }

        let removed = roster::delete(self.pool(), entry_id).await?;
        if removed {
            self.state
                .audit
                .log(
                    AuditAction::RosterEntryRemoved,
                    "roster_entry",
                    entry_id.to_string(),
                    None,
                    None,
                    serde_json::json!({
                        "jornada_id": entry.jornada_id,
                        "worker_id": entry.worker_id,
                    }),
                )
                .await;
        }
        Ok(removed)
    }

    /// Store the technical checklist; moves `preparing` to `reviewing`.
    /// Informational for opening, never a hard gate.
    pub async fn complete_technical_checklist(
        &self,
        req: CompleteChecklist,
    ) -> AppResult<Jornada> {
        let checklist_json = serde_json::to_string(req.checklist())
            .map_err(|e| AppError::internal(format!("Failed to encode checklist: {e}")))?;
        let now = shared::util::now_millis();

        let updated =
            jornada::set_checklist(self.pool(), req.jornada_id(), &checklist_json, now).await?;

        self.state
            .audit
            .log(
                AuditAction::ChecklistCompleted,
                "jornada",
                req.jornada_id().to_string(),
                None,
                None,
                serde_json::json!({ "items": req.checklist().len() }),
            )
            .await;

        Ok(updated)
    }

    /// Open the venue. The only hard precondition is a non-empty roster;
    /// register openings and the checklist are informational.
    pub async fn open_shift(&self, req: OpenShift) -> AppResult<Jornada> {
        let target = jornada::find_by_id(self.pool(), req.jornada_id())
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("Jornada {} not found", req.jornada_id()))
            })?;

        match target.state {
            JornadaState::Open => {
                return Err(AppError::conflict("Jornada is already open"));
            }
            JornadaState::Closed => {
                return Err(AppError::conflict("Jornada is closed and cannot reopen"));
            }
            JornadaState::Preparing | JornadaState::Reviewing => {}
        }

        let staffed = roster::count_by_jornada(self.pool(), req.jornada_id()).await?;
        if staffed == 0 {
            return Err(AppError::validation(format!(
                "Jornada {} has no roster entries; staff it before opening",
                req.jornada_id()
            )));
        }

        let now = shared::util::now_millis();
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| AppError::database(e.to_string()))?;

        // The partial unique index turns a lost race into a Conflict here.
        let rows = jornada::mark_open(&mut tx, req.jornada_id(), req.opened_by(), now).await?;
        if rows == 0 {
            return Err(AppError::conflict(
                "Jornada state changed concurrently; refresh and retry",
            ));
        }

        tx.commit()
            .await
            .map_err(|e| AppError::database(e.to_string()))?;

        self.state.shift_cache.invalidate();

        self.state
            .audit
            .log(
                AuditAction::JornadaOpened,
                "jornada",
                req.jornada_id().to_string(),
                None,
                Some(req.opened_by().to_string()),
                serde_json::json!({
                    "shift_date": target.shift_date,
                    "roster_size": staffed,
                }),
            )
            .await;

        tracing::info!(
            jornada_id = req.jornada_id(),
            shift_date = %target.shift_date,
            by = req.opened_by(),
            "Venue opened"
        );

        jornada::find_by_id(self.pool(), req.jornada_id())
            .await?
            .ok_or_else(|| AppError::internal("Jornada vanished after open"))
    }

    /// Close an open jornada.
    ///
    /// One transaction: the state flip, the materialization of every roster
    /// entry into a settlement row, and the force-close of still-open
    /// register openings commit or roll back together. The close
    /// notification fires after commit, at most once.
    pub async fn close_shift(&self, req: CloseShift) -> AppResult<CloseOutcome> {
        let now = shared::util::now_millis();
        let close_clock = time::clock_now(self.state.config.timezone);

        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| AppError::database(e.to_string()))?;

        // Claim first: the conditional write takes the database write lock,
        // so the state re-check below sees a serialized view.
        let rows = jornada::mark_closed(
            &mut tx,
            req.jornada_id(),
            req.closed_by(),
            &close_clock,
            now,
        )
        .await?;

        let target = jornada::find_by_id_tx(&mut tx, req.jornada_id())
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("Jornada {} not found", req.jornada_id()))
            })?;
        if rows == 0 {
            return Err(AppError::conflict(format!(
                "Jornada {} is not open (state '{}')",
                target.id,
                target.state.as_str()
            )));
        }

        let entries = roster::find_by_jornada_tx(&mut tx, target.id).await?;

        for entry in &entries {
            employee_shift::insert_from_roster(&mut tx, &target, entry, now).await?;
            if !entry.is_frozen() {
                tracing::warn!(
                    entry_id = entry.id,
                    worker = %entry.worker_name,
                    "Settlement row created without a frozen amount; override required before payment"
                );
            }
        }

        let registers_closed = register::close_all_openings(&mut tx, target.id).await?;

        tx.commit()
            .await
            .map_err(|e| AppError::database(e.to_string()))?;

        self.state.shift_cache.invalidate();

        self.state
            .audit
            .log(
                AuditAction::JornadaClosed,
                "jornada",
                target.id.to_string(),
                None,
                Some(req.closed_by().to_string()),
                serde_json::json!({
                    "shift_date": target.shift_date,
                    "settled_rows": entries.len(),
                    "registers_closed": registers_closed,
                }),
            )
            .await;

        let summary = ShiftCloseSummary {
            jornada_id: target.id,
            shift_date: target.shift_date.clone(),
            party_name: target.party_name.clone(),
            closed_by: req.closed_by().to_string(),
            closed_at: now,
            settled_rows: entries.len(),
            registers_closed,
        };
        let notifier = self.state.notifier.clone();
        tokio::spawn(async move {
            notifier.shift_closed(&summary).await;
        });

        tracing::info!(
            jornada_id = target.id,
            shift_date = %target.shift_date,
            settled_rows = entries.len(),
            registers_closed,
            by = req.closed_by(),
            "Jornada closed"
        );

        Ok(CloseOutcome {
            jornada: target,
            settled_rows: entries.len(),
            registers_closed,
        })
    }

    /// Current operating status through the boundary cache; the database
    /// stays the source of truth.
    pub async fn current_status(&self) -> AppResult<ShiftStatus> {
        if let Some(cached) = self.state.shift_cache.get() {
            return Ok(cached);
        }

        let status = match jornada::find_any_open(self.pool()).await? {
            Some(open) => ShiftStatus::of(&open),
            None => ShiftStatus::closed(),
        };
        self.state.shift_cache.put(status.clone());
        Ok(status)
    }

    pub async fn get(&self, jornada_id: i64) -> AppResult<Jornada> {
        Ok(jornada::find_by_id(self.pool(), jornada_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Jornada {jornada_id} not found")))?)
    }

    pub async fn list(&self, limit: i32, offset: i32) -> AppResult<Vec<Jornada>> {
        Ok(jornada::find_all(self.pool(), limit, offset).await?)
    }

    pub async fn roster(&self, jornada_id: i64) -> AppResult<Vec<RosterEntry>> {
        Ok(roster::find_by_jornada(self.pool(), jornada_id).await?)
    }
}
