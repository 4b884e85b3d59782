//! Typed operation requests
//!
//! One request type per engine operation, validated at construction: the
//! factories are the only way to build one, so an invalid instance cannot
//! reach the services. Fields are read through accessors.

use crate::models::register::TenderTotals;
use crate::models::settlement::AdvanceKind;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Request construction failure (malformed or missing input)
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct RequestError(pub String);

type Result<T> = std::result::Result<T, RequestError>;

// ── Validation helpers ───────────────────────────────────────

const MAX_NAME_LEN: usize = 200;
const MAX_NOTE_LEN: usize = 500;
const MAX_ID_LEN: usize = 50;

fn require_text(value: &str, field: &str, max_len: usize) -> Result<()> {
    if value.trim().is_empty() {
        return Err(RequestError(format!("{field} must not be empty")));
    }
    if value.len() > max_len {
        return Err(RequestError(format!(
            "{field} is too long ({} chars, max {max_len})",
            value.len()
        )));
    }
    Ok(())
}

fn optional_text(value: &Option<String>, field: &str, max_len: usize) -> Result<()> {
    if let Some(v) = value {
        if v.len() > max_len {
            return Err(RequestError(format!(
                "{field} is too long ({} chars, max {max_len})",
                v.len()
            )));
        }
    }
    Ok(())
}

fn require_date(value: &str, field: &str) -> Result<()> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| RequestError(format!("{field} must be YYYY-MM-DD, got '{value}'")))
}

fn require_clock(value: &str, field: &str) -> Result<()> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .map(|_| ())
        .map_err(|_| RequestError(format!("{field} must be HH:MM, got '{value}'")))
}

fn require_money(value: f64, field: &str) -> Result<()> {
    if !value.is_finite() {
        return Err(RequestError(format!(
            "{field} must be a finite number, got {value}"
        )));
    }
    if value < 0.0 {
        return Err(RequestError(format!(
            "{field} must be non-negative, got {value}"
        )));
    }
    Ok(())
}

fn require_tenders(t: &TenderTotals, prefix: &str) -> Result<()> {
    require_money(t.cash, &format!("{prefix}.cash"))?;
    require_money(t.debit, &format!("{prefix}.debit"))?;
    require_money(t.credit, &format!("{prefix}.credit"))?;
    Ok(())
}

// ── CreateShift ──────────────────────────────────────────────

/// Create a jornada for an operating date
#[derive(Debug, Clone, Serialize)]
pub struct CreateShift {
    shift_date: String,
    shift_type: String,
    party_name: String,
    scheduled_open: String,
    scheduled_close: Option<String>,
    djs: Option<String>,
    bars: Vec<String>,
}

impl CreateShift {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        shift_date: impl Into<String>,
        shift_type: impl Into<String>,
        party_name: impl Into<String>,
        scheduled_open: impl Into<String>,
        scheduled_close: Option<String>,
        djs: Option<String>,
        bars: Vec<String>,
    ) -> Result<Self> {
        let shift_date = shift_date.into();
        let shift_type = shift_type.into();
        let party_name = party_name.into();
        let scheduled_open = scheduled_open.into();

        require_date(&shift_date, "shift_date")?;
        require_text(&shift_type, "shift_type", MAX_ID_LEN)?;
        require_text(&party_name, "party_name", MAX_NAME_LEN)?;
        require_clock(&scheduled_open, "scheduled_open")?;
        if let Some(ref close) = scheduled_close {
            require_clock(close, "scheduled_close")?;
        }
        optional_text(&djs, "djs", MAX_NAME_LEN)?;
        for bar in &bars {
            require_text(bar, "bars[]", MAX_NAME_LEN)?;
        }

        Ok(Self {
            shift_date,
            shift_type,
            party_name,
            scheduled_open,
            scheduled_close,
            djs,
            bars,
        })
    }

    pub fn shift_date(&self) -> &str {
        &self.shift_date
    }
    pub fn shift_type(&self) -> &str {
        &self.shift_type
    }
    pub fn party_name(&self) -> &str {
        &self.party_name
    }
    pub fn scheduled_open(&self) -> &str {
        &self.scheduled_open
    }
    pub fn scheduled_close(&self) -> Option<&str> {
        self.scheduled_close.as_deref()
    }
    pub fn djs(&self) -> Option<&str> {
        self.djs.as_deref()
    }
    pub fn bars(&self) -> &[String] {
        &self.bars
    }
}

// ── AddRosterEntry ───────────────────────────────────────────

/// Put a worker on the roster of a jornada
#[derive(Debug, Clone, Serialize)]
pub struct AddRosterEntry {
    jornada_id: i64,
    worker_id: String,
    worker_name: String,
    role_name: String,
    starts_at: String,
    ends_at: String,
    hourly_cost: f64,
    area: Option<String>,
}

impl AddRosterEntry {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        jornada_id: i64,
        worker_id: impl Into<String>,
        worker_name: impl Into<String>,
        role_name: impl Into<String>,
        starts_at: impl Into<String>,
        ends_at: impl Into<String>,
        hourly_cost: f64,
        area: Option<String>,
    ) -> Result<Self> {
        let worker_id = worker_id.into();
        let worker_name = worker_name.into();
        let role_name = role_name.into();
        let starts_at = starts_at.into();
        let ends_at = ends_at.into();

        require_text(&worker_id, "worker_id", MAX_ID_LEN)?;
        require_text(&worker_name, "worker_name", MAX_NAME_LEN)?;
        require_text(&role_name, "role_name", MAX_ID_LEN)?;
        require_clock(&starts_at, "starts_at")?;
        require_clock(&ends_at, "ends_at")?;
        require_money(hourly_cost, "hourly_cost")?;
        optional_text(&area, "area", MAX_NAME_LEN)?;

        Ok(Self {
            jornada_id,
            worker_id,
            worker_name,
            role_name,
            starts_at,
            ends_at,
            hourly_cost,
            area,
        })
    }

    pub fn jornada_id(&self) -> i64 {
        self.jornada_id
    }
    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }
    pub fn worker_name(&self) -> &str {
        &self.worker_name
    }
    pub fn role_name(&self) -> &str {
        &self.role_name
    }
    pub fn starts_at(&self) -> &str {
        &self.starts_at
    }
    pub fn ends_at(&self) -> &str {
        &self.ends_at
    }
    pub fn hourly_cost(&self) -> f64 {
        self.hourly_cost
    }
    pub fn area(&self) -> Option<&str> {
        self.area.as_deref()
    }
}

// ── OpenRegister ─────────────────────────────────────────────

/// Open one physical register for a jornada
#[derive(Debug, Clone, Serialize)]
pub struct OpenRegister {
    jornada_id: i64,
    register_id: String,
    register_name: String,
    cashier_id: String,
    cashier_name: String,
    initial_float: f64,
    opened_by: String,
}

impl OpenRegister {
    pub fn new(
        jornada_id: i64,
        register_id: impl Into<String>,
        register_name: impl Into<String>,
        cashier_id: impl Into<String>,
        cashier_name: impl Into<String>,
        initial_float: f64,
        opened_by: impl Into<String>,
    ) -> Result<Self> {
        let register_id = register_id.into();
        let register_name = register_name.into();
        let cashier_id = cashier_id.into();
        let cashier_name = cashier_name.into();
        let opened_by = opened_by.into();

        require_text(&register_id, "register_id", MAX_ID_LEN)?;
        require_text(&register_name, "register_name", MAX_NAME_LEN)?;
        require_text(&cashier_id, "cashier_id", MAX_ID_LEN)?;
        require_text(&cashier_name, "cashier_name", MAX_NAME_LEN)?;
        require_money(initial_float, "initial_float")?;
        require_text(&opened_by, "opened_by", MAX_NAME_LEN)?;

        Ok(Self {
            jornada_id,
            register_id,
            register_name,
            cashier_id,
            cashier_name,
            initial_float,
            opened_by,
        })
    }

    pub fn jornada_id(&self) -> i64 {
        self.jornada_id
    }
    pub fn register_id(&self) -> &str {
        &self.register_id
    }
    pub fn register_name(&self) -> &str {
        &self.register_name
    }
    pub fn cashier_id(&self) -> &str {
        &self.cashier_id
    }
    pub fn cashier_name(&self) -> &str {
        &self.cashier_name
    }
    pub fn initial_float(&self) -> f64 {
        self.initial_float
    }
    pub fn opened_by(&self) -> &str {
        &self.opened_by
    }
}

// ── CompleteChecklist ────────────────────────────────────────

/// Store the technical checklist for a jornada
#[derive(Debug, Clone, Serialize)]
pub struct CompleteChecklist {
    jornada_id: i64,
    checklist: BTreeMap<String, bool>,
}

impl CompleteChecklist {
    pub fn new(jornada_id: i64, checklist: BTreeMap<String, bool>) -> Result<Self> {
        if checklist.is_empty() {
            return Err(RequestError("checklist must not be empty".into()));
        }
        for key in checklist.keys() {
            require_text(key, "checklist key", MAX_NAME_LEN)?;
        }
        Ok(Self {
            jornada_id,
            checklist,
        })
    }

    pub fn jornada_id(&self) -> i64 {
        self.jornada_id
    }
    pub fn checklist(&self) -> &BTreeMap<String, bool> {
        &self.checklist
    }
}

// ── OpenShift / CloseShift ───────────────────────────────────

/// Open the venue for a prepared jornada
#[derive(Debug, Clone, Serialize)]
pub struct OpenShift {
    jornada_id: i64,
    opened_by: String,
}

impl OpenShift {
    pub fn new(jornada_id: i64, opened_by: impl Into<String>) -> Result<Self> {
        let opened_by = opened_by.into();
        require_text(&opened_by, "opened_by", MAX_NAME_LEN)?;
        Ok(Self {
            jornada_id,
            opened_by,
        })
    }

    pub fn jornada_id(&self) -> i64 {
        self.jornada_id
    }
    pub fn opened_by(&self) -> &str {
        &self.opened_by
    }
}

/// Close an open jornada, settling its staffing into payable rows
#[derive(Debug, Clone, Serialize)]
pub struct CloseShift {
    jornada_id: i64,
    closed_by: String,
}

impl CloseShift {
    pub fn new(jornada_id: i64, closed_by: impl Into<String>) -> Result<Self> {
        let closed_by = closed_by.into();
        require_text(&closed_by, "closed_by", MAX_NAME_LEN)?;
        Ok(Self {
            jornada_id,
            closed_by,
        })
    }

    pub fn jornada_id(&self) -> i64 {
        self.jornada_id
    }
    pub fn closed_by(&self) -> &str {
        &self.closed_by
    }
}

// ── DeliverItem ──────────────────────────────────────────────

/// Redeem a quantity of one item from one ticket
///
/// `sold_qty` and `sale_timestamp_ms` come from the point-of-sale mirror,
/// which is an external collaborator.
#[derive(Debug, Clone, Serialize)]
pub struct DeliverItem {
    ticket_id: String,
    item_name: String,
    qty: i64,
    sold_qty: i64,
    sale_timestamp_ms: Option<i64>,
    server_id: String,
    server_name: String,
    bar: String,
}

impl DeliverItem {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ticket_id: impl Into<String>,
        item_name: impl Into<String>,
        qty: i64,
        sold_qty: i64,
        sale_timestamp_ms: Option<i64>,
        server_id: impl Into<String>,
        server_name: impl Into<String>,
        bar: impl Into<String>,
    ) -> Result<Self> {
        let ticket_id = ticket_id.into();
        let item_name = item_name.into();
        let server_id = server_id.into();
        let server_name = server_name.into();
        let bar = bar.into();

        require_text(&ticket_id, "ticket_id", MAX_ID_LEN)?;
        require_text(&item_name, "item_name", MAX_NAME_LEN)?;
        if qty <= 0 {
            return Err(RequestError(format!("qty must be positive, got {qty}")));
        }
        if sold_qty < 0 {
            return Err(RequestError(format!(
                "sold_qty must be non-negative, got {sold_qty}"
            )));
        }
        require_text(&server_id, "server_id", MAX_ID_LEN)?;
        require_text(&server_name, "server_name", MAX_NAME_LEN)?;
        require_text(&bar, "bar", MAX_NAME_LEN)?;

        Ok(Self {
            ticket_id,
            item_name,
            qty,
            sold_qty,
            sale_timestamp_ms,
            server_id,
            server_name,
            bar,
        })
    }

    pub fn ticket_id(&self) -> &str {
        &self.ticket_id
    }
    pub fn item_name(&self) -> &str {
        &self.item_name
    }
    pub fn qty(&self) -> i64 {
        self.qty
    }
    pub fn sold_qty(&self) -> i64 {
        self.sold_qty
    }
    pub fn sale_timestamp_ms(&self) -> Option<i64> {
        self.sale_timestamp_ms
    }
    pub fn server_id(&self) -> &str {
        &self.server_id
    }
    pub fn server_name(&self) -> &str {
        &self.server_name
    }
    pub fn bar(&self) -> &str {
        &self.bar
    }
}

// ── CloseRegister ────────────────────────────────────────────

/// Count and close one register, writing a reconciliation record
#[derive(Debug, Clone, Serialize)]
pub struct CloseRegister {
    register_id: String,
    jornada_id: i64,
    cashier_id: String,
    cashier_name: String,
    expected: TenderTotals,
    actual: TenderTotals,
    total_sales: i64,
    total_amount: Option<f64>,
    notes: Option<String>,
}

impl CloseRegister {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        register_id: impl Into<String>,
        jornada_id: i64,
        cashier_id: impl Into<String>,
        cashier_name: impl Into<String>,
        expected: TenderTotals,
        actual: TenderTotals,
        total_sales: i64,
        total_amount: Option<f64>,
        notes: Option<String>,
    ) -> Result<Self> {
        let register_id = register_id.into();
        let cashier_id = cashier_id.into();
        let cashier_name = cashier_name.into();

        require_text(&register_id, "register_id", MAX_ID_LEN)?;
        require_text(&cashier_id, "cashier_id", MAX_ID_LEN)?;
        require_text(&cashier_name, "cashier_name", MAX_NAME_LEN)?;
        require_tenders(&expected, "expected")?;
        require_tenders(&actual, "actual")?;
        if total_sales < 0 {
            return Err(RequestError(format!(
                "total_sales must be non-negative, got {total_sales}"
            )));
        }
        if let Some(amount) = total_amount {
            require_money(amount, "total_amount")?;
        }
        optional_text(&notes, "notes", MAX_NOTE_LEN)?;

        Ok(Self {
            register_id,
            jornada_id,
            cashier_id,
            cashier_name,
            expected,
            actual,
            total_sales,
            total_amount,
            notes,
        })
    }

    pub fn register_id(&self) -> &str {
        &self.register_id
    }
    pub fn jornada_id(&self) -> i64 {
        self.jornada_id
    }
    pub fn cashier_id(&self) -> &str {
        &self.cashier_id
    }
    pub fn cashier_name(&self) -> &str {
        &self.cashier_name
    }
    pub fn expected(&self) -> TenderTotals {
        self.expected
    }
    pub fn actual(&self) -> TenderTotals {
        self.actual
    }
    pub fn total_sales(&self) -> i64 {
        self.total_sales
    }
    pub fn total_amount(&self) -> Option<f64> {
        self.total_amount
    }
    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }
}

// ── MarkPaid ─────────────────────────────────────────────────

/// Request metadata recorded with financial mutations for audit
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestMeta {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub request_path: Option<String>,
}

/// Mark one settlement row as paid
#[derive(Debug, Clone, Serialize)]
pub struct MarkPaid {
    row_id: i64,
    actor: String,
    meta: RequestMeta,
}

impl MarkPaid {
    pub fn new(row_id: i64, actor: impl Into<String>, meta: RequestMeta) -> Result<Self> {
        let actor = actor.into();
        require_text(&actor, "actor", MAX_NAME_LEN)?;
        Ok(Self {
            row_id,
            actor,
            meta,
        })
    }

    pub fn row_id(&self) -> i64 {
        self.row_id
    }
    pub fn actor(&self) -> &str {
        &self.actor
    }
    pub fn meta(&self) -> &RequestMeta {
        &self.meta
    }
}

// ── CreateAdvance ────────────────────────────────────────────

/// Create an advance or deduction against a worker's pending settlement
#[derive(Debug, Clone, Serialize)]
pub struct CreateAdvance {
    worker_id: String,
    worker_name: String,
    kind: AdvanceKind,
    amount: f64,
    description: Option<String>,
    advance_date: String,
    created_by: String,
}

impl CreateAdvance {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        worker_id: impl Into<String>,
        worker_name: impl Into<String>,
        kind: AdvanceKind,
        amount: f64,
        description: Option<String>,
        advance_date: impl Into<String>,
        created_by: impl Into<String>,
    ) -> Result<Self> {
        let worker_id = worker_id.into();
        let worker_name = worker_name.into();
        let advance_date = advance_date.into();
        let created_by = created_by.into();

        require_text(&worker_id, "worker_id", MAX_ID_LEN)?;
        require_text(&worker_name, "worker_name", MAX_NAME_LEN)?;
        if !amount.is_finite() {
            return Err(RequestError(format!(
                "amount must be a finite number, got {amount}"
            )));
        }
        if amount == 0.0 {
            return Err(RequestError("amount must not be zero".into()));
        }
        optional_text(&description, "description", MAX_NOTE_LEN)?;
        require_date(&advance_date, "advance_date")?;
        require_text(&created_by, "created_by", MAX_NAME_LEN)?;

        Ok(Self {
            worker_id,
            worker_name,
            kind,
            amount,
            description,
            advance_date,
            created_by,
        })
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }
    pub fn worker_name(&self) -> &str {
        &self.worker_name
    }
    pub fn kind(&self) -> AdvanceKind {
        self.kind
    }
    pub fn amount(&self) -> f64 {
        self.amount
    }
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
    pub fn advance_date(&self) -> &str {
        &self.advance_date
    }
    pub fn created_by(&self) -> &str {
        &self.created_by
    }
}

// ── OverridePayment ──────────────────────────────────────────

/// Replace a frozen roster payment with an explicit value
///
/// The justification is mandatory; overrides are permanent until overridden
/// again.
#[derive(Debug, Clone, Serialize)]
pub struct OverridePayment {
    entry_id: i64,
    new_total: f64,
    reason: String,
    author: String,
}

impl OverridePayment {
    pub fn new(
        entry_id: i64,
        new_total: f64,
        reason: impl Into<String>,
        author: impl Into<String>,
    ) -> Result<Self> {
        let reason = reason.into();
        let author = author.into();
        require_money(new_total, "new_total")?;
        require_text(&reason, "reason", MAX_NOTE_LEN)?;
        require_text(&author, "author", MAX_NAME_LEN)?;
        Ok(Self {
            entry_id,
            new_total,
            reason,
            author,
        })
    }

    pub fn entry_id(&self) -> i64 {
        self.entry_id
    }
    pub fn new_total(&self) -> f64 {
        self.new_total
    }
    pub fn reason(&self) -> &str {
        &self.reason
    }
    pub fn author(&self) -> &str {
        &self.author
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_shift_rejects_bad_date_and_times() {
        assert!(CreateShift::new("06/01/2025", "Noche", "Fiesta", "22:00", None, None, vec![])
            .is_err());
        assert!(CreateShift::new("2025-06-01", "Noche", "Fiesta", "25:99", None, None, vec![])
            .is_err());
        assert!(
            CreateShift::new("2025-06-01", "Noche", "", "22:00", None, None, vec![]).is_err()
        );
        assert!(
            CreateShift::new("2025-06-01", "Noche", "Fiesta", "22:00", None, None, vec![])
                .is_ok()
        );
    }

    #[test]
    fn roster_entry_rejects_negative_cost() {
        let r = AddRosterEntry::new(1, "W1", "Ana", "BARRA", "22:00", "04:00", -1.0, None);
        assert!(r.is_err());
    }

    #[test]
    fn deliver_item_requires_positive_qty() {
        assert!(
            DeliverItem::new("BMB 1001", "Mojito", 0, 2, None, "S1", "Pedro", "Barra").is_err()
        );
        assert!(
            DeliverItem::new("BMB 1001", "Mojito", 1, 2, None, "S1", "Pedro", "Barra").is_ok()
        );
    }

    #[test]
    fn advance_rejects_zero_amount() {
        let r = CreateAdvance::new(
            "W1",
            "Ana",
            AdvanceKind::Advance,
            0.0,
            None,
            "2025-06-01",
            "admin",
        );
        assert!(r.is_err());
    }

    #[test]
    fn override_requires_reason() {
        assert!(OverridePayment::new(1, 10000.0, "  ", "admin").is_err());
        assert!(OverridePayment::new(1, 10000.0, "agreed rate", "admin").is_ok());
    }

    #[test]
    fn close_register_rejects_non_finite_tenders() {
        let bad = TenderTotals::new(f64::NAN, 0.0, 0.0);
        let ok = TenderTotals::default();
        assert!(CloseRegister::new("C1", 1, "E1", "Eva", bad, ok, 0, None, None).is_err());
        assert!(CloseRegister::new("C1", 1, "E1", "Eva", ok, ok, 0, None, None).is_ok());
    }
}
