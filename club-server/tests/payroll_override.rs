//! Payroll override path: fixing unfrozen assignments, the mandatory
//! justification, and the closed-jornada guard.

mod common;

use club_server::payroll::PayrollService;
use club_server::settlement::SettlementService;
use club_server::shifts::JornadaService;
use club_server::utils::AppError;
use shared::request::{CloseShift, MarkPaid, OverridePayment, RequestMeta};

#[tokio::test]
async fn override_fixes_an_unfrozen_assignment() {
    let env = common::setup().await;
    // No config for PUERTA: the assignment starts unfrozen
    let payroll = PayrollService::new(env.state.clone());
    let shifts = JornadaService::new(env.state.clone());

    let id = common::create_jornada(&env, "2025-06-01").await;
    let entry_id = common::staff(&env, id, "W1", "Ana", "PUERTA").await;

    let entry = club_server::db::repository::roster::get(&env.state.pool, entry_id)
        .await
        .unwrap();
    assert!(!entry.is_frozen());

    let fixed = payroll
        .override_payment(
            OverridePayment::new(entry_id, 18000.0, "agreed flat rate for the night", "gerente")
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(fixed.total_payment, Some(18000.0));
    assert!(fixed.is_override);
    assert_eq!(fixed.override_by.as_deref(), Some("gerente"));
    assert!(fixed.override_at.is_some());

    // The override value flows through close into settlement
    common::open(&env, id).await;
    shifts
        .close_shift(CloseShift::new(id, "admin").unwrap())
        .await
        .unwrap();
    let rows = club_server::db::repository::employee_shift::find_by_jornada(&env.state.pool, id)
        .await
        .unwrap();
    assert_eq!(rows[0].total_payment, Some(18000.0));

    let settlement = SettlementService::new(env.state.clone());
    let paid = settlement
        .mark_paid(MarkPaid::new(rows[0].id, "admin", RequestMeta::default()).unwrap())
        .await
        .unwrap();
    assert_eq!(paid.total_payment, Some(18000.0));
}

#[tokio::test]
async fn override_replaces_a_frozen_total_until_overridden_again() {
    let env = common::setup().await;
    common::seed_role(&env, "BARRA", 20000.0, 5000.0).await;
    let payroll = PayrollService::new(env.state.clone());

    let id = common::create_jornada(&env, "2025-06-01").await;
    let entry_id = common::staff(&env, id, "W1", "Ana", "BARRA").await;

    let first = payroll
        .override_payment(OverridePayment::new(entry_id, 27000.0, "covered extra bar", "gerente").unwrap())
        .await
        .unwrap();
    assert_eq!(first.total_payment, Some(27000.0));

    // Overrides are permanent until explicitly overridden again
    let second = payroll
        .override_payment(
            OverridePayment::new(entry_id, 26000.0, "corrected after review", "gerente").unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(second.total_payment, Some(26000.0));
    assert_eq!(second.override_reason.as_deref(), Some("corrected after review"));

    // The base/bonus snapshot stays as frozen at assignment time
    assert_eq!(second.base_snapshot, Some(20000.0));
    assert_eq!(second.bonus_snapshot, Some(5000.0));
}

#[tokio::test]
async fn override_is_rejected_after_close() {
    let env = common::setup().await;
    common::seed_role(&env, "BARRA", 20000.0, 5000.0).await;
    let payroll = PayrollService::new(env.state.clone());
    let shifts = JornadaService::new(env.state.clone());

    let id = common::open_staffed_jornada(&env, "2025-06-01", "W1").await;
    let roster = shifts.roster(id).await.unwrap();
    shifts
        .close_shift(CloseShift::new(id, "admin").unwrap())
        .await
        .unwrap();

    let err = payroll
        .override_payment(
            OverridePayment::new(roster[0].id, 30000.0, "too late", "gerente").unwrap(),
        )
        .await
        .unwrap_err();
    assert!(err.is_conflict(), "got {err:?}");
}

#[tokio::test]
async fn override_requires_an_existing_entry() {
    let env = common::setup().await;
    let payroll = PayrollService::new(env.state.clone());

    let err = payroll
        .override_payment(OverridePayment::new(424242, 1000.0, "ghost", "gerente").unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)), "got {err:?}");
}
