//! Settlement: idempotent mark-paid under concurrency, frozen amounts,
//! bulk payment with advances, and the transactionally-bound audit trail.

mod common;

use club_server::audit::{AuditAction, AuditQuery};
use club_server::settlement::SettlementService;
use club_server::shifts::JornadaService;
use club_server::utils::AppError;
use shared::models::AdvanceKind;
use shared::request::{CloseShift, CreateAdvance, MarkPaid, RequestMeta};

/// Close a one-worker jornada and return the settlement row id
async fn settle_one_row(env: &common::TestEnv, date: &str, worker_id: &str) -> i64 {
    let shifts = JornadaService::new(env.state.clone());
    let id = common::open_staffed_jornada(env, date, worker_id).await;
    shifts
        .close_shift(CloseShift::new(id, "admin").unwrap())
        .await
        .unwrap();
    let rows = club_server::db::repository::employee_shift::find_by_jornada(&env.state.pool, id)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    rows[0].id
}

fn mark_req(row_id: i64) -> MarkPaid {
    MarkPaid::new(
        row_id,
        "admin",
        RequestMeta {
            ip_address: Some("10.0.0.5".into()),
            user_agent: Some("tests".into()),
            request_path: Some("/equipo/marcar-pagado".into()),
        },
    )
    .unwrap()
}

#[tokio::test]
async fn mark_paid_freezes_the_amount_forever() {
    let env = common::setup().await;
    common::seed_role(&env, "BARRA", 20000.0, 5000.0).await;
    let service = SettlementService::new(env.state.clone());

    let row_id = settle_one_row(&env, "2025-06-01", "W1").await;

    let paid = service.mark_paid(mark_req(row_id)).await.unwrap();
    assert!(paid.paid);
    assert!(paid.paid_at.is_some());
    assert_eq!(paid.total_payment, Some(25000.0));

    // Later config edits change nothing on the paid row
    common::seed_role(&env, "BARRA", 99999.0, 0.0).await;
    let row = club_server::db::repository::employee_shift::get(&env.state.pool, row_id)
        .await
        .unwrap();
    assert_eq!(row.total_payment, Some(25000.0));

    // Every further mark_paid is a conflict and mutates nothing
    for _ in 0..3 {
        let err = service.mark_paid(mark_req(row_id)).await.unwrap_err();
        assert!(err.is_conflict(), "got {err:?}");
    }
    let row = club_server::db::repository::employee_shift::get(&env.state.pool, row_id)
        .await
        .unwrap();
    assert_eq!(row.total_payment, Some(25000.0));
    assert_eq!(row.paid_at, paid.paid_at);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_mark_paid_has_exactly_one_winner() {
    let env = common::setup().await;
    common::seed_role(&env, "BARRA", 20000.0, 5000.0).await;

    let row_id = settle_one_row(&env, "2025-06-01", "W1").await;

    const CALLERS: usize = 8;
    let mut handles = Vec::with_capacity(CALLERS);
    for _ in 0..CALLERS {
        let state = env.state.clone();
        handles.push(tokio::spawn(async move {
            SettlementService::new(state).mark_paid(mark_req(row_id)).await
        }));
    }

    let mut ok = 0usize;
    let mut conflicts = 0usize;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => ok += 1,
            Err(e) if e.is_conflict() => conflicts += 1,
            Err(e) => panic!("unexpected error: {e:?}"),
        }
    }
    assert_eq!(ok, 1);
    assert_eq!(conflicts, CALLERS - 1);

    // Exactly one audit entry for the row
    let (entries, _) = env
        .state
        .audit
        .query(&AuditQuery {
            action: Some(AuditAction::SettlementPaid),
            resource_type: Some("employee_shift".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    let for_row: Vec<_> = entries
        .iter()
        .filter(|e| e.resource_id == row_id.to_string())
        .collect();
    assert_eq!(for_row.len(), 1);

    // And the chain stayed intact
    let verification = env.state.audit.verify_chain(None, None).await.unwrap();
    assert!(verification.chain_intact, "breaks: {:?}", verification.breaks);
}

#[tokio::test]
async fn unfrozen_settlement_row_cannot_be_paid() {
    let env = common::setup().await;
    // No salary config for the role: the row materializes without a total
    let service = SettlementService::new(env.state.clone());

    let row_id = settle_one_row(&env, "2025-06-01", "W1").await;
    let err = service.mark_paid(mark_req(row_id)).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "got {err:?}");

    // The failed claim rolled back: the row is still unpaid
    let row = club_server::db::repository::employee_shift::get(&env.state.pool, row_id)
        .await
        .unwrap();
    assert!(!row.paid);
}

#[tokio::test]
async fn pay_worker_settles_everything_and_applies_advances() {
    let env = common::setup().await;
    common::seed_role(&env, "BARRA", 20000.0, 5000.0).await;
    let service = SettlementService::new(env.state.clone());

    // Two closed jornadas, one worker: 50,000 owed
    settle_one_row(&env, "2025-06-01", "W1").await;
    settle_one_row(&env, "2025-06-02", "W1").await;
    assert_eq!(service.pending_balance("W1").await.unwrap(), 50000.0);

    // A 5,000 advance reduces what the payout hands over
    service
        .create_advance(
            CreateAdvance::new(
                "W1",
                "Trabajador de Prueba",
                AdvanceKind::Advance,
                5000.0,
                Some("mid-month advance".into()),
                "2025-06-03",
                "admin",
            )
            .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(service.pending_balance("W1").await.unwrap(), 45000.0);

    let payment = service
        .pay_worker("W1", "admin", &RequestMeta::default(), None)
        .await
        .unwrap();
    assert_eq!(payment.amount, 45000.0);
    assert_eq!(payment.pending_before, Some(50000.0));
    assert_eq!(payment.pending_after, Some(0.0));
    assert_eq!(payment.settled_ids().len(), 2);

    // All rows paid, advances consumed, balance zero
    let rows = service.settlement_rows_for_worker("W1").await.unwrap();
    assert!(rows.iter().all(|r| r.paid));
    let advances = service.advances_for_worker("W1").await.unwrap();
    assert!(advances.iter().all(|a| a.applied));
    assert_eq!(service.pending_balance("W1").await.unwrap(), 0.0);

    // Nothing left to pay
    let err = service
        .pay_worker("W1", "admin", &RequestMeta::default(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "got {err:?}");
}

#[tokio::test]
async fn partial_payment_reduces_the_balance_without_settling_rows() {
    let env = common::setup().await;
    common::seed_role(&env, "BARRA", 20000.0, 5000.0).await;
    let service = SettlementService::new(env.state.clone());

    settle_one_row(&env, "2025-06-01", "W1").await; // 25,000 owed

    let partial = service
        .pay_partial("W1", 10000.0, "admin", Some("friday advance window"))
        .await
        .unwrap();
    assert_eq!(partial.payment_type, shared::models::PaymentType::Partial);
    assert_eq!(partial.amount, 10000.0);
    assert_eq!(partial.pending_before, Some(25000.0));
    assert_eq!(partial.pending_after, Some(15000.0));
    assert!(partial.settled_ids().is_empty());

    // No row was marked paid; the balance shrank
    let rows = service.settlement_rows_for_worker("W1").await.unwrap();
    assert!(rows.iter().all(|r| !r.paid));
    assert_eq!(service.pending_balance("W1").await.unwrap(), 15000.0);

    // Over-paying the remainder is rejected
    let err = service
        .pay_partial("W1", 20000.0, "admin", None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "got {err:?}");

    // Full settlement hands over the remainder and closes the rows
    let full = service
        .pay_worker("W1", "admin", &RequestMeta::default(), None)
        .await
        .unwrap();
    assert_eq!(full.amount, 15000.0);
    let rows = service.settlement_rows_for_worker("W1").await.unwrap();
    assert!(rows.iter().all(|r| r.paid));
}

#[tokio::test]
async fn advances_are_capped_by_the_unpaid_balance() {
    let env = common::setup().await;
    common::seed_role(&env, "BARRA", 20000.0, 5000.0).await;
    let service = SettlementService::new(env.state.clone());

    settle_one_row(&env, "2025-06-01", "W1").await; // 25,000 owed

    let too_much = CreateAdvance::new(
        "W1",
        "Trabajador de Prueba",
        AdvanceKind::Advance,
        30000.0,
        None,
        "2025-06-02",
        "admin",
    )
    .unwrap();
    let err = service.create_advance(too_much).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "got {err:?}");

    // Exactly the remaining balance is fine; a second advance then is not
    let exact = CreateAdvance::new(
        "W1",
        "Trabajador de Prueba",
        AdvanceKind::Advance,
        25000.0,
        None,
        "2025-06-02",
        "admin",
    )
    .unwrap();
    service.create_advance(exact).await.unwrap();

    let one_more = CreateAdvance::new(
        "W1",
        "Trabajador de Prueba",
        AdvanceKind::Advance,
        1.0,
        None,
        "2025-06-02",
        "admin",
    )
    .unwrap();
    let err = service.create_advance(one_more).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "got {err:?}");

    // Deductions are not capped
    let deduction = CreateAdvance::new(
        "W1",
        "Trabajador de Prueba",
        AdvanceKind::Deduction,
        -2000.0,
        Some("broken glassware".into()),
        "2025-06-02",
        "admin",
    )
    .unwrap();
    service.create_advance(deduction).await.unwrap();
}

#[tokio::test]
async fn audit_and_mutation_never_diverge() {
    let env = common::setup().await;
    common::seed_role(&env, "BARRA", 20000.0, 5000.0).await;
    let service = SettlementService::new(env.state.clone());

    let row_id = settle_one_row(&env, "2025-06-01", "W1").await;
    service.mark_paid(mark_req(row_id)).await.unwrap();

    let (entries, _) = env
        .state
        .audit
        .query(&AuditQuery {
            action: Some(AuditAction::SettlementPaid),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(entry.resource_id, row_id.to_string());
    assert_eq!(entry.operator_name.as_deref(), Some("admin"));
    assert_eq!(entry.details["new"]["amount"], 25000.0);
    assert_eq!(entry.details["ip_address"], "10.0.0.5");

    // A conflicting retry adds no audit entry
    let _ = service.mark_paid(mark_req(row_id)).await.unwrap_err();
    let (entries, _) = env
        .state
        .audit
        .query(&AuditQuery {
            action: Some(AuditAction::SettlementPaid),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
}
