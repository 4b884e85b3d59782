//! Register reconciliation: tolerance, integrity failures, and the
//! accept/resolve flow.

mod common;

use club_server::registers::RegisterService;
use club_server::utils::AppError;
use shared::models::{CloseStatus, RegisterState, TenderTotals};
use shared::request::{CloseRegister, OpenRegister};

async fn open_register(env: &common::TestEnv, jornada_id: i64, register_id: &str) {
    let service = RegisterService::new(env.state.clone());
    let req = OpenRegister::new(
        jornada_id,
        register_id,
        format!("Caja {register_id}"),
        "E1",
        "Eva",
        50_000.0,
        "admin",
    )
    .unwrap();
    service.open_register(req).await.unwrap();
}

fn close_req(
    jornada_id: i64,
    register_id: &str,
    expected: TenderTotals,
    actual: TenderTotals,
) -> CloseRegister {
    CloseRegister::new(register_id, jornada_id, "E1", "Eva", expected, actual, 42, None, None)
        .unwrap()
}

#[tokio::test]
async fn close_within_one_cent_tolerance_succeeds() {
    let env = common::setup().await;
    common::seed_role(&env, "BARRA", 20000.0, 5000.0).await;
    let service = RegisterService::new(env.state.clone());

    let id = common::open_staffed_jornada(&env, "2025-06-01", "W1").await;
    open_register(&env, id, "C1").await;

    // Expected tenders sum to 100,000; actual to 100,000.01
    let expected = TenderTotals::new(60_000.0, 30_000.0, 10_000.0);
    let actual = TenderTotals::new(60_000.01, 30_000.0, 10_000.0);

    let close = service.close_register(close_req(id, "C1", expected, actual)).await.unwrap();
    assert_eq!(close.status, CloseStatus::Pending);
    assert_eq!(close.diff_cash, 0.01);
    assert_eq!(close.diff_debit, 0.0);
    assert_eq!(close.difference_total, 0.01);

    // The opening was released by the close
    let opening = club_server::db::repository::register::find_open_opening(
        &env.state.pool,
        id,
        "C1",
    )
    .await
    .unwrap();
    assert!(opening.is_none());
}

#[tokio::test]
async fn sum_mismatch_beyond_tolerance_is_an_integrity_failure() {
    let env = common::setup().await;
    common::seed_role(&env, "BARRA", 20000.0, 5000.0).await;
    let service = RegisterService::new(env.state.clone());

    let id = common::open_staffed_jornada(&env, "2025-06-01", "W1").await;
    open_register(&env, id, "C1").await;

    let expected = TenderTotals::new(60_000.0, 30_000.0, 10_000.0);
    let actual = TenderTotals::new(60_050.0, 30_000.0, 10_000.0);

    let err = service
        .close_register(close_req(id, "C1", expected, actual))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Integrity(_)), "got {err:?}");

    // Nothing was persisted and the register stays open
    assert!(service.closes(id).await.unwrap().is_empty());
    let opening = club_server::db::repository::register::find_open_opening(
        &env.state.pool,
        id,
        "C1",
    )
    .await
    .unwrap();
    assert_eq!(opening.unwrap().state, RegisterState::Open);
}

#[tokio::test]
async fn duplicate_register_open_conflicts() {
    let env = common::setup().await;
    common::seed_role(&env, "BARRA", 20000.0, 5000.0).await;
    let service = RegisterService::new(env.state.clone());

    let id = common::open_staffed_jornada(&env, "2025-06-01", "W1").await;
    open_register(&env, id, "C1").await;

    let req = OpenRegister::new(id, "C1", "Caja C1", "E2", "Elena", 30_000.0, "admin").unwrap();
    let err = service.open_register(req).await.unwrap_err();
    assert!(err.is_conflict(), "got {err:?}");
}

#[tokio::test]
async fn accept_moves_pending_to_balanced_once() {
    let env = common::setup().await;
    common::seed_role(&env, "BARRA", 20000.0, 5000.0).await;
    let service = RegisterService::new(env.state.clone());

    let id = common::open_staffed_jornada(&env, "2025-06-01", "W1").await;
    open_register(&env, id, "C1").await;

    let tenders = TenderTotals::new(80_000.0, 15_000.0, 5_000.0);
    let close = service
        .close_register(close_req(id, "C1", tenders, tenders))
        .await
        .unwrap();

    let accepted = service.accept_close(close.id, "admin").await.unwrap();
    assert_eq!(accepted.status, CloseStatus::Balanced);
    assert_eq!(accepted.resolved_by.as_deref(), Some("admin"));

    let err = service.accept_close(close.id, "admin").await.unwrap_err();
    assert!(err.is_conflict(), "got {err:?}");
    let err = service.resolve_close(close.id, "admin", "late notes").await.unwrap_err();
    assert!(err.is_conflict(), "got {err:?}");
}

#[tokio::test]
async fn resolve_records_resolver_and_notes() {
    let env = common::setup().await;
    common::seed_role(&env, "BARRA", 20000.0, 5000.0).await;
    let service = RegisterService::new(env.state.clone());

    let id = common::open_staffed_jornada(&env, "2025-06-01", "W1").await;
    open_register(&env, id, "C1").await;

    // A till shortage within payload consistency: both sides sum equal,
    // but cash is short against debit overage
    let expected = TenderTotals::new(80_000.0, 15_000.0, 5_000.0);
    let actual = TenderTotals::new(79_000.0, 16_000.0, 5_000.0);
    let close = service
        .close_register(close_req(id, "C1", expected, actual))
        .await
        .unwrap();
    assert_eq!(close.diff_cash, -1_000.0);
    assert_eq!(close.diff_debit, 1_000.0);
    assert_eq!(close.difference_total, 0.0);

    let err = service.resolve_close(close.id, "admin", "   ").await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "got {err:?}");

    let resolved = service
        .resolve_close(close.id, "admin", "cash drawer miscount, under review")
        .await
        .unwrap();
    assert_eq!(resolved.status, CloseStatus::Resolved);
    assert_eq!(
        resolved.resolution_notes.as_deref(),
        Some("cash drawer miscount, under review")
    );
}

#[tokio::test]
async fn reclosures_accumulate_and_latest_wins() {
    let env = common::setup().await;
    common::seed_role(&env, "BARRA", 20000.0, 5000.0).await;
    let service = RegisterService::new(env.state.clone());

    let id = common::open_staffed_jornada(&env, "2025-06-01", "W1").await;
    open_register(&env, id, "C1").await;

    let tenders = TenderTotals::new(10_000.0, 0.0, 0.0);
    let first = service
        .close_register(close_req(id, "C1", tenders, tenders))
        .await
        .unwrap();

    // Re-open and re-close the same register within the jornada
    open_register(&env, id, "C1").await;
    let tenders2 = TenderTotals::new(12_000.0, 0.0, 0.0);
    let second = service
        .close_register(close_req(id, "C1", tenders2, tenders2))
        .await
        .unwrap();

    let all = service.closes(id).await.unwrap();
    assert_eq!(all.len(), 2);

    let latest = service.latest_close(id, "C1").await.unwrap().unwrap();
    assert_eq!(latest.id, second.id);
    assert_ne!(latest.id, first.id);
}
