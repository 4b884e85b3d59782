//! Shift state machine: lifecycle transitions, guards, and the payroll
//! freeze discipline.

mod common;

use club_server::shifts::JornadaService;
use club_server::utils::AppError;
use shared::models::JornadaState;
use shared::request::{AddRosterEntry, CloseShift, CompleteChecklist, CreateShift, OpenShift};
use std::collections::BTreeMap;

#[tokio::test]
async fn lifecycle_preparing_reviewing_open_closed() {
    let env = common::setup().await;
    common::seed_role(&env, "BARRA", 20000.0, 5000.0).await;
    let service = JornadaService::new(env.state.clone());

    let id = common::create_jornada(&env, "2025-06-01").await;
    assert_eq!(service.get(id).await.unwrap().state, JornadaState::Preparing);

    // Checklist moves preparing -> reviewing
    let mut checklist = BTreeMap::new();
    checklist.insert("sound".to_string(), true);
    checklist.insert("lights".to_string(), true);
    let updated = service
        .complete_technical_checklist(CompleteChecklist::new(id, checklist).unwrap())
        .await
        .unwrap();
    assert_eq!(updated.state, JornadaState::Reviewing);
    assert_eq!(updated.checklist_map().len(), 2);

    // Opening requires staffing
    let err = service
        .open_shift(OpenShift::new(id, "admin").unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "got {err:?}");

    common::staff(&env, id, "W1", "Ana", "BARRA").await;
    let opened = service
        .open_shift(OpenShift::new(id, "admin").unwrap())
        .await
        .unwrap();
    assert_eq!(opened.state, JornadaState::Open);
    assert!(opened.opened_at.is_some());
    assert_eq!(opened.opened_by.as_deref(), Some("admin"));

    // Close materializes the roster and is terminal
    let outcome = service
        .close_shift(CloseShift::new(id, "admin").unwrap())
        .await
        .unwrap();
    assert_eq!(outcome.settled_rows, 1);
    assert_eq!(service.get(id).await.unwrap().state, JornadaState::Closed);

    let err = service
        .close_shift(CloseShift::new(id, "admin").unwrap())
        .await
        .unwrap_err();
    assert!(err.is_conflict(), "double close must conflict, got {err:?}");
}

#[tokio::test]
async fn only_one_open_jornada_system_wide() {
    let env = common::setup().await;
    common::seed_role(&env, "BARRA", 20000.0, 5000.0).await;
    let service = JornadaService::new(env.state.clone());

    common::open_staffed_jornada(&env, "2025-06-01", "W1").await;

    let second = common::create_jornada(&env, "2025-06-02").await;
    common::staff(&env, second, "W2", "Bruno", "BARRA").await;
    let err = service
        .open_shift(OpenShift::new(second, "admin").unwrap())
        .await
        .unwrap_err();
    assert!(err.is_conflict(), "second open shift must conflict, got {err:?}");
}

#[tokio::test]
async fn roster_is_locked_once_open() {
    let env = common::setup().await;
    common::seed_role(&env, "BARRA", 20000.0, 5000.0).await;
    let service = JornadaService::new(env.state.clone());

    let id = common::open_staffed_jornada(&env, "2025-06-01", "W1").await;

    let req =
        AddRosterEntry::new(id, "W2", "Bruno", "BARRA", "23:00", "04:00", 0.0, None).unwrap();
    let err = service.add_roster_entry(req).await.unwrap_err();
    assert!(err.is_conflict(), "got {err:?}");
}

#[tokio::test]
async fn frozen_snapshot_survives_config_edits() {
    let env = common::setup().await;
    common::seed_role(&env, "BARRA", 20000.0, 5000.0).await;
    let service = JornadaService::new(env.state.clone());

    let id = common::create_jornada(&env, "2025-06-01").await;
    let entry_id = common::staff(&env, id, "W1", "Ana", "BARRA").await;

    let entry = club_server::db::repository::roster::get(&env.state.pool, entry_id)
        .await
        .unwrap();
    assert_eq!(entry.base_snapshot, Some(20000.0));
    assert_eq!(entry.bonus_snapshot, Some(5000.0));
    assert_eq!(entry.total_payment, Some(25000.0));

    // Editing the configuration must not touch the frozen snapshot
    common::seed_role(&env, "BARRA", 30000.0, 0.0).await;
    let entry = club_server::db::repository::roster::get(&env.state.pool, entry_id)
        .await
        .unwrap();
    assert_eq!(entry.total_payment, Some(25000.0));

    // And the settlement row created at close carries the frozen amount
    common::open(&env, id).await;
    service
        .close_shift(CloseShift::new(id, "admin").unwrap())
        .await
        .unwrap();
    let rows = club_server::db::repository::employee_shift::find_by_jornada(&env.state.pool, id)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].total_payment, Some(25000.0));
    assert!(!rows[0].paid);
}

#[tokio::test]
async fn missing_salary_config_leaves_assignment_unfrozen() {
    let env = common::setup().await;
    let service = JornadaService::new(env.state.clone());

    let id = common::create_jornada(&env, "2025-06-01").await;
    let entry_id = common::staff(&env, id, "W1", "Ana", "GUARDARROPIA").await;

    let entry = club_server::db::repository::roster::get(&env.state.pool, entry_id)
        .await
        .unwrap();
    assert!(entry.total_payment.is_none());
    assert!(!entry.is_frozen());

    // Staffing proceeded: the jornada can still open
    common::open(&env, id).await;
    assert_eq!(service.get(id).await.unwrap().state, JornadaState::Open);
}

#[tokio::test]
async fn create_replaces_closed_jornada_but_keeps_settlement_rows() {
    let env = common::setup().await;
    common::seed_role(&env, "BARRA", 20000.0, 5000.0).await;
    let service = JornadaService::new(env.state.clone());

    let first = common::open_staffed_jornada(&env, "2025-06-01", "W1").await;
    service
        .close_shift(CloseShift::new(first, "admin").unwrap())
        .await
        .unwrap();

    // Re-creating the date deletes the closed jornada and its roster
    let second = common::create_jornada(&env, "2025-06-01").await;
    assert_ne!(first, second);
    assert!(matches!(
        service.get(first).await.unwrap_err(),
        AppError::NotFound(_)
    ));

    // The settlement rows materialized at close are financial records and
    // survive the replacement
    let rows =
        club_server::db::repository::employee_shift::find_by_worker(&env.state.pool, "W1")
            .await
            .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].total_payment, Some(25000.0));
}

#[tokio::test]
async fn create_conflicts_with_open_jornada_for_same_date() {
    let env = common::setup().await;
    common::seed_role(&env, "BARRA", 20000.0, 5000.0).await;
    let service = JornadaService::new(env.state.clone());

    common::open_staffed_jornada(&env, "2025-06-01", "W1").await;

    let req = CreateShift::new(
        "2025-06-01",
        "Noche",
        "Otra Fiesta",
        "22:00",
        None,
        None,
        vec![],
    )
    .unwrap();
    let err = service.create_shift(req, "admin").await.unwrap_err();
    assert!(err.is_conflict(), "got {err:?}");
}

#[tokio::test]
async fn schedule_assignments_are_copied_with_frozen_pay() {
    let env = common::setup().await;
    common::seed_role(&env, "BARRA", 20000.0, 5000.0).await;

    club_server::db::repository::salary::insert_schedule_assignment(
        &env.state.pool,
        "2025-06-01",
        "Noche",
        "W7",
        "Carla",
        "BARRA",
    )
    .await
    .unwrap();

    let service = JornadaService::new(env.state.clone());
    let id = common::create_jornada(&env, "2025-06-01").await;

    let roster = service.roster(id).await.unwrap();
    assert_eq!(roster.len(), 1);
    assert_eq!(roster[0].worker_id, "W7");
    assert_eq!(roster[0].total_payment, Some(25000.0));
}

#[tokio::test]
async fn current_status_reflects_lifecycle() {
    let env = common::setup().await;
    common::seed_role(&env, "BARRA", 20000.0, 5000.0).await;
    let service = JornadaService::new(env.state.clone());

    assert!(!service.current_status().await.unwrap().is_open);

    let id = common::open_staffed_jornada(&env, "2025-06-01", "W1").await;
    let status = service.current_status().await.unwrap();
    assert!(status.is_open);
    assert_eq!(status.jornada_id, Some(id));

    service
        .close_shift(CloseShift::new(id, "admin").unwrap())
        .await
        .unwrap();
    assert!(!service.current_status().await.unwrap().is_open);
}
