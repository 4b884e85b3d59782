//! Shared test harness: file-backed SQLite state so tests exercise real
//! write contention, plus seeding helpers.
#![allow(dead_code)]

use club_server::db::DbService;
use club_server::{Config, ServerState};
use shared::request::{AddRosterEntry, CreateShift, OpenShift};
use tempfile::TempDir;

pub struct TestEnv {
    pub state: ServerState,
    _work_dir: TempDir,
}

/// Fresh engine over a temporary database
pub async fn setup() -> TestEnv {
    let work_dir = TempDir::new().expect("create temp dir");
    let db_path = work_dir.path().join("club-test.db");

    let db = DbService::new(&db_path.to_string_lossy())
        .await
        .expect("open test database");

    let config = Config::with_work_dir(work_dir.path().to_string_lossy().to_string());
    let state = ServerState::with_pool(config, db.pool).expect("build server state");

    TestEnv {
        state,
        _work_dir: work_dir,
    }
}

/// Configure a role's salary
pub async fn seed_role(env: &TestEnv, role: &str, base: f64, bonus: f64) {
    club_server::db::repository::salary::upsert(&env.state.pool, role, base, bonus)
        .await
        .expect("seed salary config");
}

/// Create a preparing jornada for a date
pub async fn create_jornada(env: &TestEnv, date: &str) -> i64 {
    let service = club_server::shifts::JornadaService::new(env.state.clone());
    let req = CreateShift::new(
        date,
        "Noche",
        "Fiesta de Prueba",
        "22:00",
        Some("05:00".to_string()),
        None,
        vec![],
    )
    .expect("valid create request");
    service
        .create_shift(req, "admin")
        .await
        .expect("create jornada")
        .id
}

/// Put one worker on the roster
pub async fn staff(env: &TestEnv, jornada_id: i64, worker_id: &str, name: &str, role: &str) -> i64 {
    let service = club_server::shifts::JornadaService::new(env.state.clone());
    let req = AddRosterEntry::new(
        jornada_id,
        worker_id,
        name,
        role,
        "22:00",
        "04:00",
        0.0,
        None,
    )
    .expect("valid roster request");
    service.add_roster_entry(req).await.expect("staff worker").id
}

/// Open the venue for a staffed jornada
pub async fn open(env: &TestEnv, jornada_id: i64) {
    let service = club_server::shifts::JornadaService::new(env.state.clone());
    let req = OpenShift::new(jornada_id, "admin").expect("valid open request");
    service.open_shift(req).await.expect("open jornada");
}

/// Create → staff one BARRA worker → open, in one call
pub async fn open_staffed_jornada(env: &TestEnv, date: &str, worker_id: &str) -> i64 {
    let id = create_jornada(env, date).await;
    staff(env, id, worker_id, "Trabajador de Prueba", "BARRA").await;
    open(env, id).await;
    id
}
