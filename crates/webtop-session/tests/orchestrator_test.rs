//! Integration tests for the session orchestrator against in-memory
//! SurrealDB and the recording gateway.

use std::time::Duration;

use chrono::{DateTime, Utc};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;
use webtop_core::error::{WebtopError, WebtopResult};
use webtop_core::gateway::GatewayError;
use webtop_core::identity::{CallerIdentity, Role};
use webtop_core::models::application::CreateApplication;
use webtop_core::models::session::{NewSession, Session};
use webtop_core::models::user::CreateUser;
use webtop_core::repository::{ApplicationRepository, SessionRepository, UserRepository};
use webtop_db::repository::{
    SurrealApplicationRepository, SurrealSessionRepository, SurrealUserRepository,
};
use webtop_session::testing::{GatewayCall, GatewayOp, RecordingGateway};
use webtop_session::{OrchestratorConfig, ReconcileReport, SessionOrchestrator};

type Orchestrator<S = SurrealSessionRepository<Db>> =
    SessionOrchestrator<S, SurrealApplicationRepository<Db>, RecordingGateway>;

struct Fixture {
    db: Surreal<Db>,
    alice: CallerIdentity,
    bob: CallerIdentity,
    admin: CallerIdentity,
    app_id: Uuid,
    disabled_app_id: Uuid,
}

async fn setup() -> Fixture {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    webtop_db::run_migrations(&db).await.unwrap();

    let users = SurrealUserRepository::new(db.clone());
    let mut identities = Vec::new();
    for (username, is_admin) in [("alice", false), ("bob", false), ("admin", true)] {
        let user = users
            .create(CreateUser {
                username: username.into(),
                password: format!("{username}-password"),
                is_admin,
            })
            .await
            .unwrap();
        identities.push(CallerIdentity::new(user.id, Role::from_admin_flag(is_admin)));
    }

    let apps = SurrealApplicationRepository::new(db.clone());
    let app = apps
        .create(CreateApplication {
            name: "app-1".into(),
            logo_url: None,
            repository_url: None,
            image: "lscr.io/linuxserver/webtop:latest".into(),
            docker_compose: None,
            enabled: true,
        })
        .await
        .unwrap();
    let disabled = apps
        .create(CreateApplication {
            name: "retired".into(),
            logo_url: None,
            repository_url: None,
            image: "retired:latest".into(),
            docker_compose: None,
            enabled: false,
        })
        .await
        .unwrap();

    Fixture {
        db,
        alice: identities[0],
        bob: identities[1],
        admin: identities[2],
        app_id: app.id,
        disabled_app_id: disabled.id,
    }
}

fn orchestrator(fx: &Fixture, gateway: RecordingGateway) -> Orchestrator {
    SessionOrchestrator::new(
        SurrealSessionRepository::new(fx.db.clone()),
        SurrealApplicationRepository::new(fx.db.clone()),
        gateway,
        OrchestratorConfig::default(),
    )
}

fn sessions(fx: &Fixture) -> SurrealSessionRepository<Db> {
    SurrealSessionRepository::new(fx.db.clone())
}

// ---------------------------------------------------------------------------
// Launch
// ---------------------------------------------------------------------------

#[tokio::test]
async fn launch_persists_session_and_returns_access() {
    let fx = setup().await;
    let gateway = RecordingGateway::new().with_next_id("c123");
    let orch = orchestrator(&fx, gateway.clone());

    let access = orch.launch(fx.alice, fx.app_id, false).await.unwrap();
    assert_eq!(access.container_id, "c123");
    assert_eq!(
        access.access_url,
        format!("http://localhost/sessions/{}/", access.session_id)
    );

    let stored = sessions(&fx).find_by_id(access.session_id).await.unwrap();
    assert_eq!(stored.user_id, fx.alice.user_id);
    assert_eq!(stored.application_id, fx.app_id);
    assert_eq!(stored.container_id, "c123");
    assert!(stored.ended_at.is_none());

    let ops: Vec<GatewayOp> = gateway.calls().iter().map(GatewayCall::op).collect();
    assert_eq!(ops, vec![GatewayOp::Create, GatewayOp::Start]);
    assert!(gateway.is_running("c123"));
}

#[tokio::test]
async fn launch_disabled_application_touches_nothing() {
    let fx = setup().await;
    let gateway = RecordingGateway::new();
    let orch = orchestrator(&fx, gateway.clone());

    let err = orch.launch(fx.alice, fx.disabled_app_id, false).await.unwrap_err();
    assert!(matches!(err, WebtopError::ApplicationDisabled { .. }), "got {err:?}");
    assert!(gateway.calls().is_empty());
    assert!(sessions(&fx).list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn launch_unknown_application_is_not_found() {
    let fx = setup().await;
    let gateway = RecordingGateway::new();
    let orch = orchestrator(&fx, gateway.clone());

    let err = orch.launch(fx.alice, Uuid::new_v4(), false).await.unwrap_err();
    assert!(err.is_not_found("application"));
    assert!(gateway.calls().is_empty());
}

#[tokio::test]
async fn create_failure_surfaces_gateway_error() {
    let fx = setup().await;
    let gateway = RecordingGateway::new();
    gateway.fail(
        GatewayOp::Create,
        GatewayError::Unavailable {
            reason: "create timed out".into(),
        },
    );
    let orch = orchestrator(&fx, gateway.clone());

    let err = orch.launch(fx.alice, fx.app_id, false).await.unwrap_err();
    match err {
        WebtopError::Gateway(e) => assert!(e.is_unavailable()),
        other => panic!("expected gateway error, got {other:?}"),
    }
    assert_eq!(gateway.count(GatewayOp::Create), 1);
    assert_eq!(gateway.count(GatewayOp::Start), 0);
    assert!(sessions(&fx).list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn start_failure_removes_orphan_and_writes_no_row() {
    let fx = setup().await;
    let gateway = RecordingGateway::new().with_next_id("c-orphan");
    gateway.fail(
        GatewayOp::Start,
        GatewayError::Rejected {
            status: 500,
            body: "cannot start".into(),
        },
    );
    let orch = orchestrator(&fx, gateway.clone());

    let err = orch.launch(fx.alice, fx.app_id, false).await.unwrap_err();
    assert!(matches!(err, WebtopError::LaunchFailed { .. }), "got {err:?}");
    let calls = gateway.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[0].op(), GatewayOp::Create);
    assert_eq!(
        calls[1..],
        [
            GatewayCall::Start("c-orphan".into()),
            GatewayCall::Remove("c-orphan".into()),
        ]
    );
    assert!(!gateway.exists("c-orphan"));
    assert!(sessions(&fx).list_all().await.unwrap().is_empty());
}

/// Session store that refuses every insert.
struct RejectInserts(SurrealSessionRepository<Db>);

impl SessionRepository for RejectInserts {
    async fn insert(&self, _input: NewSession) -> WebtopResult<Session> {
        Err(WebtopError::Database("store offline".into()))
    }
    async fn find_by_id(&self, id: Uuid) -> WebtopResult<Session> {
        self.0.find_by_id(id).await
    }
    async fn find_active_by_user(&self, user_id: Uuid) -> WebtopResult<Vec<Session>> {
        self.0.find_active_by_user(user_id).await
    }
    async fn list_active(&self) -> WebtopResult<Vec<Session>> {
        self.0.list_active().await
    }
    async fn list_all(&self) -> WebtopResult<Vec<Session>> {
        self.0.list_all().await
    }
    async fn mark_ended(&self, id: Uuid, ended_at: DateTime<Utc>) -> WebtopResult<bool> {
        self.0.mark_ended(id, ended_at).await
    }
}

#[tokio::test]
async fn store_failure_after_start_tears_container_down() {
    let fx = setup().await;
    let gateway = RecordingGateway::new().with_next_id("c-unrecorded");
    let orch: Orchestrator<RejectInserts> = SessionOrchestrator::new(
        RejectInserts(sessions(&fx)),
        SurrealApplicationRepository::new(fx.db.clone()),
        gateway.clone(),
        OrchestratorConfig::default(),
    );

    let err = orch.launch(fx.alice, fx.app_id, false).await.unwrap_err();
    assert!(matches!(err, WebtopError::Database(_)), "got {err:?}");

    let ops: Vec<GatewayOp> = gateway.calls().iter().map(GatewayCall::op).collect();
    assert_eq!(
        ops,
        vec![GatewayOp::Create, GatewayOp::Start, GatewayOp::Stop, GatewayOp::Remove]
    );
    assert!(!gateway.exists("c-unrecorded"));
}

// ---------------------------------------------------------------------------
// Stop
// ---------------------------------------------------------------------------

#[tokio::test]
async fn owner_stop_ends_session_and_removes_ephemeral_container() {
    let fx = setup().await;
    let gateway = RecordingGateway::new().with_next_id("c123");
    let orch = orchestrator(&fx, gateway.clone());

    let access = orch.launch(fx.alice, fx.app_id, false).await.unwrap();
    let ended = orch.stop(fx.alice, access.session_id).await.unwrap();

    assert!(ended.ended_at.is_some());
    assert_eq!(ended.container_id, "c123");
    assert_eq!(gateway.count(GatewayOp::Stop), 1);
    assert_eq!(gateway.count(GatewayOp::Remove), 1);
    assert!(!gateway.exists("c123"));
}

#[tokio::test]
async fn stopping_twice_is_a_noop_success() {
    let fx = setup().await;
    let gateway = RecordingGateway::new();
    let orch = orchestrator(&fx, gateway.clone());

    let access = orch.launch(fx.alice, fx.app_id, false).await.unwrap();
    let first = orch.stop(fx.alice, access.session_id).await.unwrap();
    let calls_after_first = gateway.calls().len();
    let second = orch.stop(fx.alice, access.session_id).await.unwrap();

    assert_eq!(first.ended_at, second.ended_at);
    assert_eq!(gateway.calls().len(), calls_after_first);
}

#[tokio::test]
async fn persistent_session_keeps_its_container() {
    let fx = setup().await;
    let gateway = RecordingGateway::new().with_next_id("c-home");
    let orch = orchestrator(&fx, gateway.clone());

    let access = orch.launch(fx.alice, fx.app_id, true).await.unwrap();
    orch.stop(fx.alice, access.session_id).await.unwrap();

    assert_eq!(gateway.count(GatewayOp::Remove), 0);
    assert!(gateway.exists("c-home"));
    assert!(!gateway.is_running("c-home"));
}

#[tokio::test]
async fn disabling_application_keeps_running_sessions_stoppable() {
    let fx = setup().await;
    let gateway = RecordingGateway::new().with_next_id("c-live");
    let orch = orchestrator(&fx, gateway.clone());

    let access = orch.launch(fx.alice, fx.app_id, false).await.unwrap();
    SurrealApplicationRepository::new(fx.db.clone())
        .set_enabled(fx.app_id, false)
        .await
        .unwrap();

    let own = orch.list_own(fx.alice).await.unwrap();
    assert_eq!(own.len(), 1);
    assert_eq!(own[0].id, access.session_id);

    let err = orch.launch(fx.alice, fx.app_id, false).await.unwrap_err();
    assert!(matches!(err, WebtopError::ApplicationDisabled { .. }), "got {err:?}");

    let ended = orch.stop(fx.alice, access.session_id).await.unwrap();
    assert!(ended.ended_at.is_some());
    assert!(!gateway.exists("c-live"));
    assert!(orch.list_own(fx.alice).await.unwrap().is_empty());
}

#[tokio::test]
async fn non_owner_is_forbidden_and_session_unchanged() {
    let fx = setup().await;
    let gateway = RecordingGateway::new();
    let orch = orchestrator(&fx, gateway.clone());

    let access = orch.launch(fx.alice, fx.app_id, false).await.unwrap();
    let err = orch.stop(fx.bob, access.session_id).await.unwrap_err();

    assert!(matches!(err, WebtopError::Forbidden { .. }), "got {err:?}");
    assert_eq!(gateway.count(GatewayOp::Stop), 0);
    assert!(sessions(&fx).find_by_id(access.session_id).await.unwrap().is_active());
}

#[tokio::test]
async fn admin_may_stop_any_session() {
    let fx = setup().await;
    let orch = orchestrator(&fx, RecordingGateway::new());

    let access = orch.launch(fx.alice, fx.app_id, false).await.unwrap();
    let ended = orch.stop(fx.admin, access.session_id).await.unwrap();
    assert!(!ended.is_active());
}

#[tokio::test]
async fn stop_unknown_session_is_not_found() {
    let fx = setup().await;
    let gateway = RecordingGateway::new();
    let orch = orchestrator(&fx, gateway.clone());

    let err = orch.stop(fx.admin, Uuid::new_v4()).await.unwrap_err();
    assert!(err.is_not_found("session"));
    assert!(gateway.calls().is_empty());
}

#[tokio::test]
async fn unreachable_platform_leaves_session_active_for_retry() {
    let fx = setup().await;
    let gateway = RecordingGateway::new();
    let orch = orchestrator(&fx, gateway.clone());

    let access = orch.launch(fx.alice, fx.app_id, false).await.unwrap();
    gateway.fail(
        GatewayOp::Stop,
        GatewayError::Unavailable {
            reason: "stop timed out".into(),
        },
    );

    let err = orch.stop(fx.alice, access.session_id).await.unwrap_err();
    assert!(matches!(err, WebtopError::StopFailed { .. }), "got {err:?}");
    assert!(sessions(&fx).find_by_id(access.session_id).await.unwrap().is_active());

    gateway.clear_failure(GatewayOp::Stop);
    let ended = orch.stop(fx.alice, access.session_id).await.unwrap();
    assert!(!ended.is_active());
}

#[tokio::test]
async fn container_deleted_out_of_band_still_ends_session() {
    let fx = setup().await;
    let gateway = RecordingGateway::new().with_next_id("c-lost");
    let orch = orchestrator(&fx, gateway.clone());

    let access = orch.launch(fx.alice, fx.app_id, false).await.unwrap();
    gateway.forget("c-lost");

    let ended = orch.stop(fx.alice, access.session_id).await.unwrap();
    assert!(!ended.is_active());
    assert_eq!(gateway.count(GatewayOp::Remove), 0);
}

#[tokio::test]
async fn concurrent_stops_both_succeed_with_one_platform_stop() {
    let fx = setup().await;
    let gateway = RecordingGateway::new();
    gateway.set_stop_delay(Duration::from_millis(100));
    let orch = orchestrator(&fx, gateway.clone());

    let access = orch.launch(fx.alice, fx.app_id, false).await.unwrap();
    let (a, b) = tokio::join!(
        orch.stop(fx.alice, access.session_id),
        orch.stop(fx.admin, access.session_id),
    );

    let (a, b) = (a.unwrap(), b.unwrap());
    assert!(!a.is_active());
    assert_eq!(a.ended_at, b.ended_at);
    assert_eq!(gateway.count(GatewayOp::Stop), 1);
}

#[tokio::test]
async fn abandoned_stop_still_completes() {
    let fx = setup().await;
    let gateway = RecordingGateway::new();
    gateway.set_stop_delay(Duration::from_millis(200));
    let orch = orchestrator(&fx, gateway.clone());

    let access = orch.launch(fx.alice, fx.app_id, false).await.unwrap();
    let abandoned =
        tokio::time::timeout(Duration::from_millis(20), orch.stop(fx.alice, access.session_id))
            .await;
    assert!(abandoned.is_err());

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(!sessions(&fx).find_by_id(access.session_id).await.unwrap().is_active());
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn listings_respect_ownership_and_role() {
    let fx = setup().await;
    let orch = orchestrator(&fx, RecordingGateway::new());

    let kept = orch.launch(fx.alice, fx.app_id, false).await.unwrap();
    let stopped = orch.launch(fx.alice, fx.app_id, false).await.unwrap();
    orch.launch(fx.bob, fx.app_id, false).await.unwrap();
    orch.stop(fx.alice, stopped.session_id).await.unwrap();

    let own = orch.list_own(fx.alice).await.unwrap();
    assert_eq!(own.len(), 1);
    assert_eq!(own[0].id, kept.session_id);

    let err = orch.list_all(fx.alice).await.unwrap_err();
    assert!(matches!(err, WebtopError::Forbidden { .. }));

    let all = orch.list_all(fx.admin).await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all.iter().filter(|s| !s.is_active()).count(), 1);
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reconcile_ends_only_confirmed_missing_containers() {
    let fx = setup().await;
    let gateway = RecordingGateway::new().with_next_id("c-live").with_next_id("c-gone");
    let orch = orchestrator(&fx, gateway.clone());

    let live = orch.launch(fx.alice, fx.app_id, false).await.unwrap();
    let gone = orch.launch(fx.bob, fx.app_id, false).await.unwrap();
    gateway.forget("c-gone");

    let report = orch.reconcile_once().await.unwrap();
    assert_eq!(
        report,
        ReconcileReport {
            checked: 2,
            ended: 1,
            skipped: 0
        }
    );
    let store = sessions(&fx);
    assert!(store.find_by_id(live.session_id).await.unwrap().is_active());
    assert!(!store.find_by_id(gone.session_id).await.unwrap().is_active());
}

#[tokio::test]
async fn reconcile_skips_on_gateway_errors() {
    let fx = setup().await;
    let gateway = RecordingGateway::new();
    let orch = orchestrator(&fx, gateway.clone());

    let access = orch.launch(fx.alice, fx.app_id, false).await.unwrap();
    gateway.fail(
        GatewayOp::Inspect,
        GatewayError::Unavailable {
            reason: "down".into(),
        },
    );

    let report = orch.reconcile_once().await.unwrap();
    assert_eq!(report.skipped, 1);
    assert_eq!(report.ended, 0);
    assert!(sessions(&fx).find_by_id(access.session_id).await.unwrap().is_active());
}

#[tokio::test]
async fn background_reconciler_runs_until_shutdown() {
    let fx = setup().await;
    let gateway = RecordingGateway::new().with_next_id("c-drift");
    let orch = orchestrator(&fx, gateway.clone());

    let access = orch.launch(fx.alice, fx.app_id, false).await.unwrap();
    gateway.forget("c-drift");

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let handle = orch.spawn_reconciler(Duration::from_millis(20), shutdown_rx);

    let store = sessions(&fx);
    let mut ended = false;
    for _ in 0..50 {
        if !store.find_by_id(access.session_id).await.unwrap().is_active() {
            ended = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(ended, "reconciler never ended the drifted session");

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("reconciler did not stop")
        .unwrap();
}
