//! Session lifecycle: partitioning at initialization, start/stop
//! guards, partition clearing, and manager-level flows.

use std::time::Duration;

use interplex::models::session::{SessionSpec, SessionStatus};
use interplex::orchestrator::session::Session;
use interplex::orchestrator::session_manager::SessionManager;
use interplex::runtime::ModuleStatus;
use interplex::AppError;

use super::test_helpers as helpers;

fn two_node_spec() -> SessionSpec {
    SessionSpec {
        name: "demo".into(),
        processing_modules: vec![
            helpers::local_pm("PM_A"),
            helpers::lockstep_pm("PM_B", Some("N2"), &[]),
        ],
        ..SessionSpec::default()
    }
}

#[tokio::test]
async fn initialize_partitions_modules_by_node() {
    let h = helpers::harness(Duration::from_secs(5));
    let mut session = Session::new(two_node_spec(), h.ctx.clone());
    assert!(session.initialize());
    assert_eq!(session.status(), SessionStatus::Created);

    // PM_A has no target node, so it runs on the master.
    assert_eq!(session.local_pms().len(), 1);
    let pm_a = &session.local_pms()[0];
    assert_eq!(pm_a.name, "PM_A");
    assert_eq!(pm_a.node_id.as_deref(), Some("master"));
    assert_eq!(pm_a.session_id, session.id());
    assert!(!pm_a.id.is_empty(), "local modules get their instance id");

    // PM_B is grouped under its node in both partitions.
    let remote = session.remote_pms().get("N2").expect("N2 partition");
    assert_eq!(remote.len(), 1);
    assert_eq!(remote[0].name, "PM_B");
    assert!(!remote[0].id.is_empty(), "remote modules get fresh ids");

    let lockstep = session.lockstep_pms().get("N2").expect("N2 lockstep group");
    assert_eq!(lockstep[0].id, remote[0].id);
}

#[tokio::test]
async fn initialize_resolves_mappings_declared_by_name() {
    let h = helpers::harness(Duration::from_secs(5));
    let spec = SessionSpec {
        name: "wired".into(),
        processing_modules: vec![helpers::local_pm("PM_A")],
        io_mappings: vec![helpers::topic_mapping("PM_A", "pose", "tracker/pose")],
        ..SessionSpec::default()
    };
    let mut session = Session::new(spec, h.ctx.clone());
    assert!(session.initialize());

    let activated = h.modules.io_mappings(session.id()).expect("mappings applied");
    assert_eq!(activated.len(), 1);
    assert_eq!(activated[0].processing_module_id, session.local_pms()[0].id);
}

#[tokio::test]
async fn unresolved_mapping_fails_initialization() {
    let h = helpers::harness(Duration::from_secs(5));
    let spec = SessionSpec {
        name: "misconfigured".into(),
        processing_modules: vec![helpers::local_pm("PM_A")],
        io_mappings: vec![helpers::topic_mapping("NO_SUCH_PM", "pose", "tracker/pose")],
        ..SessionSpec::default()
    };
    let mut session = Session::new(spec, h.ctx.clone());
    assert!(!session.initialize(), "unresolved mapping is a configuration error");
}

#[tokio::test]
async fn module_instantiation_failure_aborts_initialization() {
    let h = helpers::harness(Duration::from_secs(5));
    let spec = SessionSpec {
        name: "broken".into(),
        // The registry refuses to instantiate a module without a name.
        processing_modules: vec![helpers::local_pm("")],
        ..SessionSpec::default()
    };
    let mut session = Session::new(spec, h.ctx.clone());
    assert!(!session.initialize());
}

#[tokio::test]
async fn initialize_runs_only_once() {
    let h = helpers::harness(Duration::from_secs(5));
    let mut session = Session::new(two_node_spec(), h.ctx.clone());
    assert!(session.initialize());
    assert!(!session.initialize(), "partitions are computed exactly once");
}

#[tokio::test]
async fn start_refuses_a_running_session_and_leaves_state_unchanged() {
    let h = helpers::harness(Duration::from_secs(5));
    let mut session = Session::new(two_node_spec(), h.ctx.clone());
    assert!(session.initialize());
    assert!(session.start());
    assert_eq!(session.status(), SessionStatus::Running);

    let local_before = session.local_pms().to_vec();
    assert!(!session.start(), "second start must fail");
    assert_eq!(session.status(), SessionStatus::Running);
    assert_eq!(session.local_pms(), local_before.as_slice());

    assert!(session.stop());
}

#[tokio::test]
async fn start_refuses_a_session_without_modules() {
    let h = helpers::harness(Duration::from_secs(5));
    let mut session = Session::new(SessionSpec::default(), h.ctx.clone());
    assert!(session.initialize());
    assert!(!session.start());
    assert_eq!(session.status(), SessionStatus::Created);
}

#[tokio::test]
async fn start_runs_local_modules() {
    let h = helpers::harness(Duration::from_secs(5));
    let mut session = Session::new(two_node_spec(), h.ctx.clone());
    assert!(session.initialize());
    let local_id = session.local_pms()[0].id.clone();
    assert_eq!(h.modules.module_status(&local_id), Some(ModuleStatus::Created));

    assert!(session.start());
    assert_eq!(h.modules.module_status(&local_id), Some(ModuleStatus::Started));

    assert!(session.stop());
    assert_eq!(h.modules.module_status(&local_id), Some(ModuleStatus::Stopped));
}

#[tokio::test]
async fn stop_refuses_a_non_running_session() {
    let h = helpers::harness(Duration::from_secs(5));
    let mut session = Session::new(two_node_spec(), h.ctx.clone());
    assert!(session.initialize());
    assert!(!session.stop(), "created sessions cannot be stopped");
}

#[tokio::test]
async fn stop_clears_partitions_and_restart_is_unsupported() {
    let h = helpers::harness(Duration::from_secs(5));
    let mut session = Session::new(two_node_spec(), h.ctx.clone());
    assert!(session.initialize());
    assert!(session.start());

    assert!(session.stop());
    assert_eq!(session.status(), SessionStatus::Stopped);
    assert!(session.local_pms().is_empty());
    assert!(session.remote_pms().is_empty());
    assert!(session.lockstep_pms().is_empty());

    assert!(!session.stop(), "stopping twice must fail");
    assert!(!session.start(), "a stopped session cannot be restarted");
}

#[tokio::test]
async fn manager_drives_the_full_lifecycle() {
    let h = helpers::harness(Duration::from_secs(5));
    let manager = SessionManager::new(h.ctx.clone());

    let id = manager.create_session(two_node_spec()).expect("created");
    assert_eq!(manager.status(&id), Some(SessionStatus::Created));
    assert_eq!(manager.session_count(), 1);

    manager.start_session(&id).expect("started");
    assert_eq!(manager.status(&id), Some(SessionStatus::Running));

    // A second start is a caller error.
    assert!(matches!(
        manager.start_session(&id),
        Err(AppError::Session(_))
    ));

    manager.stop_session(&id).expect("stopped");
    assert_eq!(manager.status(&id), Some(SessionStatus::Stopped));
    assert!(matches!(
        manager.stop_session(&id),
        Err(AppError::Session(_))
    ));

    manager.remove_session(&id).expect("removed");
    assert_eq!(manager.status(&id), None);
    assert_eq!(manager.session_count(), 0);
}

#[tokio::test]
async fn manager_rejects_sessions_that_fail_initialization() {
    let h = helpers::harness(Duration::from_secs(5));
    let manager = SessionManager::new(h.ctx.clone());

    let spec = SessionSpec {
        name: "misconfigured".into(),
        processing_modules: vec![helpers::local_pm("PM_A")],
        io_mappings: vec![helpers::topic_mapping("NO_SUCH_PM", "pose", "tracker/pose")],
        ..SessionSpec::default()
    };
    let result = manager.create_session(spec);
    assert!(matches!(result, Err(AppError::Session(_))));
    assert_eq!(manager.session_count(), 0);
}

#[tokio::test]
async fn manager_reports_unknown_sessions() {
    let h = helpers::harness(Duration::from_secs(5));
    let manager = SessionManager::new(h.ctx.clone());
    assert!(matches!(
        manager.start_session("missing"),
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        manager.stop_session("missing"),
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        manager.remove_session("missing"),
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn manager_removes_running_sessions_after_stopping_them() {
    let h = helpers::harness(Duration::from_secs(5));
    let manager = SessionManager::new(h.ctx.clone());
    let id = manager.create_session(two_node_spec()).expect("created");
    manager.start_session(&id).expect("started");

    manager.remove_session(&id).expect("removed while running");
    assert_eq!(manager.session_count(), 0);
}
