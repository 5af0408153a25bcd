
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use harness::{chain_link, harness, queued, stopped_at};
use sqlflow_core::collab::{InMemoryAuditLog, RecordingEngine};
use sqlflow_core::constants::{PERM_EXECUTE, PERM_EXECUTE_FOR_GROUP};
use sqlflow_core::repo::Fault;
use sqlflow_core::{Env, EnvSlot, EnvironmentLink, FlowError, InMemoryWorkflowRepository, Orchestrator, User, Workflow,
                   WorkflowId, WorkflowRepository, WorkflowStatus, WorkflowTx};

fn approved(id: i64) -> Workflow {
    queued(id, "[dev]x").with_status(WorkflowStatus::ReviewPass)
                        .with_owner("alice", 3)
}

fn alice() -> User {
    User { username: "alice".into(),
           display: "Alice".into(),
           permissions: [PERM_EXECUTE.to_string()].into_iter().collect(),
           ..User::default() }
}

#[test]
fn owner_executes_approved_workflow() {
    let h = harness();
    h.repo().insert(approved(1));

    h.orchestrator.execute_by_user(&alice(), 1, stopped_at()).expect("execute");

    assert_eq!(h.workflow(1).status, WorkflowStatus::Executing);
    assert_eq!(h.engine.submitted_ids(), vec![1]);
    let entry = &h.audit.entries()[0];
    assert_eq!((entry.operator.as_str(), entry.operator_display.as_str()), ("alice", "Alice"));
    assert_eq!(entry.operation_info, "工单开始执行");
}

#[test]
fn stranger_is_denied() {
    let h = harness();
    h.repo().insert(approved(2));
    let bob = User { username: "bob".into(),
                     ..alice() };

    let err = h.orchestrator.execute_by_user(&bob, 2, stopped_at()).unwrap_err();

    assert!(matches!(err, FlowError::PermissionDenied(_)));
    assert_eq!(h.workflow(2).status, WorkflowStatus::ReviewPass);
    assert!(h.engine.submitted().is_empty());
}

#[test]
fn resource_group_member_may_execute() {
    let h = harness();
    h.repo().insert(approved(3));
    let carol = User { username: "carol".into(),
                       resource_groups: vec![3],
                       permissions: [PERM_EXECUTE_FOR_GROUP.to_string()].into_iter().collect(),
                       ..User::default() };

    h.orchestrator.execute_by_user(&carol, 3, stopped_at()).expect("execute");
    assert_eq!(h.workflow(3).status, WorkflowStatus::Executing);
}

#[test]
fn uat_needs_privileged_group() {
    let h = harness();
    let mut wf = approved(4);
    wf.instance = "I3".into();
    wf.db_name = "D3".into();
    h.repo().insert(wf);

    let err = h.orchestrator.execute_by_user(&alice(), 4, stopped_at()).unwrap_err();
    assert!(matches!(err, FlowError::PermissionDenied(_)));

    let dba = User { groups: vec!["dba".into()],
                     ..alice() };
    h.orchestrator.execute_by_user(&dba, 4, stopped_at()).expect("execute");
}

#[test]
fn outside_window_is_rejected() {
    let h = harness();
    let now = stopped_at();
    h.repo().insert(approved(5).with_window(Some(now + Duration::hours(1)), None));

    let err = h.orchestrator.execute_by_user(&alice(), 5, now).unwrap_err();

    assert_eq!(err, FlowError::OutsideExecutionWindow(5));
    assert_eq!(h.workflow(5).status, WorkflowStatus::ReviewPass);

    h.orchestrator
     .execute_by_user(&alice(), 5, now + Duration::hours(2))
     .expect("inside window");
}

#[test]
fn already_running_workflow_is_denied() {
    let h = harness();
    h.repo().insert(approved(6).with_status(WorkflowStatus::Executing));
    let err = h.orchestrator.execute_by_user(&alice(), 6, stopped_at()).unwrap_err();
    assert!(matches!(err, FlowError::PermissionDenied(_)));
}

/// Lecturas sin bloqueo devuelven una foto vieja del workflow; la fila real
/// ya fue promovida por otro proceso.
struct StaleReads {
    inner: InMemoryWorkflowRepository,
    snapshot: Workflow,
}

impl WorkflowRepository for StaleReads {
    fn transaction<T, F>(&self, f: F) -> Result<T, FlowError>
        where F: FnOnce(&mut dyn WorkflowTx) -> Result<T, FlowError>
    {
        self.inner.transaction(f)
    }

    fn load(&self, _id: WorkflowId) -> Result<Workflow, FlowError> {
        Ok(self.snapshot.clone())
    }

    fn force_exception(&self, id: WorkflowId, finish_time: DateTime<Utc>, detail: &str) -> Result<(), FlowError> {
        self.inner.force_exception(id, finish_time, detail)
    }

    fn find_env_link(&self, instance: &str, db_name: &str) -> Result<Option<(Env, EnvironmentLink)>, FlowError> {
        self.inner.find_env_link(instance, db_name)
    }
}

#[test]
fn environment_comes_from_the_locked_row() {
    let inner = InMemoryWorkflowRepository::new();
    inner.add_link(chain_link());
    let mut at_sit = approved(7);
    at_sit.instance = "I2".into();
    at_sit.db_name = "D2".into();
    let mut at_uat = at_sit.clone();
    at_uat.instance = "I3".into();
    at_uat.db_name = "D3".into();
    at_uat.workflow_name = "[uat]x".into();
    inner.insert(at_uat);
    let engine = Arc::new(RecordingEngine::new());
    let orchestrator = Orchestrator::builder(StaleReads { inner,
                                                          snapshot: at_sit },
                                             engine.clone(),
                                             Arc::new(InMemoryAuditLog::new())).build();

    let err = orchestrator.execute_by_user(&alice(), 7, stopped_at()).unwrap_err();

    assert!(matches!(err, FlowError::PermissionDenied(_)));
    assert!(engine.submitted().is_empty());
}

#[test]
fn pair_shared_by_dev_and_uat_is_restricted() {
    let h = harness();
    h.repo().add_link(EnvironmentLink { id: 2,
                                        dev: EnvSlot::new("I8", "D8"),
                                        sit: EnvSlot::empty(),
                                        uat: EnvSlot::new("I8", "D8"),
                                        pro: EnvSlot::empty() });
    let mut wf = approved(8);
    wf.instance = "I8".into();
    wf.db_name = "D8".into();
    h.repo().insert(wf);

    let err = h.orchestrator.execute_by_user(&alice(), 8, stopped_at()).unwrap_err();

    assert!(matches!(err, FlowError::PermissionDenied(_)));
    assert_eq!(h.workflow(8).status, WorkflowStatus::ReviewPass);
}

#[test]
fn link_lookup_failure_does_not_restrict() {
    let h = harness();
    h.repo().insert(approved(9));
    h.repo().fail(Fault::LinkLookup);

    h.orchestrator.execute_by_user(&alice(), 9, stopped_at()).expect("execute");
    assert_eq!(h.workflow(9).status, WorkflowStatus::Executing);
}
