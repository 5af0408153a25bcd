
use harness::{harness, queued};
use sqlflow_core::{FlowError, Operator, WorkflowStatus};

#[test]
fn dispatch_moves_queued_workflow_to_executing() {
    let h = harness();
    h.repo().insert(queued(42, "[dev]Add index"));

    let handle = h.orchestrator.dispatch(42, None).expect("dispatch");

    assert_eq!(handle.task_id, "task-1");
    assert_eq!(h.workflow(42).status, WorkflowStatus::Executing);
    let submitted = h.engine.submitted();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].status, WorkflowStatus::Executing);
    assert_eq!(submitted[0].instance, "I1");
}

#[test]
fn dispatch_accepts_scheduled_workflows() {
    let h = harness();
    h.repo().insert(queued(7, "x").with_status(WorkflowStatus::TimingTask));
    h.orchestrator.dispatch(7, None).expect("dispatch");
    assert_eq!(h.workflow(7).status, WorkflowStatus::Executing);
}

#[test]
fn dispatch_writes_exactly_one_audit_entry() {
    let h = harness();
    h.repo().insert(queued(1, "system"));
    h.repo().insert(queued(2, "manual"));

    h.orchestrator.dispatch(1, None).unwrap();
    h.orchestrator.dispatch(2, Some(&Operator::new("alice", "Alice"))).unwrap();

    let entries = h.audit.entries();
    assert_eq!(entries.len(), 2);
    let system = &entries[0];
    assert_eq!((system.operation_type, system.operation_type_desc.as_str()), (5, "执行工单"));
    assert_eq!(system.operation_info, "系统定时执行工单");
    assert_eq!((system.operator.as_str(), system.operator_display.as_str()), ("", "系统"));
    let manual = &entries[1];
    assert_eq!(manual.operation_info, "工单开始执行");
    assert_eq!((manual.operator.as_str(), manual.operator_display.as_str()), ("alice", "Alice"));
}

#[test]
fn dispatch_rejects_every_non_dispatchable_status() {
    for status in WorkflowStatus::ALL.into_iter().filter(|s| !s.is_dispatchable()) {
        let h = harness();
        h.repo().insert(queued(3, "x").with_status(status));

        let err = h.orchestrator.dispatch(3, None).unwrap_err();

        assert_eq!(err,
                   FlowError::InvalidState { id: 3,
                                             status,
                                             operation: "dispatch" });
        assert_eq!(h.workflow(3).status, status, "status must not change");
        assert!(h.audit.entries().is_empty(), "no audit on failure");
        assert!(h.engine.submitted().is_empty(), "no engine call on failure");
    }
}

#[test]
fn dispatch_of_unknown_workflow_is_not_found() {
    let h = harness();
    assert_eq!(h.orchestrator.dispatch(99, None).unwrap_err(), FlowError::NotFound(99));
}

#[test]
fn second_dispatch_is_rejected() {
    let h = harness();
    h.repo().insert(queued(4, "x"));
    h.orchestrator.dispatch(4, None).unwrap();
    let err = h.orchestrator.dispatch(4, None).unwrap_err();
    assert!(matches!(err, FlowError::InvalidState { status: WorkflowStatus::Executing, .. }));
    assert_eq!(h.engine.submitted().len(), 1);
    assert_eq!(h.audit.entries().len(), 1);
}

#[test]
fn concurrent_dispatch_executes_once() {
    let h = harness();
    h.repo().insert(queued(5, "race"));

    let results: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..8).map(|_| s.spawn(|| h.orchestrator.dispatch(5, None))).collect();
        handles.into_iter().map(|t| t.join().expect("thread")).collect()
    });

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results.iter()
                   .filter_map(|r| r.as_ref().err())
                   .all(|e| matches!(e, FlowError::InvalidState { .. })));
    assert_eq!(h.engine.submitted_ids(), vec![5]);
    assert_eq!(h.audit.entries().len(), 1);
}

#[test]
fn audit_failure_does_not_block_engine_hand_off() {
    let h = harness();
    h.repo().insert(queued(6, "x"));
    h.audit.set_failing(true);

    h.orchestrator.dispatch(6, None).expect("dispatch");

    assert_eq!(h.engine.submitted_ids(), vec![6]);
    assert_eq!(h.workflow(6).status, WorkflowStatus::Executing);
}

#[test]
fn engine_submission_failure_marks_exception() {
    let h = harness();
    h.repo().insert(queued(8, "x"));
    h.engine.set_failing(true);

    let err = h.orchestrator.dispatch(8, None).unwrap_err();

    assert_eq!(err, FlowError::EngineUnavailable("I1".into()));
    let wf = h.workflow(8);
    assert_eq!(wf.status, WorkflowStatus::Exception, "never left executing");
    assert!(wf.content.execute_result.unwrap().contains("engine submission failed"));
}

#[test]
fn enqueue_requeues_promoted_workflow() {
    let h = harness();
    h.repo().insert(queued(9, "x").with_status(WorkflowStatus::ReviewPass));

    let wf = h.orchestrator.enqueue(9).unwrap();
    assert_eq!(wf.status, WorkflowStatus::Queuing);
    assert_eq!(h.workflow(9).status, WorkflowStatus::Queuing);

    let err = h.orchestrator.enqueue(9).unwrap_err();
    assert!(matches!(err, FlowError::InvalidState { operation: "enqueue", .. }));
}
