//! Ciclo completo dispatch -> claim -> complete -> reconcile sobre Postgres.
mod test_support;

use std::sync::Arc;

use chrono::Utc;
use sqlflow_core::{Env, ExecutionResult, FlowError, Orchestrator, TaskResult, WorkflowRepository, WorkflowStatus};
use sqlflow_persistence::{PgAuditLog, PgTaskQueue, PgWorkflowRepository};
use test_support::{fresh_id, queue_guard, queued_at_dev, unique_link, with_provider};

#[test]
fn clean_run_promotes_through_postgres() {
    let ran = with_provider(|provider| {
        let _queue = queue_guard();
        let id = fresh_id();
        let repo = PgWorkflowRepository::new(provider.clone());
        repo.add_link(&unique_link(id)).expect("link");
        repo.create(&queued_at_dev(id, id)).expect("create");
        let queue = Arc::new(PgTaskQueue::new(provider.clone()));
        let audit = Arc::new(PgAuditLog::new(provider.clone()));
        let orch = Orchestrator::builder(repo, queue.clone(), audit.clone()).build();

        let handle = orch.dispatch(id, None).expect("dispatch");
        assert_eq!(queue.state(&handle.task_id).unwrap().as_deref(), Some("pending"));
        assert_eq!(orch.repository().load(id).unwrap().status, WorkflowStatus::Executing);

        // Otros tests pueden dejar tareas pendientes: se reclama hasta dar con la propia.
        let claimed = std::iter::from_fn(|| queue.claim_next().expect("claim"))
            .find(|t| t.task_id == handle.task_id)
            .expect("own task claimed");
        assert_eq!(claimed.workflow.id, id);
        assert_eq!(claimed.workflow.status, WorkflowStatus::Executing);

        let outcome = queue.complete(&handle.task_id,
                                     TaskResult::Completed(ExecutionResult::new(&claimed.workflow.content.sql_content)),
                                     Utc::now())
                           .expect("complete");
        let rec = orch.reconcile(outcome).expect("reconcile");

        assert_eq!(rec.environment, Some(Env::Dev));
        assert_eq!(rec.promoted_to, Some(Env::Sit));
        let wf = orch.repository().load(id).unwrap();
        assert_eq!(wf.status, WorkflowStatus::ReviewPass);
        assert_eq!(wf.instance, format!("sit-{id}"));
        assert_eq!(wf.workflow_name, "[sit]Add index");
        assert!(wf.content.execute_result.is_some());
        assert_eq!(queue.state(&handle.task_id).unwrap().as_deref(), Some("done"));

        use sqlflow_core::AuditLog;
        let audit_id = audit.detail_by_workflow_id(id, 2).unwrap();
        let infos: Vec<String> = audit.entries_for(audit_id).unwrap().into_iter().map(|e| e.operation_info).collect();
        assert_eq!(infos, vec!["系统定时执行工单".to_string(), "dev 环境执行结果：已正常结束,sit 环境待执行".to_string()]);
    });
    if ran.is_none() {
        eprintln!("skip (no DATABASE_URL)");
    }
}

#[test]
fn second_callback_is_rejected() {
    let ran = with_provider(|provider| {
        let id = fresh_id();
        let repo = PgWorkflowRepository::new(provider.clone());
        repo.create(&queued_at_dev(id, id)).expect("create");
        let orch = Orchestrator::builder(repo,
                                         Arc::new(PgTaskQueue::new(provider.clone())),
                                         Arc::new(PgAuditLog::new(provider.clone()))).build();
        orch.dispatch(id, None).expect("dispatch");
        let outcome = sqlflow_core::TaskOutcome { workflow_id: id,
                                                  result: TaskResult::Failed("boom".into()),
                                                  stopped_at: Utc::now() };

        let first = orch.reconcile(outcome.clone()).expect("first");
        assert_eq!(first.workflow.status, WorkflowStatus::Exception);
        assert_eq!(first.environment, None, "no link for this instance");

        let err = orch.reconcile(outcome).unwrap_err();
        assert!(matches!(err, FlowError::DuplicateCallback { status: WorkflowStatus::Exception, .. }));
    });
    if ran.is_none() {
        eprintln!("skip (no DATABASE_URL)");
    }
}

#[test]
fn concurrent_dispatch_locks_the_row() {
    let ran = with_provider(|provider| {
        let id = fresh_id();
        let repo = PgWorkflowRepository::new(provider.clone());
        repo.create(&queued_at_dev(id, id)).expect("create");
        let orch = Orchestrator::builder(repo,
                                         Arc::new(PgTaskQueue::new(provider.clone())),
                                         Arc::new(PgAuditLog::new(provider.clone()))).build();

        let ok = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4).map(|_| s.spawn(|| orch.dispatch(id, None).is_ok())).collect();
            handles.into_iter().map(|h| h.join().unwrap()).filter(|ok| *ok).count()
        });
        assert_eq!(ok, 1);
    });
    if ran.is_none() {
        eprintln!("skip (no DATABASE_URL)");
    }
}

#[test]
fn force_exception_overrides_status() {
    let ran = with_provider(|provider| {
        let id = fresh_id();
        let repo = PgWorkflowRepository::new(provider);
        repo.create(&queued_at_dev(id, id).with_status(WorkflowStatus::Executing)).expect("create");

        repo.force_exception(id, Utc::now(), "could not save result").expect("force");

        let wf = repo.load(id).unwrap();
        assert_eq!(wf.status, WorkflowStatus::Exception);
        assert_eq!(wf.content.execute_result.as_deref(), Some("could not save result"));
        assert!(wf.finish_time.is_some());
        assert_eq!(repo.force_exception(-1, Utc::now(), "x").unwrap_err(), FlowError::NotFound(-1));
    });
    if ran.is_none() {
        eprintln!("skip (no DATABASE_URL)");
    }
}

#[test]
fn completing_a_done_task_replays_the_stored_outcome() {
    let ran = with_provider(|provider| {
        let _queue = queue_guard();
        let id = fresh_id();
        let repo = PgWorkflowRepository::new(provider.clone());
        repo.add_link(&unique_link(id)).expect("link");
        repo.create(&queued_at_dev(id, id)).expect("create");
        let queue = Arc::new(PgTaskQueue::new(provider.clone()));
        let orch = Orchestrator::builder(repo, queue.clone(), Arc::new(PgAuditLog::new(provider.clone()))).build();
        let handle = orch.dispatch(id, None).expect("dispatch");
        std::iter::from_fn(|| queue.claim_next().expect("claim")).find(|t| t.task_id == handle.task_id)
                                                                   .expect("own task claimed");

        // El primer cierre se confirma pero la reconciliación no llega a correr.
        let first = queue.complete(&handle.task_id, TaskResult::Failed("worker lost".into()), Utc::now())
                         .expect("complete");
        assert_eq!(orch.repository().load(id).unwrap().status, WorkflowStatus::Executing);

        let again = queue.complete(&handle.task_id,
                                   TaskResult::Completed(ExecutionResult::new("ignored")),
                                   Utc::now())
                         .expect("replay");
        assert_eq!(again.workflow_id, id);
        assert_eq!(again.result, first.result);
        assert_eq!(again.stopped_at.timestamp_micros(), first.stopped_at.timestamp_micros());

        let rec = orch.reconcile(again.clone()).expect("retried reconcile");
        assert_eq!(rec.workflow.status, WorkflowStatus::Exception);
        let err = orch.reconcile(again).unwrap_err();
        assert!(matches!(err, FlowError::DuplicateCallback { .. }));

        let unknown = queue.complete("00000000-0000-0000-0000-000000000000",
                                     TaskResult::Failed("x".into()),
                                     Utc::now())
                           .unwrap_err();
        assert!(matches!(unknown, FlowError::Persistence(_)));
    });
    if ran.is_none() {
        eprintln!("skip (no DATABASE_URL)");
    }
}
