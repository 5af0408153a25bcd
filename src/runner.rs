//! Motor de ejecución en proceso.
//!
//! `ChannelEngine` entrega cada workflow despachado a un canal tokio y
//! devuelve el handle en el acto. `CallbackRunner` consume el canal, ejecuta
//! el SQL con un `SqlExecutor` y reconcilia el resultado en un hilo bloqueante,
//! como haría el callback de un motor externo.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, error};
use sqlflow_core::{ErrLevel, ExecutionEngine, ExecutionResult, FlowError, Orchestrator, Reconciliation, ReviewResult,
                   TaskHandle, TaskOutcome, TaskResult, Workflow, WorkflowRepository};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// Tarea en vuelo.
#[derive(Debug, Clone)]
pub struct QueuedTask {
    pub handle: TaskHandle,
    pub workflow: Workflow,
}

pub struct ChannelEngine {
    tx: UnboundedSender<QueuedTask>,
    next: AtomicU64,
}

impl ChannelEngine {
    pub fn channel() -> (Self, UnboundedReceiver<QueuedTask>) {
        let (tx, rx) = unbounded_channel();
        (Self { tx,
                next: AtomicU64::new(1) },
         rx)
    }
}

impl ExecutionEngine for ChannelEngine {
    fn execute_workflow(&self, workflow: &Workflow) -> Result<TaskHandle, FlowError> {
        let n = self.next.fetch_add(1, Ordering::SeqCst);
        let handle = TaskHandle { task_id: format!("local-{n}") };
        self.tx
            .send(QueuedTask { handle: handle.clone(),
                               workflow: workflow.clone() })
            .map_err(|_| FlowError::EngineUnavailable(workflow.instance.clone()))?;
        Ok(handle)
    }
}

/// Ejecuta el SQL de un workflow contra su instancia.
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    async fn execute(&self, workflow: &Workflow) -> TaskResult;
}

/// No toca ninguna base de datos: una fila limpia por sentencia.
pub struct DryRunExecutor;

#[async_trait]
impl SqlExecutor for DryRunExecutor {
    async fn execute(&self, workflow: &Workflow) -> TaskResult {
        let sql = &workflow.content.sql_content;
        let rows = sql.split(';')
                      .map(str::trim)
                      .filter(|s| !s.is_empty())
                      .enumerate()
                      .map(|(i, stmt)| ReviewResult { id: i as u32 + 1,
                                                      stage: "Executed".into(),
                                                      errlevel: ErrLevel::Ok,
                                                      stagestatus: "Execute Successfully".into(),
                                                      sql: stmt.to_string(),
                                                      execute_time: "0".into(),
                                                      ..ReviewResult::default() })
                      .collect();
        TaskResult::Completed(ExecutionResult { rows,
                                                ..ExecutionResult::new(sql.as_str()) })
    }
}

pub struct CallbackRunner<R: WorkflowRepository + 'static> {
    rx: UnboundedReceiver<QueuedTask>,
    executor: Arc<dyn SqlExecutor>,
    orchestrator: Arc<Orchestrator<R>>,
}

impl<R: WorkflowRepository + 'static> CallbackRunner<R> {
    pub fn new(rx: UnboundedReceiver<QueuedTask>,
               executor: Arc<dyn SqlExecutor>,
               orchestrator: Arc<Orchestrator<R>>)
               -> Self {
        Self { rx,
               executor,
               orchestrator }
    }

    /// Procesa las tareas ya encoladas y devuelve una entrada por tarea.
    pub async fn drain(&mut self) -> Vec<(TaskHandle, Result<Reconciliation, FlowError>)> {
        let mut done = Vec::new();
        while let Ok(task) = self.rx.try_recv() {
            let outcome = self.run_one(&task).await;
            done.push((task.handle, outcome));
        }
        done
    }

    async fn run_one(&self, task: &QueuedTask) -> Result<Reconciliation, FlowError> {
        debug!("runner task={} workflow={}", task.handle.task_id, task.workflow.id);
        let result = self.executor.execute(&task.workflow).await;
        let outcome = TaskOutcome { workflow_id: task.workflow.id,
                                    result,
                                    stopped_at: Utc::now() };
        let orchestrator = self.orchestrator.clone();
        let reconciled = tokio::task::spawn_blocking(move || orchestrator.reconcile(outcome))
            .await
            .map_err(|e| FlowError::collaborator("runner", e.to_string()))?;
        if let Err(e) = &reconciled {
            error!("runner task={}: reconcile failed: {e}", task.handle.task_id);
        }
        reconciled
    }
}
