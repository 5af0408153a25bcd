//! Cola durable de ejecución.
//!
//! `execute_workflow` deja una tarea `pending` con la foto del workflow y
//! devuelve su id como handle. El ejecutor externo la reclama (`claim_next`,
//! `FOR UPDATE SKIP LOCKED`), ejecuta el SQL y la cierra con `complete`, que
//! produce el `TaskOutcome` a reconciliar.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use log::{debug, info, warn};
use sqlflow_core::{ExecutionEngine, FlowError, TaskHandle, TaskOutcome, TaskResult, Workflow};
use uuid::Uuid;

use super::rows::{NewTaskRow, TaskRow};
use super::{with_retry, ConnectionProvider};
use crate::error::PersistenceError;
use crate::schema::execution_task;

const STATE_PENDING: &str = "pending";
const STATE_RUNNING: &str = "running";
const STATE_DONE: &str = "done";

/// Tarea reclamada por un ejecutor.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimedTask {
    pub task_id: String,
    pub workflow: Workflow,
}

pub struct PgTaskQueue<P: ConnectionProvider> {
    provider: P,
}

impl<P: ConnectionProvider> PgTaskQueue<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Reclama la tarea pendiente más antigua, si la hay.
    pub fn claim_next(&self) -> Result<Option<ClaimedTask>, FlowError> {
        let claimed: Option<TaskRow> =
            with_retry(|| {
                let mut conn = self.provider.connection()?;
                conn.build_transaction()
                    .read_write()
                    .run(|c| {
                        let next = execution_task::table.filter(execution_task::state.eq(STATE_PENDING))
                                                        .order(execution_task::enqueued_at.asc())
                                                        .for_update()
                                                        .skip_locked()
                                                        .first::<TaskRow>(c)
                                                        .optional()?;
                        if let Some(row) = &next {
                            diesel::update(execution_task::table.find(row.task_id))
                                .set(execution_task::state.eq(STATE_RUNNING))
                                .execute(c)?;
                        }
                        Ok::<Option<TaskRow>, diesel::result::Error>(next)
                    })
                    .map_err(PersistenceError::from)
            })?;
        let Some(row) = claimed else {
            return Ok(None);
        };
        let workflow: Workflow = serde_json::from_value(row.payload)?;
        debug!("claim task={} workflow={}", row.task_id, row.workflow_id);
        Ok(Some(ClaimedTask { task_id: row.task_id.to_string(),
                              workflow }))
    }

    /// Cierra una tarea en curso con su resultado.
    ///
    /// Si la tarea ya estaba cerrada devuelve el resultado guardado en su
    /// momento (el nuevo se descarta), para poder repetir una reconciliación
    /// que falló; la guarda de `reconcile` rechaza la segunda si la primera
    /// llegó a confirmarse.
    pub fn complete(&self,
                    task_id: &str,
                    result: TaskResult,
                    stopped_at: DateTime<Utc>)
                    -> Result<TaskOutcome, FlowError> {
        let id = Uuid::parse_str(task_id).map_err(|e| {
                                                 FlowError::Persistence(format!("invalid task id {task_id}: {e}"))
                                             })?;
        let payload = serde_json::to_value(&result)?;
        let mut conn = with_retry(|| self.provider.connection())?;
        let workflow_id: Option<i64> =
            diesel::update(execution_task::table.find(id).filter(execution_task::state.eq(STATE_RUNNING)))
                .set((execution_task::state.eq(STATE_DONE),
                      execution_task::result.eq(Some(payload)),
                      execution_task::stopped_at.eq(Some(stopped_at))))
                .returning(execution_task::workflow_id)
                .get_result(&mut conn)
                .optional()
                .map_err(PersistenceError::from)?;
        if let Some(workflow_id) = workflow_id {
            info!("complete task={task_id} workflow={workflow_id}");
            return Ok(TaskOutcome { workflow_id,
                                    result,
                                    stopped_at });
        }

        let row = execution_task::table.find(id)
                                       .first::<TaskRow>(&mut conn)
                                       .optional()
                                       .map_err(PersistenceError::from)?;
        match row {
            Some(TaskRow { state,
                           workflow_id,
                           result: Some(stored),
                           stopped_at: Some(stopped_at),
                           .. })
                if state == STATE_DONE =>
            {
                warn!("complete task={task_id}: already done, replaying stored result");
                Ok(TaskOutcome { workflow_id,
                                 result: serde_json::from_value(stored)?,
                                 stopped_at })
            }
            Some(row) => Err(FlowError::Persistence(format!("task {task_id} is {}", row.state))),
            None => Err(FlowError::Persistence(format!("task {task_id} not found"))),
        }
    }

    /// Estado de una tarea (`pending`, `running` o `done`).
    pub fn state(&self, task_id: &str) -> Result<Option<String>, FlowError> {
        let id = Uuid::parse_str(task_id).map_err(|e| FlowError::Persistence(format!("invalid task id: {e}")))?;
        let mut conn = with_retry(|| self.provider.connection())?;
        Ok(execution_task::table.find(id)
                                .select(execution_task::state)
                                .first::<String>(&mut conn)
                                .optional()
                                .map_err(PersistenceError::from)?)
    }
}

impl<P: ConnectionProvider> ExecutionEngine for PgTaskQueue<P> {
    fn execute_workflow(&self, workflow: &Workflow) -> Result<TaskHandle, FlowError> {
        let payload = serde_json::to_value(workflow)?;
        let task_id = Uuid::new_v4();
        let mut conn = with_retry(|| self.provider.connection())?;
        diesel::insert_into(execution_task::table).values(&NewTaskRow { task_id,
                                                                        workflow_id: workflow.id,
                                                                        instance_name: &workflow.instance,
                                                                        db_name: &workflow.db_name,
                                                                        state: STATE_PENDING,
                                                                        payload: &payload })
                                                  .execute(&mut conn)
                                                  .map_err(|e| {
                                                      FlowError::EngineUnavailable(format!("{}: {}",
                                                                                           workflow.instance,
                                                                                           PersistenceError::from(e)))
                                                  })?;
        debug!("enqueue task={task_id} workflow={} instance={}", workflow.id, workflow.instance);
        Ok(TaskHandle { task_id: task_id.to_string() })
    }
}
