//! Despacho de workflows al motor de ejecución.
//!
//! La transición queuing/timingtask -> executing se hace con la fila bloqueada
//! y se confirma antes de hablar con el motor, de modo que un motor lento no
//! retiene el bloqueo y dos despachos concurrentes del mismo id no pueden
//! ejecutar dos veces.
use chrono::{DateTime, Utc};
use log::{debug, error, info};

use super::Orchestrator;
use crate::collab::TaskHandle;
use crate::constants::{AUDIT_INFO_MANUAL_EXECUTE, AUDIT_INFO_TIMED_EXECUTE, AUDIT_OP_EXECUTE, AUDIT_OP_EXECUTE_DESC,
                       WORKFLOW_TYPE_SQLREVIEW};
use crate::env::Env;
use crate::errors::FlowError;
use crate::model::{AuditLogEntry, Operator, TaskOutcome, TaskResult, User, Workflow, WorkflowId, WorkflowStatus};
use crate::policy::{can_execute, can_execute_at_env, on_correct_time_period};
use crate::repo::WorkflowRepository;

impl<R: WorkflowRepository> Orchestrator<R> {
    /// Pasa el workflow a `Executing` y lo entrega al motor de su instancia.
    ///
    /// `operator` ausente significa ejecución programada por el sistema.
    /// Devuelve el handle de la tarea sin esperar a su resultado.
    pub fn dispatch(&self, id: WorkflowId, operator: Option<&Operator>) -> Result<TaskHandle, FlowError> {
        let workflow = self.repository.transaction(|tx| {
                                          let mut wf = tx.lock(id)?;
                                          if !wf.status.is_dispatchable() {
                                              return Err(FlowError::InvalidState { id,
                                                                                   status: wf.status,
                                                                                   operation: "dispatch" });
                                          }
                                          wf.transition(WorkflowStatus::Executing, "dispatch")?;
                                          tx.save_workflow(&wf)?;
                                          Ok(wf)
                                      })?;
        info!("dispatch workflow={id} instance={} db={} by={}",
              workflow.instance,
              workflow.db_name,
              operator.map(|o| o.username.as_str()).unwrap_or("system"));

        self.record_dispatch(&workflow, operator);

        match self.engine.execute_workflow(&workflow) {
            Ok(handle) => {
                debug!("dispatch workflow={id} task={}", handle.task_id);
                Ok(handle)
            }
            Err(e) => {
                // Sin tarea no habrá callback: se reconcilia aquí como fallo.
                error!("dispatch workflow={id}: engine submission failed: {e}");
                let outcome = TaskOutcome { workflow_id: id,
                                            result: TaskResult::Failed(format!("engine submission failed: {e}")),
                                            stopped_at: Utc::now() };
                if let Err(re) = self.reconcile(outcome) {
                    error!("dispatch workflow={id}: could not record submission failure: {re}");
                }
                Err(e)
            }
        }
    }

    /// Vuelve a encolar un workflow aprobado/promovido o programado.
    pub fn enqueue(&self, id: WorkflowId) -> Result<Workflow, FlowError> {
        let wf = self.repository.transaction(|tx| {
                                    let mut wf = tx.lock(id)?;
                                    if !matches!(wf.status, WorkflowStatus::ReviewPass | WorkflowStatus::TimingTask) {
                                        return Err(FlowError::InvalidState { id,
                                                                             status: wf.status,
                                                                             operation: "enqueue" });
                                    }
                                    wf.transition(WorkflowStatus::Queuing, "enqueue")?;
                                    tx.save_workflow(&wf)?;
                                    Ok(wf)
                                })?;
        debug!("enqueue workflow={id} target={}/{}", wf.instance, wf.db_name);
        Ok(wf)
    }

    /// Ejecución solicitada por un usuario: comprueba entorno, permisos y
    /// ventana de ejecución sobre la fila bloqueada, encola y despacha.
    pub fn execute_by_user(&self, user: &User, id: WorkflowId, now: DateTime<Utc>) -> Result<TaskHandle, FlowError> {
        self.repository.transaction(|tx| {
                           let mut wf = tx.lock(id)?;
                           let envs = self.envs_of(&wf);
                           if !can_execute_at_env(user, &envs) {
                               return Err(FlowError::PermissionDenied(format!("{} cannot execute workflow {id} at {}/{} ({envs:?})",
                                                                              user.username, wf.instance, wf.db_name)));
                           }
                           if !can_execute(user, &wf) {
                               return Err(FlowError::PermissionDenied(format!("{} cannot execute workflow {id} in status {}",
                                                                              user.username, wf.status)));
                           }
                           if !on_correct_time_period(&wf, now) {
                               return Err(FlowError::OutsideExecutionWindow(id));
                           }
                           wf.transition(WorkflowStatus::Queuing, "execute")?;
                           tx.save_workflow(&wf)
                       })?;

        self.dispatch(id, Some(&user.operator()))
    }

    /// Slots del enlace que ocupa el destino actual del workflow. Un fallo de
    /// lectura se registra y no restringe.
    pub(crate) fn envs_of(&self, wf: &Workflow) -> Vec<Env> {
        match self.repository.find_env_link(&wf.instance, &wf.db_name) {
            Ok(Some((_, link))) => link.envs_of(&wf.instance, &wf.db_name),
            Ok(None) => Vec::new(),
            Err(e) => {
                error!("workflow={}: environment lookup failed: {e}", wf.id);
                Vec::new()
            }
        }
    }

    fn record_dispatch(&self, workflow: &Workflow, operator: Option<&Operator>) {
        let info = if operator.is_some() { AUDIT_INFO_MANUAL_EXECUTE } else { AUDIT_INFO_TIMED_EXECUTE };
        let operator = operator.cloned().unwrap_or_else(Operator::system);
        let res = self.audit
                      .detail_by_workflow_id(workflow.id, WORKFLOW_TYPE_SQLREVIEW)
                      .and_then(|audit_id| {
                          self.audit
                              .add_log(AuditLogEntry::new(audit_id, AUDIT_OP_EXECUTE, AUDIT_OP_EXECUTE_DESC, info, &operator))
                      });
        if let Err(e) = res {
            error!("dispatch workflow={}: audit log failed: {e}", workflow.id);
        }
    }
}
