//! Reconciliación del callback asíncrono del motor.
//!
//! Pasos:
//! 1. Con la fila bloqueada, el workflow debe seguir en `Executing`; si no,
//!    `DuplicateCallback` (fatal).
//! 2. Clasificación y `finish_time`.
//! 3. Persistencia de contenido y workflow. Si falla tras pasar la guarda, se
//!    hace rollback y se fuerza `Exception` por la vía de emergencia.
//! 4-6. Resolución del entorno y promoción al siguiente (sólo si fue limpia).
//! 7. Auditoría.
//! 8. Invalidación de caché para DDL.
//! 9. Notificación si la fase "Execute" está habilitada.
//!
//! Los pasos 4-9 son best-effort: un fallo se registra y no impide los demás.
use log::{debug, error, info, warn};

use super::{classify, Orchestrator};
use crate::constants::{AUDIT_OP_EXECUTE_END, INSTANCE_RESOURCE_PATTERN, NOTIFY_PHASE_EXECUTE, WORKFLOW_TYPE_SQLREVIEW};
use crate::env::{promote, Env, EnvironmentLink};
use crate::errors::FlowError;
use crate::model::{AuditLogEntry, Operator, SyntaxType, TaskOutcome, Workflow, WorkflowId, WorkflowStatus};
use crate::repo::WorkflowRepository;

/// Resultado observable de una reconciliación.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    /// Estado final del workflow (finish, exception o review_pass).
    pub workflow: Workflow,
    /// Estado asignado por la clasificación, antes de promover.
    pub classified: WorkflowStatus,
    /// Entorno en el que se ejecutó, si hay enlace.
    pub environment: Option<Env>,
    /// Entorno al que se promovió.
    pub promoted_to: Option<Env>,
    /// Se usó la escritura de emergencia.
    pub fallback_used: bool,
}

impl<R: WorkflowRepository> Orchestrator<R> {
    pub fn reconcile(&self, outcome: TaskOutcome) -> Result<Reconciliation, FlowError> {
        let id = outcome.workflow_id;
        let mut locked: Option<Workflow> = None;
        let committed = self.repository.transaction(|tx| {
                                           let mut wf = tx.lock(id)?;
                                           if wf.status != WorkflowStatus::Executing {
                                               return Err(FlowError::DuplicateCallback { id,
                                                                                         status: wf.status });
                                           }
                                           locked = Some(wf.clone());
                                           let (status, result) = classify(&outcome.result, &wf.content.sql_content);
                                           wf.transition(status, "reconcile")?;
                                           wf.finish_time = Some(outcome.stopped_at);
                                           wf.content.execute_result = Some(result.to_json()?);
                                           tx.save_content(id, &wf.content)?;
                                           tx.save_workflow(&wf)?;
                                           Ok(wf)
                                       });

        let (mut workflow, fallback_used) = match (committed, locked) {
            (Ok(wf), _) => (wf, false),
            (Err(e), None) => return Err(e),
            (Err(e), Some(mut wf)) => {
                error!("reconcile workflow={id}: saving result failed: {e}; forcing exception");
                let detail = e.to_string();
                self.repository.force_exception(id, outcome.stopped_at, &detail)?;
                wf.status = WorkflowStatus::Exception;
                wf.finish_time = Some(outcome.stopped_at);
                wf.content.execute_result = Some(detail);
                (wf, true)
            }
        };
        let classified = workflow.status;
        debug!("reconcile workflow={id} classified={classified} fallback={fallback_used}");

        let mut environment = None;
        let mut promoted_to = None;
        match self.repository.find_env_link(&workflow.instance, &workflow.db_name) {
            Ok(Some((env, link))) => {
                environment = Some(env);
                if classified == WorkflowStatus::Exception {
                    debug!("reconcile workflow={id}: exception at {env}, no promotion");
                } else {
                    promoted_to = self.promote_and_save(&mut workflow, env, &link);
                }
            }
            Ok(None) => {
                let miss = FlowError::LinkLookupMiss { instance: workflow.instance.clone(),
                                                       db_name: workflow.db_name.clone() };
                warn!("reconcile workflow={id}: {miss}; promotion skipped");
            }
            Err(e) => error!("reconcile workflow={id}: environment lookup failed: {e}; promotion skipped"),
        }

        self.record_completion(&workflow, classified, environment, promoted_to);

        if workflow.syntax_type == SyntaxType::Ddl {
            self.invalidate_instance_resources(id);
        }

        if self.notify.is_enabled(NOTIFY_PHASE_EXECUTE) {
            if let Err(e) = self.notifier.notify_for_execute(&workflow) {
                error!("reconcile workflow={id}: notification failed: {e}");
            }
        }

        info!("reconcile workflow={id} status={} env={} next={}",
              workflow.status,
              environment.map(|e| e.label()).unwrap_or("-"),
              promoted_to.map(|e| e.label()).unwrap_or("-"));
        Ok(Reconciliation { workflow,
                            classified,
                            environment,
                            promoted_to,
                            fallback_used })
    }

    /// Promueve y persiste; si el guardado falla el workflow vuelve a su
    /// estado previo (sigue en `Finish` en la base de datos).
    fn promote_and_save(&self, workflow: &mut Workflow, current: Env, link: &EnvironmentLink) -> Option<Env> {
        let before = workflow.clone();
        let next = promote(workflow, current, link)?;
        let promoted = &*workflow;
        let saved = self.repository.transaction(|tx| {
                                       let row = tx.lock(promoted.id)?;
                                       if row.status != WorkflowStatus::Finish {
                                           return Err(FlowError::InvalidState { id: row.id,
                                                                                status: row.status,
                                                                                operation: "promote" });
                                       }
                                       tx.save_workflow(promoted)
                                   });
        match saved {
            Ok(()) => Some(next),
            Err(e) => {
                error!("reconcile workflow={}: saving promotion to {next} failed: {e}", before.id);
                *workflow = before;
                None
            }
        }
    }

    fn record_completion(&self,
                         workflow: &Workflow,
                         classified: WorkflowStatus,
                         environment: Option<Env>,
                         promoted_to: Option<Env>) {
        let env = environment.map(|e| e.label()).unwrap_or("");
        let pending = promoted_to.map(|next| format!(",{next} 环境待执行")).unwrap_or_default();
        let desc = format!("{env} 执行结束");
        let info = format!("{env} 环境执行结果：{}{pending}", classified.display());
        let res = self.audit
                      .detail_by_workflow_id(workflow.id, WORKFLOW_TYPE_SQLREVIEW)
                      .and_then(|audit_id| {
                          self.audit
                              .add_log(AuditLogEntry::new(audit_id, AUDIT_OP_EXECUTE_END, desc, info, &Operator::system()))
                      });
        if let Err(e) = res {
            error!("reconcile workflow={}: audit log failed: {e}", workflow.id);
        }
    }

    fn invalidate_instance_resources(&self, id: WorkflowId) {
        let Some(cache) = &self.cache else {
            debug!("reconcile workflow={id}: no cache configured, skipping invalidation");
            return;
        };
        match cache.invalidate_by_pattern(INSTANCE_RESOURCE_PATTERN) {
            Ok(n) => debug!("reconcile workflow={id}: invalidated {n} cache keys"),
            Err(e) => error!("reconcile workflow={id}: cache invalidation failed: {e}"),
        }
    }
}
