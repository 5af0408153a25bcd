//! Programación y cancelación de workflows a petición de un usuario.
use log::info;

use super::Orchestrator;
use crate::errors::FlowError;
use crate::model::{User, Workflow, WorkflowId, WorkflowStatus};
use crate::policy::{can_cancel, can_timingtask};
use crate::repo::WorkflowRepository;

impl<R: WorkflowRepository> Orchestrator<R> {
    /// Deja un workflow aprobado en `TimingTask` para que lo despache el
    /// planificador. Programar uno ya programado no cambia nada.
    pub fn schedule_by_user(&self, user: &User, id: WorkflowId) -> Result<Workflow, FlowError> {
        let wf = self.repository.transaction(|tx| {
                                    let mut wf = tx.lock(id)?;
                                    if !can_timingtask(user, &wf) {
                                        return Err(FlowError::PermissionDenied(format!("{} cannot schedule workflow {id} in status {}",
                                                                                       user.username, wf.status)));
                                    }
                                    if wf.status == WorkflowStatus::ReviewPass {
                                        wf.transition(WorkflowStatus::TimingTask, "schedule")?;
                                        tx.save_workflow(&wf)?;
                                    }
                                    Ok(wf)
                                })?;
        info!("schedule workflow={id} by={}", user.username);
        Ok(wf)
    }

    /// Termina un workflow que todavía no ha empezado a ejecutarse.
    pub fn cancel_by_user(&self, user: &User, id: WorkflowId) -> Result<Workflow, FlowError> {
        let wf = self.repository.transaction(|tx| {
                                    let mut wf = tx.lock(id)?;
                                    if !can_cancel(user, &wf) {
                                        return Err(FlowError::PermissionDenied(format!("{} cannot cancel workflow {id} in status {}",
                                                                                       user.username, wf.status)));
                                    }
                                    wf.transition(WorkflowStatus::Abort, "cancel")?;
                                    tx.save_workflow(&wf)?;
                                    Ok(wf)
                                })?;
        info!("cancel workflow={id} by={}", user.username);
        Ok(wf)
    }
}
