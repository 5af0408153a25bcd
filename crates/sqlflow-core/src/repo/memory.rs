//! Repositorio en memoria con la misma semántica transaccional que el backend
//! Postgres: un mutex global hace de bloqueo de fila y las escrituras se
//! aplican sólo en el commit.
//!
//! Permite inyectar fallos (`Fault`) para ejercitar las rutas de respaldo del
//! reconciliador en tests.
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, RwLock};

use chrono::{DateTime, Utc};

use super::{WorkflowRepository, WorkflowTx};
use crate::env::{resolve_in, Env, EnvironmentLink};
use crate::errors::FlowError;
use crate::model::{Workflow, WorkflowContent, WorkflowId, WorkflowStatus};

/// Fallos inyectables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    /// `save_content` falla.
    ContentSave,
    /// `save_workflow` falla para workflows en `ReviewPass`.
    PromotedSave,
    /// `force_exception` falla.
    ForceUpdate,
    /// `find_env_link` falla.
    LinkLookup,
}

#[derive(Default)]
pub struct InMemoryWorkflowRepository {
    rows: Mutex<HashMap<WorkflowId, Workflow>>,
    links: RwLock<Vec<EnvironmentLink>>,
    faults: Mutex<HashSet<Fault>>,
}

impl InMemoryWorkflowRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_workflows(workflows: impl IntoIterator<Item = Workflow>) -> Self {
        let repo = Self::new();
        for wf in workflows {
            repo.insert(wf);
        }
        repo
    }

    pub fn insert(&self, workflow: Workflow) {
        if let Ok(mut rows) = self.rows.lock() {
            rows.insert(workflow.id, workflow);
        }
    }

    pub fn get(&self, id: WorkflowId) -> Option<Workflow> {
        self.rows.lock().ok()?.get(&id).cloned()
    }

    pub fn add_link(&self, link: EnvironmentLink) {
        if let Ok(mut links) = self.links.write() {
            links.push(link);
        }
    }

    pub fn fail(&self, fault: Fault) {
        if let Ok(mut f) = self.faults.lock() {
            f.insert(fault);
        }
    }

    fn faulty(&self, fault: Fault) -> bool {
        self.faults.lock().map(|f| f.contains(&fault)).unwrap_or(false)
    }

    fn rows(&self) -> Result<MutexGuard<'_, HashMap<WorkflowId, Workflow>>, FlowError> {
        self.rows
            .lock()
            .map_err(|_| FlowError::Persistence("in-memory store poisoned".into()))
    }
}

/// Transacción en curso: lecturas sobre lo confirmado más lo escrito en ella.
struct InMemoryTx<'a> {
    committed: &'a HashMap<WorkflowId, Workflow>,
    staged: HashMap<WorkflowId, Workflow>,
    repo: &'a InMemoryWorkflowRepository,
}

impl InMemoryTx<'_> {
    fn current(&self, id: WorkflowId) -> Result<Workflow, FlowError> {
        self.staged
            .get(&id)
            .or_else(|| self.committed.get(&id))
            .cloned()
            .ok_or(FlowError::NotFound(id))
    }
}

impl WorkflowTx for InMemoryTx<'_> {
    fn lock(&mut self, id: WorkflowId) -> Result<Workflow, FlowError> {
        self.current(id)
    }

    fn save_workflow(&mut self, workflow: &Workflow) -> Result<(), FlowError> {
        if workflow.status == WorkflowStatus::ReviewPass && self.repo.faulty(Fault::PromotedSave) {
            return Err(FlowError::Persistence(format!("injected failure saving workflow {}", workflow.id)));
        }
        let content = self.current(workflow.id)?.content;
        let mut row = workflow.clone();
        row.content = content;
        self.staged.insert(workflow.id, row);
        Ok(())
    }

    fn save_content(&mut self, id: WorkflowId, content: &WorkflowContent) -> Result<(), FlowError> {
        if self.repo.faulty(Fault::ContentSave) {
            return Err(FlowError::Persistence(format!("injected failure saving content {id}")));
        }
        let mut row = self.current(id)?;
        row.content = content.clone();
        self.staged.insert(id, row);
        Ok(())
    }
}

impl WorkflowRepository for InMemoryWorkflowRepository {
    fn transaction<T, F>(&self, f: F) -> Result<T, FlowError>
        where F: FnOnce(&mut dyn WorkflowTx) -> Result<T, FlowError>
    {
        let mut rows = self.rows()?;
        let mut tx = InMemoryTx { committed: &rows,
                                  staged: HashMap::new(),
                                  repo: self };
        let out = f(&mut tx)?;
        let staged = tx.staged;
        rows.extend(staged);
        Ok(out)
    }

    fn load(&self, id: WorkflowId) -> Result<Workflow, FlowError> {
        self.rows()?.get(&id).cloned().ok_or(FlowError::NotFound(id))
    }

    fn force_exception(&self, id: WorkflowId, finish_time: DateTime<Utc>, detail: &str) -> Result<(), FlowError> {
        if self.faulty(Fault::ForceUpdate) {
            return Err(FlowError::Persistence(format!("injected failure forcing exception on {id}")));
        }
        let mut rows = self.rows()?;
        let row = rows.get_mut(&id).ok_or(FlowError::NotFound(id))?;
        row.status = WorkflowStatus::Exception;
        row.finish_time = Some(finish_time);
        row.content.execute_result = Some(detail.to_string());
        Ok(())
    }

    fn find_env_link(&self, instance: &str, db_name: &str) -> Result<Option<(Env, EnvironmentLink)>, FlowError> {
        if self.faulty(Fault::LinkLookup) {
            return Err(FlowError::Persistence("injected failure reading environment links".into()));
        }
        let links = self.links
                        .read()
                        .map_err(|_| FlowError::Persistence("in-memory links poisoned".into()))?;
        Ok(resolve_in(&links, instance, db_name).map(|(env, link)| (env, link.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rollback_discards_staged_writes() {
        let repo = InMemoryWorkflowRepository::with_workflows([Workflow::new(1, "a", "i", "d", "select 1")]);
        let res: Result<(), FlowError> = repo.transaction(|tx| {
                                                 let mut wf = tx.lock(1)?;
                                                 wf.status = WorkflowStatus::Executing;
                                                 tx.save_workflow(&wf)?;
                                                 Err(FlowError::Persistence("abort".into()))
                                             });
        assert!(res.is_err());
        assert_eq!(repo.get(1).unwrap().status, WorkflowStatus::Queuing);
    }

    #[test]
    fn commit_keeps_content_and_row_separate() {
        let repo = InMemoryWorkflowRepository::with_workflows([Workflow::new(1, "a", "i", "d", "select 1")]);
        repo.transaction(|tx| {
                let mut wf = tx.lock(1)?;
                wf.content.execute_result = Some("ignored".into());
                tx.save_workflow(&wf)?;
                tx.save_content(1, &WorkflowContent { sql_content: "select 1".into(),
                                                      execute_result: Some("{}".into()) })
            })
            .unwrap();
        assert_eq!(repo.get(1).unwrap().content.execute_result.as_deref(), Some("{}"));
    }

    #[test]
    fn missing_workflow_is_not_found() {
        let repo = InMemoryWorkflowRepository::new();
        assert_eq!(repo.load(3), Err(FlowError::NotFound(3)));
        assert_eq!(repo.transaction(|tx| tx.lock(3).map(|_| ())), Err(FlowError::NotFound(3)));
    }
}
