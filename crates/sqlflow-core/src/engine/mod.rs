//! Orquestador: despacho, reconciliación de callbacks y promoción.
//!
//! `Orchestrator` agrupa el repositorio y los colaboradores externos. Las
//! operaciones están repartidas en submódulos:
//! - `dispatcher`: queuing/timingtask -> executing bajo bloqueo y entrega al
//!   motor; re-encolado y ejecución a petición de un usuario.
//! - `lifecycle`: programación y cancelación a petición de un usuario.
//! - `reconciler`: procesa el resultado asíncrono del motor.
//! - `classifier`: decide finish/exception a partir del resultado.

pub mod builder;
pub mod classifier;
pub mod dispatcher;
pub mod lifecycle;
pub mod reconciler;

use std::sync::Arc;

use crate::collab::{AuditLog, Cache, ExecutionEngine, Notifier};
use crate::config::NotifyConfig;
use crate::repo::WorkflowRepository;

pub use builder::OrchestratorBuilder;
pub use classifier::classify;
pub use reconciler::Reconciliation;

pub struct Orchestrator<R: WorkflowRepository> {
    repository: R,
    engine: Arc<dyn ExecutionEngine>,
    audit: Arc<dyn AuditLog>,
    cache: Option<Arc<dyn Cache>>,
    notifier: Arc<dyn Notifier>,
    notify: NotifyConfig,
}

impl<R: WorkflowRepository> Orchestrator<R> {
    /// Builder con los colaboradores obligatorios.
    pub fn builder(repository: R,
                   engine: Arc<dyn ExecutionEngine>,
                   audit: Arc<dyn AuditLog>)
                   -> OrchestratorBuilder<R> {
        OrchestratorBuilder::new(repository, engine, audit)
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn notify_config(&self) -> &NotifyConfig {
        &self.notify
    }
}
