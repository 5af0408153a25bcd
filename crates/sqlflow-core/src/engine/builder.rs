//! Builder para `Orchestrator`.
//!
//! Repositorio, motor y auditoría son obligatorios. Sin caché configurada la
//! invalidación tras un DDL se omite; sin notificador se usa `LogNotifier`.
//!
//! ```ignore
//! let orchestrator = Orchestrator::builder(repo, engine, audit)
//!     .cache(cache)
//!     .notify_config(NotifyConfig::from_setting(Some("Execute")))
//!     .build();
//! ```
use std::sync::Arc;

use super::Orchestrator;
use crate::collab::{AuditLog, Cache, ExecutionEngine, LogNotifier, Notifier};
use crate::config::NotifyConfig;
use crate::repo::WorkflowRepository;

pub struct OrchestratorBuilder<R: WorkflowRepository> {
    repository: R,
    engine: Arc<dyn ExecutionEngine>,
    audit: Arc<dyn AuditLog>,
    cache: Option<Arc<dyn Cache>>,
    notifier: Option<Arc<dyn Notifier>>,
    notify: NotifyConfig,
}

impl<R: WorkflowRepository> OrchestratorBuilder<R> {
    pub fn new(repository: R, engine: Arc<dyn ExecutionEngine>, audit: Arc<dyn AuditLog>) -> Self {
        Self { repository,
               engine,
               audit,
               cache: None,
               notifier: None,
               notify: NotifyConfig::all() }
    }

    #[inline]
    pub fn cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = Some(cache);
        self
    }

    #[inline]
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    #[inline]
    pub fn notify_config(mut self, notify: NotifyConfig) -> Self {
        self.notify = notify;
        self
    }

    pub fn build(self) -> Orchestrator<R> {
        Orchestrator { repository: self.repository,
                       engine: self.engine,
                       audit: self.audit,
                       cache: self.cache,
                       notifier: self.notifier.unwrap_or_else(|| Arc::new(LogNotifier)),
                       notify: self.notify }
    }
}
