//! Colaboradores externos del orquestador: motor de ejecución, auditoría,
//! caché y notificaciones. El core sólo depende de estos traits.

pub mod memory;

use std::collections::HashMap;
use std::sync::Arc;

use log::info;
use serde::{Deserialize, Serialize};

use crate::errors::FlowError;
use crate::model::{AuditLogEntry, Workflow, WorkflowId};

pub use memory::{InMemoryAuditLog, InMemoryCache, RecordingEngine, RecordingNotifier};

/// Identificador de la tarea asíncrona creada por el motor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskHandle {
    pub task_id: String,
}

/// Motor que ejecuta el SQL fuera de proceso. `execute_workflow` no espera a
/// la ejecución: su resultado llega más tarde como `TaskOutcome`.
pub trait ExecutionEngine: Send + Sync {
    fn execute_workflow(&self, workflow: &Workflow) -> Result<TaskHandle, FlowError>;
}

pub trait AuditLog: Send + Sync {
    /// Id de auditoría asociado al workflow.
    fn detail_by_workflow_id(&self, workflow_id: WorkflowId, workflow_type: i32) -> Result<i64, FlowError>;
    fn add_log(&self, entry: AuditLogEntry) -> Result<(), FlowError>;
}

pub trait Cache: Send + Sync {
    /// Borra las claves que casan con el patrón glob; devuelve cuántas.
    fn invalidate_by_pattern(&self, pattern: &str) -> Result<usize, FlowError>;
}

pub trait Notifier: Send + Sync {
    fn notify_for_execute(&self, workflow: &Workflow) -> Result<(), FlowError>;
}

/// Selecciona el motor por el nombre de instancia del workflow.
#[derive(Default, Clone)]
pub struct EngineRouter {
    engines: HashMap<String, Arc<dyn ExecutionEngine>>,
    fallback: Option<Arc<dyn ExecutionEngine>>,
}

impl EngineRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, instance: impl Into<String>, engine: Arc<dyn ExecutionEngine>) -> Self {
        self.engines.insert(instance.into(), engine);
        self
    }

    /// Motor para instancias sin ruta explícita.
    pub fn fallback(mut self, engine: Arc<dyn ExecutionEngine>) -> Self {
        self.fallback = Some(engine);
        self
    }

    pub fn engine_for(&self, instance: &str) -> Option<&Arc<dyn ExecutionEngine>> {
        self.engines.get(instance).or(self.fallback.as_ref())
    }
}

impl ExecutionEngine for EngineRouter {
    fn execute_workflow(&self, workflow: &Workflow) -> Result<TaskHandle, FlowError> {
        self.engine_for(&workflow.instance)
            .ok_or_else(|| FlowError::EngineUnavailable(workflow.instance.clone()))?
            .execute_workflow(workflow)
    }
}

/// Notificador que sólo deja constancia en el log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify_for_execute(&self, workflow: &Workflow) -> Result<(), FlowError> {
        info!("notify execute workflow={} name={} status={}",
              workflow.id,
              workflow.workflow_name,
              workflow.status);
        Ok(())
    }
}
