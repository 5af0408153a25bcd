//! Contratos de persistencia del orquestador.
//!
//! El alcance transaccional es explícito: `WorkflowRepository::transaction`
//! entrega un `WorkflowTx` y confirma sólo si el closure devuelve `Ok`. Dentro
//! de la transacción, `lock` toma la fila del workflow en exclusiva hasta el
//! commit o rollback.

pub mod memory;

use chrono::{DateTime, Utc};

use crate::env::{Env, EnvironmentLink};
use crate::errors::FlowError;
use crate::model::{Workflow, WorkflowContent, WorkflowId};

pub use memory::{Fault, InMemoryWorkflowRepository};

/// Operaciones disponibles dentro de una transacción.
pub trait WorkflowTx {
    /// Carga el workflow (con su contenido) bloqueando la fila.
    fn lock(&mut self, id: WorkflowId) -> Result<Workflow, FlowError>;
    /// Guarda la fila del workflow (sin el contenido).
    fn save_workflow(&mut self, workflow: &Workflow) -> Result<(), FlowError>;
    fn save_content(&mut self, id: WorkflowId, content: &WorkflowContent) -> Result<(), FlowError>;
}

pub trait WorkflowRepository: Send + Sync {
    /// Ejecuta `f` en una transacción; cualquier `Err` revierte todo lo escrito.
    fn transaction<T, F>(&self, f: F) -> Result<T, FlowError>
        where F: FnOnce(&mut dyn WorkflowTx) -> Result<T, FlowError>;

    /// Lectura sin bloqueo.
    fn load(&self, id: WorkflowId) -> Result<Workflow, FlowError>;

    /// Escritura de emergencia: fija `Exception`, `finish_time` y el detalle
    /// como resultado con un update incondicional, sin pasar por
    /// `save_workflow`. Sus errores no tienen otro respaldo.
    fn force_exception(&self, id: WorkflowId, finish_time: DateTime<Utc>, detail: &str) -> Result<(), FlowError>;

    /// Primer enlace de entornos que contiene el par y el entorno que ocupa.
    /// Se llama también dentro de `transaction`: no debe tomar la fila del
    /// workflow.
    fn find_env_link(&self, instance: &str, db_name: &str) -> Result<Option<(Env, EnvironmentLink)>, FlowError>;
}
