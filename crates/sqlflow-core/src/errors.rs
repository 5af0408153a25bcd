//! Errores del orquestador.
//!
//! `InvalidState` y `DuplicateCallback` son fatales y se propagan al
//! invocador. El resto se recuperan localmente en la reconciliación (se
//! registran en el log) o se propagan desde la frontera de datos.

use thiserror::Error;

use crate::model::{WorkflowId, WorkflowStatus};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FlowError {
    /// Se intentó una transición no permitida (p. ej. despachar un workflow
    /// que no está en cola).
    #[error("workflow {id}: invalid state {status} for {operation}")]
    InvalidState {
        id: WorkflowId,
        status: WorkflowStatus,
        operation: &'static str,
    },
    /// Callback recibido para un workflow que ya no está en ejecución.
    #[error("workflow {id}: duplicate execution callback (status {status})")]
    DuplicateCallback { id: WorkflowId, status: WorkflowStatus },
    #[error("workflow {0} not found")]
    NotFound(WorkflowId),
    #[error("persistence: {0}")]
    Persistence(String),
    #[error("no environment link for {instance}/{db_name}")]
    LinkLookupMiss { instance: String, db_name: String },
    #[error("no execution engine for instance {0}")]
    EngineUnavailable(String),
    /// Fallo de un colaborador externo (auditoría, caché, notificación).
    #[error("{collaborator}: {message}")]
    Collaborator {
        collaborator: &'static str,
        message: String,
    },
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("workflow {0} is outside its execution window")]
    OutsideExecutionWindow(WorkflowId),
    #[error("serialization: {0}")]
    Serialization(String),
}

impl FlowError {
    pub fn collaborator(collaborator: &'static str, message: impl Into<String>) -> Self {
        Self::Collaborator { collaborator,
                             message: message.into() }
    }

    /// Errores que indican una violación de protocolo por parte del invocador.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, Self::InvalidState { .. } | Self::DuplicateCallback { .. })
    }
}

impl From<serde_json::Error> for FlowError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
