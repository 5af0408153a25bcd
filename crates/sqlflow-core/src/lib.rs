//! sqlflow-core: orquestación de la ejecución de workflows de SQL.
//!
//! Despacha workflows aprobados al motor de ejecución garantizando una sola
//! ejecución en vuelo, reconcilia el resultado asíncrono y, tras una ejecución
//! limpia, promueve el workflow al siguiente entorno (dev -> sit -> uat -> pro).
//!
//! No hace I/O: la persistencia y los colaboradores externos se inyectan a
//! través de los traits de `repo` y `collab`.
pub mod collab;
pub mod config;
pub mod constants;
pub mod engine;
pub mod env;
pub mod errors;
pub mod model;
pub mod policy;
pub mod repo;

pub use collab::{AuditLog, Cache, EngineRouter, ExecutionEngine, LogNotifier, Notifier, TaskHandle};
pub use config::NotifyConfig;
pub use engine::{classify, Orchestrator, OrchestratorBuilder, Reconciliation};
pub use env::{Env, EnvSlot, EnvironmentLink};
pub use errors::FlowError;
pub use model::{AuditLogEntry, ErrLevel, ExecutionResult, Operator, ReviewResult, SyntaxType, TaskOutcome, TaskResult,
                User, Workflow, WorkflowContent, WorkflowId, WorkflowStatus};
pub use repo::{InMemoryWorkflowRepository, WorkflowRepository, WorkflowTx};
