//! Modelos del dominio (Workflow, resultados de ejecución, auditoría).

pub mod audit;
pub mod result;
pub mod status;
pub mod workflow;

pub use audit::{AuditLogEntry, Operator, User};
pub use result::{ErrLevel, ExecutionResult, ReviewResult, TaskOutcome, TaskResult};
pub use status::{UnknownStatus, WorkflowStatus};
pub use workflow::{SyntaxType, Workflow, WorkflowContent, WorkflowId};
