//! Clasificación del resultado de una ejecución.
//!
//! Función pura y total: toda entrada produce un único par
//! (estado, resultado) y nunca falla.
use crate::constants::{EXECUTE_FAILED_STAGE, EXECUTE_FAILED_STATUS};
use crate::model::{ErrLevel, ExecutionResult, ReviewResult, TaskResult, WorkflowStatus};

/// - Tarea fallida: resultado sintético de una fila con error y `Exception`.
/// - Resultado con warning o error: `Exception`, resultado tal cual.
/// - Resto: `Finish`, resultado tal cual.
pub fn classify(result: &TaskResult, raw_sql: &str) -> (WorkflowStatus, ExecutionResult) {
    match result {
        TaskResult::Failed(detail) => (WorkflowStatus::Exception, failed_result(detail, raw_sql)),
        TaskResult::Completed(res) if !res.is_clean() => (WorkflowStatus::Exception, res.clone()),
        TaskResult::Completed(res) => (WorkflowStatus::Finish, res.clone()),
    }
}

fn failed_result(detail: &str, raw_sql: &str) -> ExecutionResult {
    let row = ReviewResult { id: 1,
                             stage: EXECUTE_FAILED_STAGE.to_string(),
                             errlevel: ErrLevel::Error,
                             stagestatus: EXECUTE_FAILED_STATUS.to_string(),
                             errormessage: detail.to_string(),
                             sql: raw_sql.to_string(),
                             ..ReviewResult::default() };
    ExecutionResult { full_sql: raw_sql.to_string(),
                      error: Some(detail.to_string()),
                      error_count: 1,
                      rows: vec![row],
                      ..ExecutionResult::default() }
}
