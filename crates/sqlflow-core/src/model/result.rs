//! Resultado de ejecución reportado por el motor externo.
//!
//! El JSON de `ExecutionResult` es lo que se persiste en
//! `WorkflowContent::execute_result`.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::WorkflowId;

/// Severidad de una fila de resultado (0 ok, 1 warning, 2 error).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(into = "u8", try_from = "u8")]
pub enum ErrLevel {
    #[default]
    Ok,
    Warning,
    Error,
}

impl From<ErrLevel> for u8 {
    fn from(level: ErrLevel) -> Self {
        match level {
            ErrLevel::Ok => 0,
            ErrLevel::Warning => 1,
            ErrLevel::Error => 2,
        }
    }
}

impl TryFrom<u8> for ErrLevel {
    type Error = String;

    fn try_from(v: u8) -> Result<Self, String> {
        match v {
            0 => Ok(ErrLevel::Ok),
            1 => Ok(ErrLevel::Warning),
            2 => Ok(ErrLevel::Error),
            other => Err(format!("invalid errlevel {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ReviewResult {
    pub id: u32,
    pub stage: String,
    pub errlevel: ErrLevel,
    pub stagestatus: String,
    pub errormessage: String,
    pub sql: String,
    #[serde(default)]
    pub affected_rows: u64,
    #[serde(default)]
    pub execute_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ExecutionResult {
    pub full_sql: String,
    /// Presente si alguna sentencia produjo un warning.
    pub warning: Option<String>,
    /// Presente si alguna sentencia falló.
    pub error: Option<String>,
    #[serde(default)]
    pub warning_count: u32,
    #[serde(default)]
    pub error_count: u32,
    #[serde(default)]
    pub rows: Vec<ReviewResult>,
}

impl ExecutionResult {
    pub fn new(full_sql: impl Into<String>) -> Self {
        Self { full_sql: full_sql.into(),
               ..Self::default() }
    }

    /// Ejecución limpia: ni warning ni error.
    pub fn is_clean(&self) -> bool {
        self.warning.is_none() && self.error.is_none()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Resultado entregado por el motor cuando termina una tarea.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TaskResult {
    /// El motor produjo un resultado estructurado (con o sin errores de SQL).
    Completed(ExecutionResult),
    /// La tarea misma falló (caída, timeout...); sólo hay un detalle textual.
    Failed(String),
}

/// Callback asíncrono del motor para un workflow despachado.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskOutcome {
    pub workflow_id: WorkflowId,
    pub result: TaskResult,
    pub stopped_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errlevel_serializes_as_number() {
        let row = ReviewResult { errlevel: ErrLevel::Error,
                                 ..ReviewResult::default() };
        let v = serde_json::to_value(&row).unwrap();
        assert_eq!(v["errlevel"], serde_json::json!(2));
        assert!(serde_json::from_value::<ErrLevel>(serde_json::json!(5)).is_err());
    }

    #[test]
    fn errlevel_from_code() {
        assert_eq!(ErrLevel::try_from(1u8), Ok(ErrLevel::Warning));
        assert_eq!(ErrLevel::try_from(2u8), Ok(ErrLevel::Error));
        assert_eq!(ErrLevel::try_from(3u8), Err("invalid errlevel 3".to_string()));
        assert_eq!(u8::from(ErrLevel::Ok), 0);
    }

    #[test]
    fn clean_means_no_flags() {
        let mut r = ExecutionResult::new("select 1");
        assert!(r.is_clean());
        r.warning = Some("truncated".into());
        assert!(!r.is_clean());
    }

    #[test]
    fn engine_report_with_missing_optional_fields_is_accepted() {
        let r: ExecutionResult = serde_json::from_str(r#"{"full_sql":"x","warning":null,"error":"boom"}"#).unwrap();
        assert!(r.rows.is_empty());
        assert_eq!(r.error.as_deref(), Some("boom"));
    }
}
