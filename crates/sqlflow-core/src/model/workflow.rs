//! Workflow de SQL y su contenido.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::WorkflowStatus;
use crate::errors::FlowError;

pub type WorkflowId = i64;

/// Tipo de sintaxis del SQL (valores persistidos 0/1/2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SyntaxType {
    #[default]
    Unknown,
    Ddl,
    Dml,
}

impl SyntaxType {
    pub fn code(self) -> i16 {
        match self {
            Self::Unknown => 0,
            Self::Ddl => 1,
            Self::Dml => 2,
        }
    }

    /// Códigos desconocidos se leen como `Unknown`.
    pub fn from_code(code: i16) -> Self {
        match code {
            1 => Self::Ddl,
            2 => Self::Dml,
            _ => Self::Unknown,
        }
    }
}

/// Contenido SQL del workflow y resultado serializado de la última ejecución.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct WorkflowContent {
    pub sql_content: String,
    pub execute_result: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub id: WorkflowId,
    pub workflow_name: String,
    pub group_id: i64,
    /// Usuario que envió el workflow.
    pub engineer: String,
    pub status: WorkflowStatus,
    /// Instancia destino actual (cambia con cada promoción).
    pub instance: String,
    pub db_name: String,
    pub syntax_type: SyntaxType,
    pub run_date_start: Option<DateTime<Utc>>,
    pub run_date_end: Option<DateTime<Utc>>,
    pub finish_time: Option<DateTime<Utc>>,
    pub content: WorkflowContent,
}

impl Workflow {
    pub fn new(id: WorkflowId,
               workflow_name: impl Into<String>,
               instance: impl Into<String>,
               db_name: impl Into<String>,
               sql_content: impl Into<String>)
               -> Self {
        Self { id,
               workflow_name: workflow_name.into(),
               group_id: 0,
               engineer: String::new(),
               status: WorkflowStatus::Queuing,
               instance: instance.into(),
               db_name: db_name.into(),
               syntax_type: SyntaxType::Dml,
               run_date_start: None,
               run_date_end: None,
               finish_time: None,
               content: WorkflowContent { sql_content: sql_content.into(),
                                          execute_result: None } }
    }

    pub fn with_status(mut self, status: WorkflowStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_syntax(mut self, syntax_type: SyntaxType) -> Self {
        self.syntax_type = syntax_type;
        self
    }

    pub fn with_owner(mut self, engineer: impl Into<String>, group_id: i64) -> Self {
        self.engineer = engineer.into();
        self.group_id = group_id;
        self
    }

    pub fn with_window(mut self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        self.run_date_start = start;
        self.run_date_end = end;
        self
    }

    /// Aplica una transición validada contra la tabla de `WorkflowStatus`.
    pub fn transition(&mut self, next: WorkflowStatus, operation: &'static str) -> Result<(), FlowError> {
        if !self.status.can_transition_to(next) {
            return Err(FlowError::InvalidState { id: self.id,
                                                 status: self.status,
                                                 operation });
        }
        self.status = next;
        Ok(())
    }
}
