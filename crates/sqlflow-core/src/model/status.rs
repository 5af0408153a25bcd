//! Estado de un workflow de SQL.
//!
//! Las transiciones válidas son:
//! - `ManReviewing` -> `ReviewPass` | `AutoReviewWrong` | `Abort`
//! - `ReviewPass` -> `Queuing` | `TimingTask` | `Abort`
//! - `TimingTask` -> `Queuing` | `Executing` | `Abort`
//! - `Queuing` -> `Executing`
//! - `Executing` -> `Finish` | `Exception`
//! - `Finish` -> `ReviewPass` (promoción al siguiente entorno)
//!
//! Los estados de revisión pertenecen al flujo de aprobación; aquí sólo
//! existen para poder leer filas escritas por el resto de la plataforma.
//! `Abort` se alcanza además cancelando antes de la ejecución.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkflowStatus {
    #[serde(rename = "workflow_manreviewing")]
    ManReviewing,
    #[serde(rename = "workflow_autoreviewwrong")]
    AutoReviewWrong,
    #[serde(rename = "workflow_review_pass")]
    ReviewPass,
    #[serde(rename = "workflow_timingtask")]
    TimingTask,
    #[serde(rename = "workflow_queuing")]
    Queuing,
    #[serde(rename = "workflow_executing")]
    Executing,
    #[serde(rename = "workflow_finish")]
    Finish,
    #[serde(rename = "workflow_exception")]
    Exception,
    #[serde(rename = "workflow_abort")]
    Abort,
}

impl WorkflowStatus {
    pub const ALL: [WorkflowStatus; 9] = [Self::ManReviewing,
                                          Self::AutoReviewWrong,
                                          Self::ReviewPass,
                                          Self::TimingTask,
                                          Self::Queuing,
                                          Self::Executing,
                                          Self::Finish,
                                          Self::Exception,
                                          Self::Abort];

    /// Valor persistido en la columna `status`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ManReviewing => "workflow_manreviewing",
            Self::AutoReviewWrong => "workflow_autoreviewwrong",
            Self::ReviewPass => "workflow_review_pass",
            Self::TimingTask => "workflow_timingtask",
            Self::Queuing => "workflow_queuing",
            Self::Executing => "workflow_executing",
            Self::Finish => "workflow_finish",
            Self::Exception => "workflow_exception",
            Self::Abort => "workflow_abort",
        }
    }

    /// Etiqueta mostrada en la auditoría.
    pub fn display(self) -> &'static str {
        match self {
            Self::ManReviewing => "等待审核人审核",
            Self::AutoReviewWrong => "自动审核不通过",
            Self::ReviewPass => "审核通过",
            Self::TimingTask => "定时执行",
            Self::Queuing => "排队中",
            Self::Executing => "执行中",
            Self::Finish => "已正常结束",
            Self::Exception => "执行有异常",
            Self::Abort => "人工终止流程",
        }
    }

    /// Tabla de transiciones.
    pub fn can_transition_to(self, next: WorkflowStatus) -> bool {
        use WorkflowStatus::*;
        match self {
            ManReviewing => matches!(next, ReviewPass | AutoReviewWrong | Abort),
            ReviewPass => matches!(next, Queuing | TimingTask | Abort),
            TimingTask => matches!(next, Queuing | Executing | Abort),
            Queuing => matches!(next, Executing),
            Executing => matches!(next, Finish | Exception),
            Finish => matches!(next, ReviewPass),
            AutoReviewWrong | Exception | Abort => false,
        }
    }

    /// Estados desde los que el despachador puede arrancar una ejecución.
    pub fn is_dispatchable(self) -> bool {
        matches!(self, Self::Queuing | Self::TimingTask)
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown workflow status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for WorkflowStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.iter()
                 .copied()
                 .find(|st| st.as_str() == s)
                 .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}
