//! Entradas de auditoría e identidad del operador.
use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::SYSTEM_OPERATOR_DISPLAY;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operator {
    pub username: String,
    pub display: String,
}

impl Operator {
    pub fn new(username: impl Into<String>, display: impl Into<String>) -> Self {
        Self { username: username.into(),
               display: display.into() }
    }

    /// Operador usado por las acciones desatendidas.
    pub fn system() -> Self {
        Self { username: String::new(),
               display: SYSTEM_OPERATOR_DISPLAY.to_string() }
    }
}

/// Usuario con sus permisos, usado por las comprobaciones de `policy`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct User {
    pub username: String,
    pub display: String,
    pub is_superuser: bool,
    /// Nombres de grupos (admin, dba, leader...).
    pub groups: Vec<String>,
    /// Grupos de recursos a los que pertenece.
    pub resource_groups: Vec<i64>,
    pub permissions: HashSet<String>,
}

impl User {
    pub fn has_perm(&self, perm: &str) -> bool {
        self.is_superuser || self.permissions.contains(perm)
    }

    pub fn operator(&self) -> Operator {
        Operator::new(self.username.clone(), self.display.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub audit_id: i64,
    pub operation_type: i32,
    pub operation_type_desc: String,
    pub operation_info: String,
    pub operator: String,
    pub operator_display: String,
    pub operation_time: DateTime<Utc>,
}

impl AuditLogEntry {
    pub fn new(audit_id: i64,
               operation_type: i32,
               operation_type_desc: impl Into<String>,
               operation_info: impl Into<String>,
               operator: &Operator)
               -> Self {
        Self { audit_id,
               operation_type,
               operation_type_desc: operation_type_desc.into(),
               operation_info: operation_info.into(),
               operator: operator.username.clone(),
               operator_display: operator.display.clone(),
               operation_time: Utc::now() }
    }
}
