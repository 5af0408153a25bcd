//! Constantes compartidas con el resto de la plataforma.
//!
//! Los códigos y textos de auditoría deben coincidir con los que escribe la
//! interfaz web; cambiarlos rompe el historial mostrado a los usuarios.

/// Tipo de workflow "sqlreview" en la tabla de auditoría.
pub const WORKFLOW_TYPE_SQLREVIEW: i32 = 2;

/// Operación de auditoría: inicio de ejecución.
pub const AUDIT_OP_EXECUTE: i32 = 5;
pub const AUDIT_OP_EXECUTE_DESC: &str = "执行工单";
pub const AUDIT_INFO_MANUAL_EXECUTE: &str = "工单开始执行";
pub const AUDIT_INFO_TIMED_EXECUTE: &str = "系统定时执行工单";

/// Operación de auditoría: fin de ejecución.
pub const AUDIT_OP_EXECUTE_END: i32 = 6;

pub const SYSTEM_OPERATOR_DISPLAY: &str = "系统";

/// Claves de caché con metadatos de instancia que un DDL puede invalidar.
pub const INSTANCE_RESOURCE_PATTERN: &str = "*insRes*";

/// Fase de notificación consultada al terminar una ejecución.
pub const NOTIFY_PHASE_EXECUTE: &str = "Execute";

/// Fila sintética cuando la tarea del motor falla sin resultado.
pub const EXECUTE_FAILED_STAGE: &str = "Execute failed";
pub const EXECUTE_FAILED_STATUS: &str = "异常终止";

/// Permisos consultados por `policy::can_execute`.
pub const PERM_EXECUTE: &str = "sql.sql_execute";
pub const PERM_EXECUTE_FOR_GROUP: &str = "sql.sql_execute_for_resource_group";

/// Grupos que pueden ejecutar en cualquier entorno.
pub const PRIVILEGED_GROUPS: [&str; 3] = ["admin", "dba", "leader"];
