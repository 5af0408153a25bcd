//! Auditoría sobre Postgres: una cabecera `workflow_audit` por
//! (workflow, tipo) y sus entradas en `workflow_log`.

use diesel::prelude::*;
use log::debug;
use sqlflow_core::{AuditLog, AuditLogEntry, FlowError, WorkflowId};

use super::rows::{LogRow, NewLogRow};
use super::{with_retry, ConnectionProvider};
use crate::error::PersistenceError;
use crate::schema::{workflow_audit, workflow_log};

pub struct PgAuditLog<P: ConnectionProvider> {
    provider: P,
}

impl<P: ConnectionProvider> PgAuditLog<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Entradas de una cabecera en orden de inserción.
    pub fn entries_for(&self, audit_id: i64) -> Result<Vec<AuditLogEntry>, FlowError> {
        let rows: Vec<LogRow> = with_retry(|| {
                                    let mut conn = self.provider.connection()?;
                                    workflow_log::table.filter(workflow_log::audit_id.eq(audit_id))
                                                       .order(workflow_log::id.asc())
                                                       .load(&mut conn)
                                                       .map_err(PersistenceError::from)
                                })?;
        Ok(rows.into_iter()
               .map(|r| AuditLogEntry { audit_id: r.audit_id,
                                        operation_type: r.operation_type,
                                        operation_type_desc: r.operation_type_desc,
                                        operation_info: r.operation_info,
                                        operator: r.operator,
                                        operator_display: r.operator_display,
                                        operation_time: r.operation_time })
               .collect())
    }
}

impl<P: ConnectionProvider> AuditLog for PgAuditLog<P> {
    /// Crea la cabecera si no existe (idempotente por la restricción única).
    fn detail_by_workflow_id(&self, workflow_id: WorkflowId, workflow_type: i32) -> Result<i64, FlowError> {
        let audit_id = with_retry(|| {
                           let mut conn = self.provider.connection()?;
                           diesel::insert_into(workflow_audit::table)
                               .values((workflow_audit::workflow_id.eq(workflow_id),
                                        workflow_audit::workflow_type.eq(workflow_type)))
                               .on_conflict((workflow_audit::workflow_id, workflow_audit::workflow_type))
                               .do_nothing()
                               .execute(&mut conn)?;
                           workflow_audit::table.filter(workflow_audit::workflow_id.eq(workflow_id))
                                                .filter(workflow_audit::workflow_type.eq(workflow_type))
                                                .select(workflow_audit::audit_id)
                                                .first::<i64>(&mut conn)
                                                .map_err(PersistenceError::from)
                       })?;
        Ok(audit_id)
    }

    fn add_log(&self, entry: AuditLogEntry) -> Result<(), FlowError> {
        let mut conn = with_retry(|| self.provider.connection())?;
        diesel::insert_into(workflow_log::table).values(&NewLogRow { audit_id: entry.audit_id,
                                                                     operation_type: entry.operation_type,
                                                                     operation_type_desc: &entry.operation_type_desc,
                                                                     operation_info: &entry.operation_info,
                                                                     operator: &entry.operator,
                                                                     operator_display: &entry.operator_display,
                                                                     operation_time: entry.operation_time })
                                                .execute(&mut conn)
                                                .map_err(PersistenceError::from)?;
        debug!("audit_log audit_id={} type={} info={}",
               entry.audit_id,
               entry.operation_type,
               entry.operation_info);
        Ok(())
    }
}
