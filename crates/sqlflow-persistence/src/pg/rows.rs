//! Filas Diesel y su mapeo con los tipos del core.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;
use sqlflow_core::{EnvSlot, EnvironmentLink, SyntaxType, Workflow, WorkflowContent, WorkflowStatus};
use uuid::Uuid;

use crate::error::PersistenceError;
use crate::schema::{db_env_relation, execution_task, sql_workflow, sql_workflow_content, workflow_log};

#[derive(Queryable, Debug)]
pub struct WorkflowRow {
    pub id: i64,
    pub workflow_name: String,
    pub group_id: i64,
    pub engineer: String,
    pub status: String,
    pub instance_name: String,
    pub db_name: String,
    pub syntax_type: i16,
    pub run_date_start: Option<DateTime<Utc>>,
    pub run_date_end: Option<DateTime<Utc>>,
    pub finish_time: Option<DateTime<Utc>>,
}

impl WorkflowRow {
    /// Une la fila con su contenido. Un workflow sin fila de contenido queda
    /// con SQL vacío.
    pub fn into_workflow(self, content: Option<ContentRow>) -> Result<Workflow, PersistenceError> {
        let status: WorkflowStatus =
            self.status
                .parse()
                .map_err(|e| PersistenceError::InvalidRow(format!("sql_workflow {}: {e}", self.id)))?;
        let content = content.map(|c| WorkflowContent { sql_content: c.sql_content,
                                                        execute_result: c.execute_result })
                             .unwrap_or_default();
        Ok(Workflow { id: self.id,
                      workflow_name: self.workflow_name,
                      group_id: self.group_id,
                      engineer: self.engineer,
                      status,
                      instance: self.instance_name,
                      db_name: self.db_name,
                      syntax_type: SyntaxType::from_code(self.syntax_type),
                      run_date_start: self.run_date_start,
                      run_date_end: self.run_date_end,
                      finish_time: self.finish_time,
                      content })
    }
}

/// Alta y actualización comparten forma; el changeset ignora `id`.
#[derive(Insertable, AsChangeset, Debug)]
#[diesel(table_name = sql_workflow, treat_none_as_null = true)]
pub struct WorkflowChanges<'a> {
    pub id: i64,
    pub workflow_name: &'a str,
    pub group_id: i64,
    pub engineer: &'a str,
    pub status: &'a str,
    pub instance_name: &'a str,
    pub db_name: &'a str,
    pub syntax_type: i16,
    pub run_date_start: Option<DateTime<Utc>>,
    pub run_date_end: Option<DateTime<Utc>>,
    pub finish_time: Option<DateTime<Utc>>,
}

impl<'a> From<&'a Workflow> for WorkflowChanges<'a> {
    fn from(wf: &'a Workflow) -> Self {
        Self { id: wf.id,
               workflow_name: &wf.workflow_name,
               group_id: wf.group_id,
               engineer: &wf.engineer,
               status: wf.status.as_str(),
               instance_name: &wf.instance,
               db_name: &wf.db_name,
               syntax_type: wf.syntax_type.code(),
               run_date_start: wf.run_date_start,
               run_date_end: wf.run_date_end,
               finish_time: wf.finish_time }
    }
}

#[derive(Queryable, Insertable, AsChangeset, Debug)]
#[diesel(table_name = sql_workflow_content, primary_key(workflow_id), treat_none_as_null = true)]
pub struct ContentRow {
    pub workflow_id: i64,
    pub sql_content: String,
    pub execute_result: Option<String>,
}

#[derive(Queryable, Debug)]
pub struct EnvLinkRow {
    pub id: i64,
    pub dev_instance: Option<String>,
    pub dev_database: Option<String>,
    pub sit_instance: Option<String>,
    pub sit_database: Option<String>,
    pub uat_instance: Option<String>,
    pub uat_database: Option<String>,
    pub pro_instance: Option<String>,
    pub pro_database: Option<String>,
}

impl From<EnvLinkRow> for EnvironmentLink {
    fn from(r: EnvLinkRow) -> Self {
        let slot = |instance, database| EnvSlot { instance, database };
        EnvironmentLink { id: r.id,
                          dev: slot(r.dev_instance, r.dev_database),
                          sit: slot(r.sit_instance, r.sit_database),
                          uat: slot(r.uat_instance, r.uat_database),
                          pro: slot(r.pro_instance, r.pro_database) }
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = db_env_relation)]
pub struct NewEnvLinkRow<'a> {
    pub dev_instance: Option<&'a str>,
    pub dev_database: Option<&'a str>,
    pub sit_instance: Option<&'a str>,
    pub sit_database: Option<&'a str>,
    pub uat_instance: Option<&'a str>,
    pub uat_database: Option<&'a str>,
    pub pro_instance: Option<&'a str>,
    pub pro_database: Option<&'a str>,
}

impl<'a> From<&'a EnvironmentLink> for NewEnvLinkRow<'a> {
    fn from(l: &'a EnvironmentLink) -> Self {
        Self { dev_instance: l.dev.instance.as_deref(),
               dev_database: l.dev.database.as_deref(),
               sit_instance: l.sit.instance.as_deref(),
               sit_database: l.sit.database.as_deref(),
               uat_instance: l.uat.instance.as_deref(),
               uat_database: l.uat.database.as_deref(),
               pro_instance: l.pro.instance.as_deref(),
               pro_database: l.pro.database.as_deref() }
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = workflow_log)]
pub struct NewLogRow<'a> {
    pub audit_id: i64,
    pub operation_type: i32,
    pub operation_type_desc: &'a str,
    pub operation_info: &'a str,
    pub operator: &'a str,
    pub operator_display: &'a str,
    pub operation_time: DateTime<Utc>,
}

#[derive(Queryable, Debug)]
pub struct LogRow {
    pub id: i64,
    pub audit_id: i64,
    pub operation_type: i32,
    pub operation_type_desc: String,
    pub operation_info: String,
    pub operator: String,
    pub operator_display: String,
    pub operation_time: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = execution_task)]
pub struct NewTaskRow<'a> {
    pub task_id: Uuid,
    pub workflow_id: i64,
    pub instance_name: &'a str,
    pub db_name: &'a str,
    pub state: &'a str,
    pub payload: &'a Value,
}

#[derive(Queryable, Debug)]
pub struct TaskRow {
    pub task_id: Uuid,
    pub workflow_id: i64,
    pub instance_name: String,
    pub db_name: String,
    pub state: String,
    pub payload: Value,
    pub result: Option<Value>,
    pub enqueued_at: DateTime<Utc>,
    pub stopped_at: Option<DateTime<Utc>>,
}
