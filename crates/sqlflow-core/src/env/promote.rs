//! Promoción de un workflow al siguiente entorno tras una ejecución limpia.
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use super::{Env, EnvironmentLink};
use crate::model::{Workflow, WorkflowStatus};

static ENV_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\[(dev|sit|uat|pro)\]").expect("valid env tag regex"));

/// Reescribe la etiqueta inicial del nombre: reemplaza `[dev]`/`[sit]`/`[uat]`/
/// `[pro]` por la de `next`, o la antepone si no hay etiqueta.
pub fn retag_name(name: &str, next: Env) -> String {
    match ENV_TAG.find(name) {
        Some(m) => format!("{}{}", next.tag(), &name[m.end()..]),
        None => format!("{}{}", next.tag(), name),
    }
}

/// Re-apunta `workflow` al siguiente slot configurado de `link`.
///
/// Sólo promueve workflows en `Finish`; si no hay slot siguiente o no está
/// configurado el workflow queda intacto. Devuelve el entorno destino.
pub fn promote(workflow: &mut Workflow, current: Env, link: &EnvironmentLink) -> Option<Env> {
    if workflow.status != WorkflowStatus::Finish {
        return None;
    }
    let (next, slot) = link.next_configured(current)?;
    let (instance, database) = (slot.instance.clone()?, slot.database.clone()?);
    workflow.transition(WorkflowStatus::ReviewPass, "promote").ok()?;
    debug!("promote workflow={} {}:{}/{} -> {}:{}/{}",
           workflow.id,
           current,
           workflow.instance,
           workflow.db_name,
           next,
           instance,
           database);
    workflow.instance = instance;
    workflow.db_name = database;
    workflow.workflow_name = retag_name(&workflow.workflow_name, next);
    Some(next)
}
