//! Reglas que deciden si un usuario puede lanzar la ejecución de un workflow.
use chrono::{DateTime, Utc};

use crate::constants::{PERM_EXECUTE, PERM_EXECUTE_FOR_GROUP, PRIVILEGED_GROUPS};
use crate::env::Env;
use crate::model::{User, Workflow, WorkflowStatus};

/// El workflow debe estar aprobado o programado, y el usuario debe tener
/// permiso de ejecución sobre su grupo de recursos o ser quien lo envió con
/// permiso de ejecución.
pub fn can_execute(user: &User, workflow: &Workflow) -> bool {
    if !matches!(workflow.status, WorkflowStatus::ReviewPass | WorkflowStatus::TimingTask) {
        return false;
    }
    let by_group = user.resource_groups.contains(&workflow.group_id) && user.has_perm(PERM_EXECUTE_FOR_GROUP);
    let by_owner = workflow.engineer == user.username && user.has_perm(PERM_EXECUTE);
    by_group || by_owner
}

/// Programar una ejecución exige lo mismo que ejecutar.
pub fn can_timingtask(user: &User, workflow: &Workflow) -> bool {
    can_execute(user, workflow)
}

/// Quien lo envió puede terminar el workflow mientras no haya empezado a
/// ejecutarse. Aprobado o programado, también quien puede ejecutarlo. La
/// cancelación por parte de revisores pertenece al flujo de aprobación.
pub fn can_cancel(user: &User, workflow: &Workflow) -> bool {
    match workflow.status {
        WorkflowStatus::ManReviewing => workflow.engineer == user.username,
        WorkflowStatus::ReviewPass | WorkflowStatus::TimingTask => {
            can_execute(user, workflow) || workflow.engineer == user.username
        }
        _ => false,
    }
}

/// uat y pro quedan reservados a superusuarios y a los grupos privilegiados.
/// `envs` son todos los slots que ocupa el destino del workflow: basta con que
/// uno sea uat o pro para restringir. Sin slots no hay restricción.
pub fn can_execute_at_env(user: &User, envs: &[Env]) -> bool {
    if user.is_superuser {
        return true;
    }
    let privileged = user.groups
                         .iter()
                         .any(|g| PRIVILEGED_GROUPS.contains(&g.to_lowercase().as_str()));
    privileged || !envs.iter().any(|e| matches!(e, Env::Uat | Env::Pro))
}

/// `now` dentro de la ventana `[run_date_start, run_date_end]` (extremos
/// opcionales).
pub fn on_correct_time_period(workflow: &Workflow, now: DateTime<Utc>) -> bool {
    let too_early = workflow.run_date_start.is_some_and(|start| start > now);
    let too_late = workflow.run_date_end.is_some_and(|end| end < now);
    !(too_early || too_late)
}
