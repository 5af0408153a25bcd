//! CLI `sqlflow`: operaciones del orquestador contra Postgres.
//!
//! Códigos de salida: 0 ok, 4 rechazado (estado/permisos/no encontrado),
//! 5 error de infraestructura.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::Utc;
use clap::{Parser, Subcommand};
use log::{error, info};
use sqlflow_core::{ExecutionResult, FlowError, Operator, Orchestrator, TaskResult, WorkflowRepository};
use sqlflow_persistence::{build_pool_from_env, notify_config_from_env, PgAuditLog, PgTaskQueue, PgWorkflowRepository,
                          PoolProvider};

#[derive(Debug, Parser)]
#[command(name = "sqlflow", about = "Despacho y reconciliación de workflows de SQL")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Pasa un workflow en cola a ejecución y crea su tarea.
    Dispatch {
        workflow_id: i64,
        /// Usuario que lanza la ejecución; sin él es una ejecución del sistema.
        #[arg(long)]
        operator: Option<String>,
        #[arg(long, requires = "operator")]
        display: Option<String>,
    },
    /// Vuelve a encolar un workflow aprobado o programado.
    Enqueue { workflow_id: i64 },
    /// Reclama la siguiente tarea pendiente e imprime su JSON.
    Claim,
    /// Cierra una tarea con su resultado y reconcilia el workflow. Repetirlo
    /// sobre una tarea cerrada reutiliza el resultado guardado.
    Reconcile {
        task_id: String,
        /// Fichero con el `ExecutionResult` en JSON.
        #[arg(long, conflicts_with = "failed", required_unless_present = "failed")]
        result_file: Option<PathBuf>,
        /// La tarea falló con este mensaje.
        #[arg(long)]
        failed: Option<String>,
    },
    /// Entorno de un par instancia/base de datos.
    Resolve {
        #[arg(long)]
        instance: String,
        #[arg(long)]
        db: String,
    },
}

type PgOrchestrator = Orchestrator<PgWorkflowRepository<PoolProvider>>;

struct Backend {
    orchestrator: PgOrchestrator,
    queue: Arc<PgTaskQueue<PoolProvider>>,
}

fn connect() -> Result<Backend, FlowError> {
    let pool = build_pool_from_env()?;
    let provider = PoolProvider { pool };
    let queue = Arc::new(PgTaskQueue::new(provider.clone()));
    let orchestrator = Orchestrator::builder(PgWorkflowRepository::new(provider.clone()),
                                             queue.clone(),
                                             Arc::new(PgAuditLog::new(provider))).notify_config(notify_config_from_env())
                                                                                 .build();
    Ok(Backend { orchestrator, queue })
}

fn task_result(result_file: Option<PathBuf>, failed: Option<String>) -> Result<TaskResult, FlowError> {
    match (result_file, failed) {
        (_, Some(msg)) => Ok(TaskResult::Failed(msg)),
        (Some(path), None) => {
            let raw = std::fs::read_to_string(&path).map_err(|e| {
                                                        FlowError::Serialization(format!("{}: {e}", path.display()))
                                                    })?;
            let result: ExecutionResult = serde_json::from_str(&raw)?;
            Ok(TaskResult::Completed(result))
        }
        (None, None) => Err(FlowError::Serialization("missing task result".into())),
    }
}

fn run(cli: Cli) -> Result<(), FlowError> {
    let backend = connect()?;
    let orch = &backend.orchestrator;
    match cli.command {
        Command::Dispatch { workflow_id,
                            operator,
                            display, } => {
            let operator = operator.map(|u| {
                                       let display = display.unwrap_or_else(|| u.clone());
                                       Operator::new(u, display)
                                   });
            let handle = orch.dispatch(workflow_id, operator.as_ref())?;
            println!("{}", handle.task_id);
        }
        Command::Enqueue { workflow_id } => {
            let wf = orch.enqueue(workflow_id)?;
            println!("{} {} {}/{}", wf.id, wf.status, wf.instance, wf.db_name);
        }
        Command::Claim => match backend.queue.claim_next()? {
            Some(task) => println!("{}", serde_json::json!({ "task_id": task.task_id, "workflow": task.workflow })),
            None => info!("no pending tasks"),
        },
        Command::Reconcile { task_id,
                             result_file,
                             failed, } => {
            let result = task_result(result_file, failed)?;
            let outcome = backend.queue.complete(&task_id, result, Utc::now())?;
            let rec = orch.reconcile(outcome)?;
            println!("{} {} env={} next={}{}",
                     rec.workflow.id,
                     rec.workflow.status,
                     rec.environment.map(|e| e.label()).unwrap_or("-"),
                     rec.promoted_to.map(|e| e.label()).unwrap_or("-"),
                     if rec.fallback_used { " (fallback)" } else { "" });
        }
        Command::Resolve { instance, db } => match orch.repository().find_env_link(&instance, &db)? {
            Some((env, link)) => println!("{env} link={}", link.id),
            None => return Err(FlowError::LinkLookupMiss { instance, db_name: db }),
        },
    }
    Ok(())
}

fn exit_code(err: &FlowError) -> u8 {
    match err {
        FlowError::InvalidState { .. }
        | FlowError::DuplicateCallback { .. }
        | FlowError::NotFound(_)
        | FlowError::LinkLookupMiss { .. }
        | FlowError::PermissionDenied(_)
        | FlowError::OutsideExecutionWindow(_) => 4,
        _ => 5,
    }
}

fn init_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    let _ = tracing_subscriber::fmt().with_env_filter(filter)
                                     .with_writer(std::io::stderr)
                                     .try_init();
}

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    init_tracing();
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("[sqlflow] {e}");
            ExitCode::from(exit_code(&e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlflow_core::WorkflowStatus;

    #[test]
    fn dispatch_accepts_optional_operator() {
        let cli = Cli::try_parse_from(["sqlflow", "dispatch", "42", "--operator", "alice"]).unwrap();
        match cli.command {
            Command::Dispatch { workflow_id,
                                operator,
                                display, } => {
                assert_eq!(workflow_id, 42);
                assert_eq!(operator.as_deref(), Some("alice"));
                assert_eq!(display, None);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(Cli::try_parse_from(["sqlflow", "dispatch", "42", "--display", "Alice"]).is_err());
    }

    #[test]
    fn reconcile_needs_exactly_one_result_source() {
        assert!(Cli::try_parse_from(["sqlflow", "reconcile", "t-1"]).is_err());
        assert!(Cli::try_parse_from(["sqlflow", "reconcile", "t-1", "--failed", "x", "--result-file", "r.json"]).is_err());
        let cli = Cli::try_parse_from(["sqlflow", "reconcile", "t-1", "--failed", "timeout"]).unwrap();
        let Command::Reconcile { result_file, failed, .. } = cli.command else {
            panic!("expected reconcile");
        };
        assert_eq!(task_result(result_file, failed).unwrap(), TaskResult::Failed("timeout".into()));
    }

    #[test]
    fn protocol_errors_map_to_rejection_code() {
        let dup = FlowError::DuplicateCallback { id: 1,
                                                 status: WorkflowStatus::Finish };
        assert_eq!(exit_code(&dup), 4);
        assert_eq!(exit_code(&FlowError::NotFound(1)), 4);
        assert_eq!(exit_code(&FlowError::Persistence("down".into())), 5);
        assert_eq!(exit_code(&FlowError::EngineUnavailable("I1".into())), 5);
    }
}
