//! Demo en memoria del ciclo de ejecución:
//! - workflow 42: ejecución limpia en dev, promoción a sit, re-encolado y
//!   ejecución en sit con promoción a uat.
//! - workflow 43: la ejecución devuelve error y termina en excepción.
//!
//! Contra Postgres usar el binario `sqlflow` (crate `sqlflow-cli`).
use std::sync::Arc;

use async_trait::async_trait;
use log::info;
use sqlflow_core::collab::{InMemoryAuditLog, InMemoryCache};
use sqlflow_core::{EnvSlot, EnvironmentLink, InMemoryWorkflowRepository, Orchestrator, SyntaxType, TaskResult,
                   Workflow, WorkflowStatus};
use sqlflow_rust::{CallbackRunner, ChannelEngine, CoreError, DryRunExecutor, SqlExecutor, CONFIG};

/// Simula un fallo de ejecución en las sentencias `drop`.
struct GuardedExecutor;

#[async_trait]
impl SqlExecutor for GuardedExecutor {
    async fn execute(&self, workflow: &Workflow) -> TaskResult {
        let mut result = DryRunExecutor.execute(workflow).await;
        if let TaskResult::Completed(res) = &mut result {
            if workflow.content.sql_content.to_lowercase().contains("drop ") {
                res.error = Some("drop statements are not allowed".into());
                res.error_count = 1;
            }
        }
        result
    }
}

fn init_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[tokio::main]
async fn main() -> Result<(), CoreError> {
    init_tracing();
    let repo = InMemoryWorkflowRepository::new();
    repo.add_link(EnvironmentLink { id: 1,
                                    dev: EnvSlot::new("mysql-dev", "orders"),
                                    sit: EnvSlot::new("mysql-sit", "orders"),
                                    uat: EnvSlot::new("mysql-uat", "orders"),
                                    pro: EnvSlot::empty() });
    repo.insert(Workflow::new(42, "[dev]Add index", "mysql-dev", "orders", "alter table t add index idx_a(a);")
        .with_syntax(SyntaxType::Ddl));
    repo.insert(Workflow::new(43, "[dev]Cleanup", "mysql-dev", "orders", "drop table t_tmp;")
        .with_syntax(SyntaxType::Ddl));

    let (engine, rx) = ChannelEngine::channel();
    let cache = Arc::new(InMemoryCache::new());
    cache.put("sqlflow:insRes:mysql-dev", "[\"orders\"]");
    let orchestrator = Arc::new(Orchestrator::builder(repo, Arc::new(engine), Arc::new(InMemoryAuditLog::new()))
        .cache(cache.clone())
        .notify_config(CONFIG.notify.clone())
        .build());
    let mut runner = CallbackRunner::new(rx, Arc::new(GuardedExecutor), orchestrator.clone());

    orchestrator.dispatch(42, None)?;
    orchestrator.dispatch(43, None)?;
    for (handle, rec) in runner.drain().await {
        let rec = rec?;
        info!("task={} workflow={} -> {} ({})",
              handle.task_id,
              rec.workflow.id,
              rec.workflow.status,
              rec.workflow.status.display());
    }

    if orchestrator.repository().get(42).map(|w| w.status) == Some(WorkflowStatus::ReviewPass) {
        orchestrator.enqueue(42)?;
        orchestrator.dispatch(42, None)?;
        for (_, rec) in runner.drain().await {
            let rec = rec?;
            info!("workflow={} now targets {}/{} as {:?}",
                  rec.workflow.id,
                  rec.workflow.instance,
                  rec.workflow.db_name,
                  rec.workflow.workflow_name);
        }
    }

    info!("cache keys left: {}", cache.len());
    Ok(())
}
