#![allow(dead_code)]

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Mutex, MutexGuard};

use once_cell::sync::Lazy;
use sqlflow_core::{EnvSlot, EnvironmentLink, SyntaxType, Workflow, WorkflowStatus};
use sqlflow_persistence::config::DbConfig;
use sqlflow_persistence::pg::{build_pool, PgPool, PoolProvider};

pub static TEST_POOL: Lazy<Option<PgPool>> = Lazy::new(|| {
    let cfg = DbConfig::from_env().ok()?;
    match build_pool(&cfg.url, 1, 4) {
        Ok(p) => Some(p),
        Err(e) => {
            eprintln!("No se pudo construir pool de test: {e}");
            None
        }
    }
});

pub fn with_provider<F, R>(f: F) -> Option<R>
    where F: FnOnce(PoolProvider) -> R
{
    TEST_POOL.as_ref().map(|p| f(PoolProvider { pool: p.clone() }))
}

// Ids por proceso para no chocar con datos de ejecuciones anteriores.
static NEXT_ID: Lazy<AtomicI64> = Lazy::new(|| {
    let base = chrono::Utc::now().timestamp_micros() % 1_000_000_000_000;
    AtomicI64::new(base * 1000)
});

pub fn fresh_id() -> i64 {
    NEXT_ID.fetch_add(1, Ordering::SeqCst)
}

/// Nombres de instancia únicos para que los enlaces de un test no resuelvan
/// los de otro.
pub fn unique_link(tag: i64) -> EnvironmentLink {
    EnvironmentLink { id: 0,
                      dev: EnvSlot::new(format!("dev-{tag}"), "orders"),
                      sit: EnvSlot::new(format!("sit-{tag}"), "orders"),
                      uat: EnvSlot::empty(),
                      pro: EnvSlot::empty() }
}

pub fn queued_at_dev(id: i64, tag: i64) -> Workflow {
    Workflow::new(id, "[dev]Add index", format!("dev-{tag}"), "orders", "alter table t add index i(a);")
        .with_status(WorkflowStatus::Queuing)
        .with_syntax(SyntaxType::Ddl)
        .with_owner("alice", 1)
}

// `claim_next` reclama cualquier tarea pendiente: los tests que reclaman se
// serializan para no quitarse las tareas entre sí.
static QUEUE_LOCK: Mutex<()> = Mutex::new(());

pub fn queue_guard() -> MutexGuard<'static, ()> {
    QUEUE_LOCK.lock().unwrap_or_else(|e| e.into_inner())
}
