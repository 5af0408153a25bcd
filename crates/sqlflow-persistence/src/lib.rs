//! sqlflow-persistence
//!
//! Adaptadores Postgres (Diesel + r2d2) de los contratos de `sqlflow-core`.
//!
//! Módulos:
//! - `pg`: repositorio de workflows, auditoría y cola de tareas.
//! - `migrations`: runner embebido de migraciones Diesel.
//! - `config`: carga de configuración desde .env.
//! - `schema`: tablas Diesel declaradas para compilar queries.

pub mod config;
pub mod error;
pub mod migrations;
pub mod pg;
pub mod schema;

pub use config::{notify_config_from_env, DbConfig};
pub use error::PersistenceError;
pub use pg::{build_pool, build_pool_from_env, ClaimedTask, ConnectionProvider, PgAuditLog, PgPool, PgTaskQueue,
             PgWorkflowRepository, PoolProvider};
