//! Implementaciones Postgres (Diesel) de los contratos del core.
//!
//! - `PgWorkflowRepository`: workflows, contenido y enlaces de entorno. El
//!   bloqueo de fila es `SELECT ... FOR UPDATE` dentro de una transacción
//!   read-write; el commit ocurre sólo si el closure devuelve `Ok`.
//! - `PgAuditLog` (`audit`): cabeceras y entradas de auditoría.
//! - `PgTaskQueue` (`tasks`): cola durable de tareas para el ejecutor externo.
//!
//! Los errores transitorios al obtener conexión se reintentan con backoff
//! corto. El cuerpo de una transacción no se reintenta.

pub mod audit;
pub mod rows;
pub mod tasks;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager};
use log::{debug, warn};
use sqlflow_core::env::resolve_in;
use sqlflow_core::{Env, EnvironmentLink, FlowError, Workflow, WorkflowContent, WorkflowId, WorkflowRepository,
                   WorkflowStatus, WorkflowTx};

use crate::error::PersistenceError;
use crate::migrations::run_pending_migrations;
use crate::schema::{db_env_relation, sql_workflow, sql_workflow_content};
use rows::{ContentRow, EnvLinkRow, NewEnvLinkRow, WorkflowChanges, WorkflowRow};

pub use audit::PgAuditLog;
pub use tasks::{ClaimedTask, PgTaskQueue};

/// Pool r2d2 de conexiones Postgres. Se construye con `min_idle`/`max_size`
/// y valida cada conexión al sacarla del pool.
pub type PgPool = r2d2::Pool<ConnectionManager<PgConnection>>;
pub type PgPooledConnection = r2d2::PooledConnection<ConnectionManager<PgConnection>>;

/// Proveedor abstracto de conexiones.
///
/// Permite inyectar un pool real o uno compartido entre varios adaptadores.
/// Debe devolver una conexión válida o `PersistenceError::TransientIo`.
pub trait ConnectionProvider: Send + Sync + 'static {
    fn connection(&self) -> Result<PgPooledConnection, PersistenceError>;
}

/// `ConnectionProvider` respaldado por un `PgPool` (clonarlo comparte el pool).
#[derive(Clone)]
pub struct PoolProvider {
    pub pool: PgPool,
}

impl ConnectionProvider for PoolProvider {
    fn connection(&self) -> Result<PgPooledConnection, PersistenceError> {
        self.pool
            .get()
            .map_err(|e| PersistenceError::TransientIo(format!("pool error: {e}")))
    }
}

/// Retry con backoff lineal (hasta 3 reintentos: 15ms, 30ms, 45ms).
///
/// Sólo repite la unidad de trabajo provista por `f`; usarlo únicamente con
/// operaciones idempotentes.
pub(crate) fn with_retry<F, T>(mut f: F) -> Result<T, PersistenceError>
    where F: FnMut() -> Result<T, PersistenceError>
{
    let mut attempts = 0;
    loop {
        match f() {
            Err(e) if e.is_retryable() && attempts < 3 => {
                let delay_ms = 15 * ((attempts + 1) as u64);
                warn!("retryable error (attempt {}): {:?} -> sleeping {}ms", attempts + 1, e, delay_ms);
                std::thread::sleep(std::time::Duration::from_millis(delay_ms));
                attempts += 1;
            }
            r => return r,
        }
    }
}

fn db(e: diesel::result::Error) -> FlowError {
    PersistenceError::from(e).into()
}

/// Error de una transacción Diesel: o lo devolvió el closure del core o vino
/// de la base de datos (commit incluido).
enum TxFailure {
    Flow(FlowError),
    Db(diesel::result::Error),
}

impl From<diesel::result::Error> for TxFailure {
    fn from(e: diesel::result::Error) -> Self {
        Self::Db(e)
    }
}

impl From<TxFailure> for FlowError {
    fn from(f: TxFailure) -> Self {
        match f {
            TxFailure::Flow(e) => e,
            TxFailure::Db(e) => db(e),
        }
    }
}

struct PgTx<'c> {
    conn: &'c mut PgConnection,
}

impl WorkflowTx for PgTx<'_> {
    fn lock(&mut self, id: WorkflowId) -> Result<Workflow, FlowError> {
        let conn = &mut *self.conn;
        let row = sql_workflow::table.find(id)
                                     .for_update()
                                     .first::<WorkflowRow>(conn)
                                     .optional()
                                     .map_err(db)?
                                     .ok_or(FlowError::NotFound(id))?;
        let content = sql_workflow_content::table.find(id)
                                                 .first::<ContentRow>(conn)
                                                 .optional()
                                                 .map_err(db)?;
        Ok(row.into_workflow(content)?)
    }

    fn save_workflow(&mut self, workflow: &Workflow) -> Result<(), FlowError> {
        let conn = &mut *self.conn;
        let updated = diesel::update(sql_workflow::table.find(workflow.id)).set(&WorkflowChanges::from(workflow))
                                                                          .execute(conn)
                                                                          .map_err(db)?;
        if updated == 0 {
            return Err(FlowError::NotFound(workflow.id));
        }
        Ok(())
    }

    fn save_content(&mut self, id: WorkflowId, content: &WorkflowContent) -> Result<(), FlowError> {
        let conn = &mut *self.conn;
        let row = ContentRow { workflow_id: id,
                               sql_content: content.sql_content.clone(),
                               execute_result: content.execute_result.clone() };
        diesel::insert_into(sql_workflow_content::table).values(&row)
                                                        .on_conflict(sql_workflow_content::workflow_id)
                                                        .do_update()
                                                        .set(&row)
                                                        .execute(conn)
                                                        .map_err(db)?;
        Ok(())
    }
}

/// Repositorio de workflows sobre Postgres.
pub struct PgWorkflowRepository<P: ConnectionProvider> {
    provider: P,
}

impl<P: ConnectionProvider> PgWorkflowRepository<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    fn conn(&self) -> Result<PgPooledConnection, FlowError> {
        Ok(with_retry(|| self.provider.connection())?)
    }

    /// Alta de un workflow con su contenido (lo hace el flujo de revisión
    /// aguas arriba; aquí se usa para sembrar datos).
    pub fn create(&self, workflow: &Workflow) -> Result<(), FlowError> {
        let content = ContentRow { workflow_id: workflow.id,
                                   sql_content: workflow.content.sql_content.clone(),
                                   execute_result: workflow.content.execute_result.clone() };
        let mut conn = self.conn()?;
        conn.build_transaction()
            .read_write()
            .run(|c| {
                diesel::insert_into(sql_workflow::table).values(&WorkflowChanges::from(workflow))
                                                        .execute(c)?;
                diesel::insert_into(sql_workflow_content::table).values(&content).execute(c)?;
                Ok::<(), diesel::result::Error>(())
            })
            .map_err(db)?;
        debug!("create workflow={} status={}", workflow.id, workflow.status);
        Ok(())
    }

    /// Registra un enlace de entorno y devuelve su id.
    pub fn add_link(&self, link: &EnvironmentLink) -> Result<i64, FlowError> {
        let mut conn = self.conn()?;
        diesel::insert_into(db_env_relation::table).values(&NewEnvLinkRow::from(link))
                                                   .returning(db_env_relation::id)
                                                   .get_result(&mut conn)
                                                   .map_err(db)
    }
}

impl<P: ConnectionProvider> WorkflowRepository for PgWorkflowRepository<P> {
    fn transaction<T, F>(&self, f: F) -> Result<T, FlowError>
        where F: FnOnce(&mut dyn WorkflowTx) -> Result<T, FlowError>
    {
        let mut conn = self.conn()?;
        conn.build_transaction()
            .read_write()
            .run(|c| {
                let mut tx = PgTx { conn: c };
                f(&mut tx).map_err(TxFailure::Flow)
            })
            .map_err(FlowError::from)
    }

    fn load(&self, id: WorkflowId) -> Result<Workflow, FlowError> {
        let (row, content) = with_retry(|| {
                                 let mut conn = self.provider.connection()?;
                                 let row = sql_workflow::table.find(id).first::<WorkflowRow>(&mut conn).optional()?;
                                 let content = sql_workflow_content::table.find(id)
                                                                          .first::<ContentRow>(&mut conn)
                                                                          .optional()?;
                                 Ok((row, content))
                             })?;
        let row = row.ok_or(FlowError::NotFound(id))?;
        Ok(row.into_workflow(content)?)
    }

    fn force_exception(&self, id: WorkflowId, finish_time: DateTime<Utc>, detail: &str) -> Result<(), FlowError> {
        let updated = with_retry(|| {
                          let mut conn = self.provider.connection()?;
                          conn.build_transaction()
                              .read_write()
                              .run(|c| {
                                  let n = diesel::update(sql_workflow::table.find(id))
                                      .set((sql_workflow::status.eq(WorkflowStatus::Exception.as_str()),
                                            sql_workflow::finish_time.eq(Some(finish_time))))
                                      .execute(c)?;
                                  if n > 0 {
                                      diesel::insert_into(sql_workflow_content::table)
                                          .values(&ContentRow { workflow_id: id,
                                                                sql_content: String::new(),
                                                                execute_result: Some(detail.to_string()) })
                                          .on_conflict(sql_workflow_content::workflow_id)
                                          .do_update()
                                          .set(sql_workflow_content::execute_result.eq(Some(detail)))
                                          .execute(c)?;
                                  }
                                  Ok::<usize, diesel::result::Error>(n)
                              })
                              .map_err(PersistenceError::from)
                      })?;
        if updated == 0 {
            return Err(FlowError::NotFound(id));
        }
        warn!("force_exception workflow={id}");
        Ok(())
    }

    fn find_env_link(&self, instance: &str, db_name: &str) -> Result<Option<(Env, EnvironmentLink)>, FlowError> {
        use crate::schema::db_env_relation::dsl as r;
        let rows: Vec<EnvLinkRow> =
            with_retry(|| {
                let mut conn = self.provider.connection()?;
                r::db_env_relation.filter(r::dev_instance.eq(instance)
                                                         .and(r::dev_database.eq(db_name))
                                                         .or(r::sit_instance.eq(instance).and(r::sit_database.eq(db_name)))
                                                         .or(r::uat_instance.eq(instance).and(r::uat_database.eq(db_name)))
                                                         .or(r::pro_instance.eq(instance).and(r::pro_database.eq(db_name))))
                                  .order(r::id.asc())
                                  .load(&mut conn)
                                  .map_err(PersistenceError::from)
            })?;
        let links: Vec<EnvironmentLink> = rows.into_iter().map(EnvironmentLink::from).collect();
        Ok(resolve_in(&links, instance, db_name).map(|(env, link)| (env, link.clone())))
    }
}

/// Construye un pool Postgres r2d2 a partir de URL y ejecuta las migraciones
/// pendientes con la primera conexión.
///
/// Si `min_size > max_size` se usa `min_size = max_size`. Los tamaños 0 se
/// elevan a 1.
pub fn build_pool(database_url: &str, min_size: u32, max_size: u32) -> Result<PgPool, PersistenceError> {
    let validated_min = min_size.max(1);
    let validated_max = max_size.max(1);
    if validated_min > validated_max {
        warn!("min_size > max_size ({validated_min} > {validated_max}), ajustando min=max");
    }
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = r2d2::Pool::builder().min_idle(Some(validated_min.min(validated_max)))
                                    .max_size(validated_max)
                                    .test_on_check_out(true)
                                    .build(manager)
                                    .map_err(|e| PersistenceError::TransientIo(format!("pool build: {e}")))?;
    {
        let mut conn = pool.get()
                           .map_err(|e| PersistenceError::TransientIo(format!("pool get for migrations: {e}")))?;
        run_pending_migrations(&mut conn)?;
    }
    Ok(pool)
}

/// Carga `.env`, lee `DbConfig` y construye un pool ya migrado.
pub fn build_pool_from_env() -> Result<PgPool, PersistenceError> {
    let cfg = crate::config::DbConfig::from_env()?;
    build_pool(&cfg.url, cfg.min_connections, cfg.max_connections)
}
