//! Runner de las migraciones embebidas (`migrations/` de este crate). Se
//! ejecutan una vez al construir el pool.

use crate::error::PersistenceError;
use diesel::pg::PgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

pub fn run_pending_migrations(conn: &mut PgConnection) -> Result<(), PersistenceError> {
    conn.run_pending_migrations(MIGRATIONS)
        .map(|applied| log::debug!("migrations applied={}", applied.len()))
        .map_err(|e| PersistenceError::Unknown(format!("migration error: {e}")))
}
