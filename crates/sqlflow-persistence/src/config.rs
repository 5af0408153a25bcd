//! Configuración de conexión desde variables de entorno (`DATABASE_URL` y
//! tamaños opcionales del pool).

use std::env;

use dotenvy::dotenv;
use once_cell::sync::Lazy;
use sqlflow_core::NotifyConfig;

use crate::error::PersistenceError;

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub url: String,
    pub min_connections: u32,
    pub max_connections: u32,
}

impl DbConfig {
    pub fn from_env() -> Result<Self, PersistenceError> {
        Lazy::force(&DOTENV_LOADED);
        let url = env::var("DATABASE_URL").map_err(|_| PersistenceError::Config("DATABASE_URL no definido".into()))?;
        Ok(Self::with_pool_sizes(url,
                                 env::var("DATABASE_MIN_CONNECTIONS").ok().as_deref(),
                                 env::var("DATABASE_MAX_CONNECTIONS").ok().as_deref()))
    }

    /// Tamaños no numéricos o ausentes caen a 2 y 16.
    pub fn with_pool_sizes(url: impl Into<String>, min: Option<&str>, max: Option<&str>) -> Self {
        Self { url: url.into(),
               min_connections: min.and_then(|v| v.trim().parse().ok()).unwrap_or(2),
               max_connections: max.and_then(|v| v.trim().parse().ok()).unwrap_or(16) }
    }
}

/// Fases con notificación según `NOTIFY_PHASE_CONTROL` (sin valor: todas).
pub fn notify_config_from_env() -> NotifyConfig {
    Lazy::force(&DOTENV_LOADED);
    NotifyConfig::from_setting(env::var("NOTIFY_PHASE_CONTROL").ok().as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_sizes_default_when_missing_or_garbage() {
        let cfg = DbConfig::with_pool_sizes("postgres://x", None, Some("many"));
        assert_eq!((cfg.min_connections, cfg.max_connections), (2, 16));
        let cfg = DbConfig::with_pool_sizes("postgres://x", Some(" 1 "), Some("4"));
        assert_eq!((cfg.min_connections, cfg.max_connections), (1, 4));
    }
}
