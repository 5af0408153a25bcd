//! Configuración central de la aplicación.
//! Carga variables de entorno (.env) una sola vez y expone `CONFIG`.
use once_cell::sync::Lazy;
use sqlflow_core::NotifyConfig;
use sqlflow_persistence::{notify_config_from_env, DbConfig};

/// Configuración global de la aplicación.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Sin `DATABASE_URL` la aplicación trabaja en memoria.
    pub database: Option<DbConfig>,
    /// Fases con notificación (`NOTIFY_PHASE_CONTROL`).
    pub notify: NotifyConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let database = match DbConfig::from_env() {
            Ok(cfg) => Some(cfg),
            Err(e) => {
                log::debug!("database disabled: {e}");
                None
            }
        };
        Self { database,
               notify: notify_config_from_env() }
    }
}

/// Instancia global perezosa de configuración, evaluada una sola vez.
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);
