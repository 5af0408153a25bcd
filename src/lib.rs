//! sqlflow-rust
//!
//! Librería de aplicación sobre `sqlflow-core` y `sqlflow-persistence`:
//! - `config`: configuración desde el entorno.
//! - `errors`: error de aplicación que agrupa los de cada crate.
//! - `runner`: motor de ejecución en proceso (tokio) para demos y pruebas.

pub mod config;
pub mod errors;
pub mod runner;

pub use config::{AppConfig, CONFIG};
pub use errors::CoreError;
pub use runner::{CallbackRunner, ChannelEngine, DryRunExecutor, SqlExecutor};
