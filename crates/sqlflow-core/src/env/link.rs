//! Enlace de entornos: para un camino de cambios, el par (instancia, base de
//! datos) de cada uno de los cuatro entornos.
//!
//! La resolución recorre los slots en orden fijo con igualdad exacta sobre
//! ambos campos. Si un enlace apunta el mismo par a varios slots (p. ej. dev y
//! sit sobre la misma base) se trata como error de configuración: se registra
//! un warning y gana el primer slot.
use log::warn;
use serde::{Deserialize, Serialize};

use super::Env;

/// Destino de un entorno dentro de un enlace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EnvSlot {
    pub instance: Option<String>,
    pub database: Option<String>,
}

impl EnvSlot {
    pub fn new(instance: impl Into<String>, database: impl Into<String>) -> Self {
        Self { instance: Some(instance.into()),
               database: Some(database.into()) }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Configurado si instancia y base de datos existen y no están vacías.
    pub fn is_configured(&self) -> bool {
        matches!((&self.instance, &self.database), (Some(i), Some(d)) if !i.is_empty() && !d.is_empty())
    }

    pub fn matches(&self, instance: &str, database: &str) -> bool {
        self.instance.as_deref() == Some(instance) && self.database.as_deref() == Some(database)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EnvironmentLink {
    pub id: i64,
    pub dev: EnvSlot,
    pub sit: EnvSlot,
    pub uat: EnvSlot,
    pub pro: EnvSlot,
}

impl EnvironmentLink {
    pub fn slot(&self, env: Env) -> &EnvSlot {
        match env {
            Env::Dev => &self.dev,
            Env::Sit => &self.sit,
            Env::Uat => &self.uat,
            Env::Pro => &self.pro,
        }
    }

    /// Slots en orden de promoción.
    pub fn slots(&self) -> [(Env, &EnvSlot); 4] {
        Env::ORDER.map(|env| (env, self.slot(env)))
    }

    /// Todos los slots que ocupa el par, en orden de promoción.
    pub fn envs_of(&self, instance: &str, database: &str) -> Vec<Env> {
        self.slots()
            .into_iter()
            .filter(|(_, slot)| slot.matches(instance, database))
            .map(|(env, _)| env)
            .collect()
    }

    /// Entorno que ocupa el par (instancia, base de datos), si alguno.
    pub fn resolve(&self, instance: &str, database: &str) -> Option<Env> {
        let hits = self.envs_of(instance, database);
        let (&first, others) = hits.split_first()?;
        if !others.is_empty() {
            warn!("environment link {} maps {instance}/{database} to {first} and {:?}; using {first}",
                  self.id,
                  others);
        }
        Some(first)
    }

    /// Siguiente slot configurado tras `current`.
    pub fn next_configured(&self, current: Env) -> Option<(Env, &EnvSlot)> {
        let next = current.next()?;
        let slot = self.slot(next);
        slot.is_configured().then_some((next, slot))
    }
}

/// Primer enlace que contiene el par y el entorno que ocupa en él.
pub fn resolve_in<'a>(links: &'a [EnvironmentLink],
                      instance: &str,
                      database: &str)
                      -> Option<(Env, &'a EnvironmentLink)> {
    links.iter()
         .find_map(|link| link.resolve(instance, database).map(|env| (env, link)))
}
