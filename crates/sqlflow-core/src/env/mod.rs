//! Cadena de entornos dev -> sit -> uat -> pro.
//!
//! - `link`: enlaces de entorno y resolución del slot actual.
//! - `promote`: re-apunta un workflow al siguiente entorno configurado.

pub mod link;
pub mod promote;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use link::{resolve_in, EnvSlot, EnvironmentLink};
pub use promote::{promote, retag_name};

/// Entorno de despliegue, en orden de promoción.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Env {
    Dev,
    Sit,
    Uat,
    Pro,
}

impl Env {
    pub const ORDER: [Env; 4] = [Env::Dev, Env::Sit, Env::Uat, Env::Pro];

    pub fn label(self) -> &'static str {
        match self {
            Env::Dev => "dev",
            Env::Sit => "sit",
            Env::Uat => "uat",
            Env::Pro => "pro",
        }
    }

    /// Siguiente entorno de la cadena; `None` desde `Pro`.
    pub fn next(self) -> Option<Env> {
        match self {
            Env::Dev => Some(Env::Sit),
            Env::Sit => Some(Env::Uat),
            Env::Uat => Some(Env::Pro),
            Env::Pro => None,
        }
    }

    /// Etiqueta entre corchetes usada en `workflow_name`, p. ej. `[sit]`.
    pub fn tag(self) -> String {
        format!("[{}]", self.label())
    }
}

impl fmt::Display for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Env {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Env::ORDER.iter()
                  .copied()
                  .find(|e| e.label() == s)
                  .ok_or_else(|| format!("unknown environment '{s}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_order() {
        let mut chain = vec![Env::Dev];
        while let Some(next) = chain.last().and_then(|e| e.next()) {
            chain.push(next);
        }
        assert_eq!(chain, Env::ORDER.to_vec());
        assert_eq!("uat".parse::<Env>(), Ok(Env::Uat));
        assert_eq!(Env::Pro.tag(), "[pro]");
    }
}
