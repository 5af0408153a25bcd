//! Configuración inyectada al orquestador.

/// Fases con notificación habilitada, a partir del valor separado por comas
/// `notify_phase_control`. Sin valor (o cadena vacía) todas las fases
/// notifican. Los nombres se comparan tal cual, sin recortar espacios.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotifyConfig {
    phases: Option<Vec<String>>,
}

impl NotifyConfig {
    pub fn from_setting(value: Option<&str>) -> Self {
        let phases = value.filter(|v| !v.is_empty())
                          .map(|v| v.split(',').map(str::to_string).collect());
        Self { phases }
    }

    /// Todas las fases habilitadas.
    pub fn all() -> Self {
        Self { phases: None }
    }

    pub fn is_enabled(&self, phase: &str) -> bool {
        match &self.phases {
            None => true,
            Some(phases) => phases.iter().any(|p| p == phase),
        }
    }
}
