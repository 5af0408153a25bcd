use sqlflow_core::FlowError;
use sqlflow_persistence::PersistenceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Error de persistencia: {0}")]
    Persistence(#[from] PersistenceError),
    #[error("Error de workflow: {0}")]
    Flow(#[from] FlowError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlflow_core::WorkflowStatus;

    #[test]
    fn flow_errors_keep_their_message() {
        let err: CoreError = FlowError::InvalidState { id: 7,
                                                       status: WorkflowStatus::Finish,
                                                       operation: "dispatch" }.into();
        assert!(err.to_string().starts_with("Error de workflow: workflow 7"));
    }

    #[test]
    fn missing_database_url_is_a_persistence_error() {
        let err: CoreError = PersistenceError::Config("DATABASE_URL no definido".into()).into();
        assert_eq!(err.to_string(), "Error de persistencia: configuration: DATABASE_URL no definido");
    }
}
