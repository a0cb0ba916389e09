use thiserror::Error;

/// Convenience alias used across the library.
pub type Result<T, E = ModelflowError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ModelflowError {
    #[error("included AND excluded fields specified")]
    InvalidFilterConfiguration,

    #[error("Unknown state `{label}` for workflow `{machine}`")]
    UnknownState { machine: String, label: String },

    #[error("Illegal transition from {from}: {reason}")]
    IllegalTransition { from: String, reason: String },

    #[error("Invalid state machine: {0}")]
    InvalidStateMachine(String),

    #[error("Object graph error: {0}")]
    Graph(String),

    #[error("History store error: {0}")]
    Store(#[from] StoreError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Failures reported by a history persistence backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Another writer changed the rows under the transaction.
    #[error("write conflict on {0}")]
    Conflict(String),

    #[error("history record {0} not found")]
    RecordNotFound(u64),

    #[error("backend failure: {0}")]
    Backend(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_state_display() {
        let err = ModelflowError::UnknownState {
            machine: "fake_item".into(),
            label: "SHIPPED".into(),
        };
        assert_eq!(
            err.to_string(),
            "Unknown state `SHIPPED` for workflow `fake_item`"
        );
    }

    #[test]
    fn store_error_converts() {
        let err: ModelflowError = StoreError::RecordNotFound(7).into();
        assert!(matches!(err, ModelflowError::Store(StoreError::RecordNotFound(7))));
        assert_eq!(
            err.to_string(),
            "History store error: history record 7 not found"
        );
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ModelflowError>();
    }
}
