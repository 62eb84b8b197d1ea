use crate::domain::machine::ActionState;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Worker channel is not connected")]
    NotConnected,
    #[error("Invalid transition: cannot {operation} while {state}")]
    InvalidTransition {
        state: ActionState,
        operation: &'static str,
    },
    #[error("External event does not match the live action")]
    UnmatchedExternalEvent,
    #[error("Worker failure ({reason}): {message}")]
    WorkerFailure {
        reason: String,
        message: String,
        fatal: bool,
    },
    #[error("Terminal outcome already emitted for transaction {0}")]
    DuplicateTerminalEmission(Uuid),
    #[error("Transaction {0} is closed")]
    TransactionClosed(Uuid),
    #[error("Orchestrator is no longer running")]
    OrchestratorStopped,
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for FlowError {
    fn from(e: rocksdb::Error) -> Self {
        FlowError::InternalError(Box::new(e))
    }
}

pub type Result<T> = std::result::Result<T, FlowError>;
