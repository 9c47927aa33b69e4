use thiserror::Error;

/// Errors produced by the run-state machinery. The in-memory store never
/// fails; the variant exists for the trait contract, so durable
/// implementations have somewhere to surface their faults.
#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Storage error: {0}")]
    StorageError(String),
}

pub type Result<T> = std::result::Result<T, FlowError>;
