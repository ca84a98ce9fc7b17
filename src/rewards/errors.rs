use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum PersistenceError {
    #[error("Result store unavailable: {0}")]
    Unavailable(String),

    #[error("Result for session {0} was already recorded")]
    Duplicate(String),
}
