use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    Configuration(String),
    #[error("access denied: {0}")]
    Access(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("failed to decrypt: {0}")]
    Decryption(String),
    #[error("external service failed: {0}")]
    TransientExternal(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}
