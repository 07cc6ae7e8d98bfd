//! Roamcast error types.

/// All errors surfaced by Roamcast crates.
#[derive(Debug, thiserror::Error)]
pub enum RoamcastError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Provider error: {0}")]
    Provider(String),

    /// A generative oracle was unreachable or returned malformed output.
    /// Propagated to the caller; nothing is marked posted.
    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Channel error: {0}")]
    Channel(String),

    /// Direct-mode publish failed. The schedule must not have been advanced.
    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API key missing for provider '{0}'")]
    ApiKeyMissing(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RoamcastError>;
