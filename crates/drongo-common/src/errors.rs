use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

#[derive(Debug, thiserror::Error)]
pub enum RealtimeError {
    #[error("invalid origin: {0}")]
    InvalidOrigin(String),

    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("invalid payload for '{kind}': {reason}")]
    InvalidPayload { kind: String, reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum DrongoError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Realtime(#[from] RealtimeError),

    #[error(transparent)]
    Event(#[from] EventError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
