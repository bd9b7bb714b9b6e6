pub mod errors;

pub use errors::{ConfigError, DrongoError, EventError, RealtimeError};

pub type Result<T> = std::result::Result<T, DrongoError>;
