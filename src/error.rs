//! Error types for persiana

use thiserror::Error;

/// Result type alias for persiana operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can cross the library boundary.
///
/// Voice input never produces one of these: recognition, parse and match
/// failures are reported through the recognition state instead.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Device store error
    #[error("registry error: {0}")]
    Registry(String),

    /// A device with this id is already registered
    #[error("device already registered: {0}")]
    DuplicateDevice(String),

    /// No device with this id
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    /// Action name outside raise/lower/stop
    #[error("unknown action: {0}")]
    UnknownAction(String),

    /// Speech engine refused a request
    #[error("engine error: {0}")]
    Engine(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("toml serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// JSON serialization error
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
