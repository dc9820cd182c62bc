//! Error types for powder

use thiserror::Error;

/// The main error type for powder operations
#[derive(Debug, Error)]
pub enum PowderError {
    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    #[error("Component not found on entity {entity}: {component}")]
    ComponentMissing { entity: String, component: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("TOML serialization error: {0}")]
    TomlSer(String),

    #[error("Physics error: {0}")]
    Physics(String),

    #[error("Runtime error: {0}")]
    Runtime(String),
}

/// Result type alias for powder operations
pub type Result<T> = std::result::Result<T, PowderError>;

impl From<toml::de::Error> for PowderError {
    fn from(err: toml::de::Error) -> Self {
        PowderError::TomlParse(err.to_string())
    }
}

impl From<toml::ser::Error> for PowderError {
    fn from(err: toml::ser::Error) -> Self {
        PowderError::TomlSer(err.to_string())
    }
}
