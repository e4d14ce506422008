//! Error types for ghidra-bridge
//!
//! Centralized error handling using thiserror. Component-level failures that
//! are part of normal loop operation (normalizer rejections, tool outcomes)
//! are values, not errors; they live next to the component that produces them.

use thiserror::Error;

/// Errors that abort an operation of the bridge library
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Tool catalogue could not be built or loaded
    #[error("Registry error: {0}")]
    Registry(String),

    /// Invalid configuration value
    #[error("Config error: {0}")]
    Config(String),

    /// Model backend failure
    #[error("Backend error: {0}")]
    Backend(String),

    /// Remote tool API could not be reached
    #[error("Transport error: {0}")]
    Transport(String),

    /// Prompt template failed to render
    #[error("Template error: {0}")]
    Template(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML catalogue parse error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_error() {
        let err = BridgeError::Registry("duplicate tool 'list_functions'".to_string());
        assert_eq!(err.to_string(), "Registry error: duplicate tool 'list_functions'");
    }

    #[test]
    fn test_backend_error() {
        let err = BridgeError::Backend("connection refused".to_string());
        assert_eq!(err.to_string(), "Backend error: connection refused");
    }

    #[test]
    fn test_transport_error() {
        let err = BridgeError::Transport("timeout".to_string());
        assert_eq!(err.to_string(), "Transport error: timeout");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: BridgeError = io_err.into();
        assert!(matches!(err, BridgeError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let err: BridgeError = json_err.into();
        assert!(matches!(err, BridgeError::Json(_)));
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Value>("invalid { toml }").unwrap_err();
        let err: BridgeError = toml_err.into();
        assert!(matches!(err, BridgeError::Toml(_)));
    }
}
