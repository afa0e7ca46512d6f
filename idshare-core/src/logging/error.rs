//! Error types for the logging subsystem

/// Errors that can occur in the logging subsystem
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoggingError {
    /// A global subscriber is already installed, or the subscriber failed to build
    #[error("Failed to initialize logging: {0}")]
    InitializationFailed(String),

    /// Unrecognised log level name
    #[error("Invalid log level '{0}' (expected trace, debug, info, warn or error)")]
    InvalidLevel(String),
}
