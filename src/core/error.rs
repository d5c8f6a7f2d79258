//! Error types for the kitchen pipeline

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors that can occur while wiring up or tearing down the pipeline.
///
/// Queue operations, `submit` and `close` never fail; only thread management
/// and configuration produce these.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum PipelineError {
    /// Failed to spawn a worker thread
    #[error("Failed to spawn {role} thread: {message}")]
    SpawnError {
        /// Role of the thread that failed to spawn
        role: String,
        /// Error message
        message: String,
        /// Source IO error
        #[source]
        source: Option<std::io::Error>,
    },

    /// A worker thread panicked before reaching its terminal state
    #[error("Failed to join {role} thread: {message}")]
    JoinError {
        /// Role of the thread that failed to join
        role: String,
        /// Panic message
        message: String,
    },

    /// Invalid configuration with parameter
    #[error("Invalid configuration for '{parameter}': {message}")]
    InvalidConfig {
        /// Configuration parameter name
        parameter: String,
        /// Error message
        message: String,
    },

    /// Reading a configuration file failed
    #[error("Failed to read config file '{path}'")]
    ConfigIo {
        /// Path of the config file
        path: String,
        /// Source IO error
        #[source]
        source: std::io::Error,
    },

    /// A configuration file could not be parsed
    #[error("Failed to parse config file '{path}'")]
    ConfigParse {
        /// Path of the config file
        path: String,
        /// Source JSON error
        #[source]
        source: serde_json::Error,
    },
}

impl PipelineError {
    /// Create a spawn error with source
    pub fn spawn_with_source(
        role: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        PipelineError::SpawnError {
            role: role.into(),
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create a join error
    pub fn join(role: impl Into<String>, message: impl Into<String>) -> Self {
        PipelineError::JoinError {
            role: role.into(),
            message: message.into(),
        }
    }

    /// Create a join error from the payload of a panicked thread
    pub fn from_panic(role: impl Into<String>, payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        Self::join(role, message)
    }

    /// Create an invalid config error
    pub fn invalid_config(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        PipelineError::InvalidConfig {
            parameter: parameter.into(),
            message: message.into(),
        }
    }
}
