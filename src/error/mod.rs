//! Error types for parley.

use thiserror::Error;

/// Primary error type for all parley operations.
#[derive(Error, Debug)]
pub enum ParleyError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config file error: {0}")]
    ConfigFile(#[from] toml::de::Error),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Rate limited: retry after {retry_after_ms:?}ms")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    /// Malformed or error-flagged chunk from the model endpoint.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The user asked for the turn to stop.
    #[error("Request canceled")]
    Canceled,

    #[error("Tool call requested but no tool executor is configured: {tool_name}")]
    ToolCapability { tool_name: String },

    #[error("Tool call budget exceeded (max_tool_calls={max})")]
    ToolBudgetExceeded { max: usize },

    #[error("Tool execution error ({tool_name}): {message}")]
    ToolExecution { tool_name: String, message: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// Broad error category for routing recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Authentication,
    RateLimit,
    Network,
    Timeout,
    Server,
    Api,
    Protocol,
    Cancellation,
    ToolCapability,
    ToolBudget,
    ToolExecution,
    Configuration,
    Serialization,
    Storage,
    Unknown,
}

impl ParleyError {
    /// Create an API error.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create a tool execution error.
    pub fn tool(tool_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolExecution {
            tool_name: tool_name.into(),
            message: message.into(),
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Authentication(_) => ErrorCategory::Authentication,
            Self::RateLimited { .. } => ErrorCategory::RateLimit,
            Self::Network(_) | Self::Io(_) => ErrorCategory::Network,
            Self::Timeout(_) => ErrorCategory::Timeout,
            Self::Configuration(_) | Self::ConfigFile(_) => ErrorCategory::Configuration,
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::Api { status, .. } => match status {
                401 | 403 => ErrorCategory::Authentication,
                429 => ErrorCategory::RateLimit,
                500..=599 => ErrorCategory::Server,
                _ => ErrorCategory::Api,
            },
            Self::Protocol(_) => ErrorCategory::Protocol,
            Self::Canceled => ErrorCategory::Cancellation,
            Self::ToolCapability { .. } => ErrorCategory::ToolCapability,
            Self::ToolBudgetExceeded { .. } => ErrorCategory::ToolBudget,
            Self::ToolExecution { .. } => ErrorCategory::ToolExecution,
            Self::Storage(_) => ErrorCategory::Storage,
            Self::InvalidArgument(_) | Self::NotFound(_) => ErrorCategory::Unknown,
        }
    }

    /// Whether this error is potentially retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::RateLimit
                | ErrorCategory::Network
                | ErrorCategory::Timeout
                | ErrorCategory::Server
        )
    }

    /// Whether this error came from the user canceling the turn.
    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }

    /// Whether this error ends a turn outright rather than being folded into
    /// the conversation as a tool result.
    pub fn is_fatal_for_turn(&self) -> bool {
        !matches!(self, Self::ToolExecution { .. } | Self::InvalidArgument(_))
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, ParleyError>;
