use thiserror::Error;

/// Errors that can occur during tool execution.
///
/// The display text is what the end user sees after `Error: `.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    /// The request did not enable tools.
    #[error("tools disabled")]
    Disabled,

    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// Arguments were missing or malformed; no provider call was made.
    #[error("{0}")]
    InvalidArguments(String),

    #[error(transparent)]
    Provider(#[from] weather::Error),

    /// The out-of-process tool server reported a failure.
    #[error("{0}")]
    Remote(String),

    #[error("tool call timed out")]
    Timeout,

    #[error("execution failed: {0}")]
    Execution(String),
}

/// Errors starting or talking to a tool server.
#[derive(Debug, Error)]
pub enum McpError {
    #[error("failed to spawn tool server: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("tool server handshake failed: {0}")]
    Handshake(String),

    #[error("tool server request failed: {0}")]
    Request(String),
}
