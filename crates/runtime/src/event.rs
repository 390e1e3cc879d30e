//! Events produced by one generation.

use crate::tools::{Invocation, ToolResult};

/// One step of a session's output, in emission order.
///
/// A session ends with exactly one of [`End`](Self::End) or
/// [`Error`](Self::Error), unless the consumer went away first.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationEvent {
    /// Narrative text for the user.
    Content(String),
    /// The model asked for a tool.
    ToolInvoked(Invocation),
    ToolResult(ToolResult),
    /// Generation failed; no further events follow.
    Error(String),
    End,
}

impl GenerationEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::End | Self::Error(_))
    }
}
