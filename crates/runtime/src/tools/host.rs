//! Tool host trait.

use std::future::Future;

use serde_json::Value;

use super::{Invocation, ToolError, ToolSpec};

/// Trait for tool execution hosts.
///
/// Implementations provide tool specifications and execute invocations.
/// This is the boundary between generation and side effects; the gate and
/// name checks live in [`ToolDispatcher`](super::ToolDispatcher), not here.
pub trait ToolHost: Send + Sync {
    /// Get available tool specifications.
    fn specs(&self) -> &[ToolSpec];

    /// Execute one invocation.
    fn execute(
        &self,
        invocation: &Invocation,
    ) -> impl Future<Output = Result<Value, ToolError>> + Send;

    /// Whether the host can take calls right now.
    fn is_ready(&self) -> impl Future<Output = bool> + Send;
}
