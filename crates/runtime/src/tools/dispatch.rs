//! Gated, name-checked tool dispatch.

use tracing::{debug, warn};

use super::{Invocation, ToolError, ToolHost, ToolResult};

/// Routes invocations to a host, enforcing the per-request tool gate.
///
/// Every failure becomes a [`ToolResult::Failure`]; dispatch itself never
/// errors.
pub struct ToolDispatcher<'a, T> {
    host: &'a T,
    enabled: bool,
}

impl<'a, T: ToolHost> ToolDispatcher<'a, T> {
    pub fn new(host: &'a T, enabled: bool) -> Self {
        Self { host, enabled }
    }

    pub async fn dispatch(&self, invocation: &Invocation) -> ToolResult {
        match self.try_dispatch(invocation).await {
            Ok(result) => {
                debug!(tool = %invocation.name, "tool call succeeded");
                result
            }
            Err(e) => {
                warn!(tool = %invocation.name, error = %e, "tool call failed");
                ToolResult::failure(e.to_string())
            }
        }
    }

    async fn try_dispatch(&self, invocation: &Invocation) -> Result<ToolResult, ToolError> {
        if !self.enabled {
            return Err(ToolError::Disabled);
        }
        if !self.host.specs().iter().any(|s| s.name == invocation.name) {
            return Err(ToolError::UnknownTool(invocation.name.clone()));
        }
        let payload = self.host.execute(invocation).await?;
        Ok(ToolResult::success(payload))
    }
}
