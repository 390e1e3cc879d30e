//! Wire frames for chat responses.
//!
//! Streaming responses carry one [`Frame`] per server-sent event: `start`,
//! then content and tool frames in emission order, then exactly one of
//! `done` or `error`. Non-streaming responses fold the same events into a
//! [`ChatResult`].

use std::collections::BTreeMap;

use futures::{Stream, StreamExt};
use runtime::{GenerationEvent, Invocation, ToolResult};
use serde::Serialize;
use serde_json::Value;

/// A tool call as reported to the client.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolCall {
    pub name: String,
    pub arguments: BTreeMap<String, String>,
}

impl From<Invocation> for ToolCall {
    fn from(invocation: Invocation) -> Self {
        Self {
            name: invocation.name,
            arguments: invocation.arguments,
        }
    }
}

/// One streamed chunk, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    Start { id: Value },
    Content { content: String },
    ToolCalls { tool_calls: Vec<ToolCall> },
    Error { error: String },
    Done,
}

impl Frame {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error { .. })
    }
}

impl From<GenerationEvent> for Frame {
    fn from(event: GenerationEvent) -> Self {
        match event {
            GenerationEvent::Content(content) => Self::Content { content },
            GenerationEvent::ToolInvoked(invocation) => Self::ToolCalls {
                tool_calls: vec![invocation.into()],
            },
            GenerationEvent::ToolResult(result) => Self::Content {
                content: annotation(&result),
            },
            GenerationEvent::Error(error) => Self::Error { error },
            GenerationEvent::End => Self::Done,
        }
    }
}

/// Text spliced into the narrative for a tool result.
fn annotation(result: &ToolResult) -> String {
    format!("\n\n{}", result.render())
}

/// Frames for a whole session: `start`, then one per event.
pub fn frames<S>(id: Value, events: S) -> impl Stream<Item = Frame> + Send
where
    S: Stream<Item = GenerationEvent> + Send,
{
    futures::stream::once(async move { Frame::Start { id } }).chain(events.map(Frame::from))
}

/// Aggregated non-streaming reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChatResult {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
}

/// Fold a session's events into one reply, or the generation error.
pub async fn collect<S>(events: S) -> Result<ChatResult, String>
where
    S: Stream<Item = GenerationEvent>,
{
    let mut events = std::pin::pin!(events);
    let mut result = ChatResult::default();

    while let Some(event) = events.next().await {
        match event {
            GenerationEvent::Content(text) => result.content.push_str(&text),
            GenerationEvent::ToolInvoked(invocation) => result.tool_calls.push(invocation.into()),
            GenerationEvent::ToolResult(tool_result) => {
                result.content.push_str(&annotation(&tool_result))
            }
            GenerationEvent::Error(error) => return Err(error),
            GenerationEvent::End => break,
        }
    }
    Ok(result)
}
