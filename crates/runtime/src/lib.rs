//! Cumulus runtime: generation sessions, invocation detection and tool
//! dispatch.
//!
//! # Overview
//!
//! The runtime is organized around these concepts:
//!
//! - **TokenSource**: a trait abstracting the model that turns a prompt into
//!   a stream of text fragments. [`ModelHandle`] serializes access to it.
//! - **Extraction**: [`extract`] finds one tool invocation in free-form
//!   model output and returns the surrounding narrative.
//! - **ToolHost**: a trait for executing invocations, either in-process
//!   ([`WeatherTool`]) or through a tool server ([`McpToolHost`]).
//! - **Orchestrator**: runs one request through the session lifecycle and
//!   emits [`GenerationEvent`]s.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use futures::StreamExt;
//! use runtime::{ChatRequest, CompletionBackend, Message, ModelHandle, Orchestrator, WeatherTool};
//!
//! # async fn example() {
//! let model = CompletionBackend::builder("http://127.0.0.1:8080")
//!     .model("gemma-2-2b-it")
//!     .build();
//! let tools = WeatherTool::new(weather::Client::new(weather::Config::new("api-key")));
//! let orchestrator = Arc::new(Orchestrator::new(ModelHandle::new(model), tools));
//!
//! let mut events = orchestrator.spawn(ChatRequest {
//!     messages: vec![Message::user("Weather in Paris, FR?")],
//!     tools_enabled: true,
//! });
//! while let Some(event) = events.next().await {
//!     println!("{event:?}");
//! }
//! # }
//! ```

mod event;
pub mod extract;
pub mod model;
mod orchestrator;
mod prompt;
mod session;
pub mod tools;

pub use event::GenerationEvent;
pub use extract::{Detection, extract};
pub use model::{
    CompletionBackend, GenerationOptions, Message, ModelError, ModelHandle, Role, ScriptedTokens,
    TokenSource, TokenStream,
};
pub use orchestrator::{ChatRequest, EVENT_BUFFER, Orchestrator, ScanMode, TOOLS_DISABLED_NOTICE};
pub use prompt::{DEFAULT_SYSTEM_PROMPT, PromptFormatter, TOOLS_DISABLED_NOTE};
pub use session::{Session, SessionState};
pub use tools::{
    Invocation, McpError, McpToolHost, ToolDispatcher, ToolError, ToolHost, ToolResult,
    ToolServerCommand, ToolSpec, WeatherTool,
};
