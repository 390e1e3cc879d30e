//! Drives one generation request from prompt to terminal event.
//!
//! A session moves through `StreamingRaw -> Detected -> Dispatching ->
//! Resuming -> Done`, or straight to `Done` when the model calls no tool.
//! Any failure while generating ends it with a single
//! [`GenerationEvent::Error`]. If the event consumer goes away the session
//! is abandoned at the next step and the model is released.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{Span, debug, error, info, instrument};

use crate::event::GenerationEvent;
use crate::model::{GenerationOptions, Message, ModelError, ModelHandle, TokenSource, TokenStream};
use crate::prompt::PromptFormatter;
use crate::session::{Session, SessionState};
use crate::tools::{ToolDispatcher, ToolHost};

/// Capacity of the per-session event channel.
pub const EVENT_BUFFER: usize = 32;

/// Sent in place of a tool call when the request has tools off.
pub const TOOLS_DISABLED_NOTICE: &str = "\n\nSorry, tools are not currently enabled. \
                                         Please enable the weather tool to use this feature.";

/// When the buffer is scanned for an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    /// Once, after the model finishes.
    #[default]
    Completion,
    /// After every fragment; generation stops as soon as an invocation is
    /// complete.
    Fragment,
}

/// One generation request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    pub tools_enabled: bool,
}

enum Interrupt {
    Model(ModelError),
    Disconnected,
}

impl From<ModelError> for Interrupt {
    fn from(e: ModelError) -> Self {
        Self::Model(e)
    }
}

/// Event sink for one session. A failed send means the consumer is gone.
struct Outbox {
    tx: mpsc::Sender<GenerationEvent>,
}

impl Outbox {
    async fn send(&self, event: GenerationEvent) -> Result<(), Interrupt> {
        self.tx.send(event).await.map_err(|_| Interrupt::Disconnected)
    }

    async fn closed(&self) {
        self.tx.closed().await
    }

    /// Deliver `text` one word at a time.
    async fn words(&self, text: &str) -> Result<(), Interrupt> {
        for word in text.split_whitespace() {
            self.send(GenerationEvent::Content(format!("{word} "))).await?;
        }
        Ok(())
    }
}

/// Owns the model handle and tool host shared by every session.
pub struct Orchestrator<M, T> {
    model: ModelHandle<M>,
    tools: T,
    prompt: PromptFormatter,
    options: GenerationOptions,
    scan: ScanMode,
    token_timeout: Option<Duration>,
}

impl<M, T> Orchestrator<M, T>
where
    M: TokenSource + 'static,
    T: ToolHost + 'static,
{
    pub fn new(model: ModelHandle<M>, tools: T) -> Self {
        Self {
            model,
            tools,
            prompt: PromptFormatter::default(),
            options: GenerationOptions::default(),
            scan: ScanMode::default(),
            token_timeout: None,
        }
    }

    pub fn with_prompt(mut self, prompt: PromptFormatter) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_scan(mut self, scan: ScanMode) -> Self {
        self.scan = scan;
        self
    }

    /// Fail the session if the model goes this long without a fragment.
    pub fn with_token_timeout(mut self, timeout: Duration) -> Self {
        self.token_timeout = Some(timeout);
        self
    }

    pub fn model(&self) -> &ModelHandle<M> {
        &self.model
    }

    pub fn tools(&self) -> &T {
        &self.tools
    }

    /// Run `request` on its own task, returning its events.
    ///
    /// Dropping the stream abandons the session.
    pub fn spawn(self: &Arc<Self>, request: ChatRequest) -> ReceiverStream<GenerationEvent> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let this = Arc::clone(self);
        tokio::spawn(async move { this.run(request, tx).await });
        ReceiverStream::new(rx)
    }

    /// Run `request` to completion, sending events to `tx`.
    #[instrument(
        name = "session",
        skip_all,
        fields(id = tracing::field::Empty, tools_enabled = request.tools_enabled)
    )]
    pub async fn run(&self, request: ChatRequest, tx: mpsc::Sender<GenerationEvent>) {
        let mut session = Session::new(request.tools_enabled);
        Span::current().record("id", tracing::field::display(session.id));
        let outbox = Outbox { tx };

        let terminal = match self.drive(&mut session, &request.messages, &outbox).await {
            Ok(()) => {
                session.transition(SessionState::Done);
                info!("session complete");
                GenerationEvent::End
            }
            Err(Interrupt::Model(e)) => {
                session.transition(SessionState::Failed);
                error!(error = %e, "generation failed");
                GenerationEvent::Error(format!("Generation error: {e}"))
            }
            Err(Interrupt::Disconnected) => {
                session.transition(SessionState::Failed);
                info!(state = ?session.state(), "consumer went away, session abandoned");
                return;
            }
        };

        let _ = outbox.send(terminal).await;
    }

    async fn drive(
        &self,
        session: &mut Session,
        messages: &[Message],
        outbox: &Outbox,
    ) -> Result<(), Interrupt> {
        let prompt = self.prompt.format(messages, session.tools_enabled());
        self.generate(session, &prompt, outbox).await?;

        let Some(invocation) = session.detection().map(|d| d.invocation.clone()) else {
            return outbox.words(&session.take_pending()).await;
        };
        session.transition(SessionState::Detected);
        info!(tool = %invocation.name, "invocation detected");
        outbox.words(&session.take_pending()).await?;

        if !session.tools_enabled() {
            debug!("tools disabled, invocation not dispatched");
            return outbox
                .send(GenerationEvent::Content(TOOLS_DISABLED_NOTICE.to_string()))
                .await;
        }

        session.transition(SessionState::Dispatching);
        outbox
            .send(GenerationEvent::ToolInvoked(invocation.clone()))
            .await?;

        let dispatcher = ToolDispatcher::new(&self.tools, session.tools_enabled());
        let result = tokio::select! {
            result = dispatcher.dispatch(&invocation) => result,
            () = outbox.closed() => return Err(Interrupt::Disconnected),
        };

        session.transition(SessionState::Resuming);
        outbox.send(GenerationEvent::ToolResult(result)).await
    }

    /// Pull fragments into the session buffer. The model is held only for
    /// the duration of this call.
    async fn generate(
        &self,
        session: &mut Session,
        prompt: &str,
        outbox: &Outbox,
    ) -> Result<(), Interrupt> {
        let model = tokio::select! {
            model = self.model.acquire() => model,
            () = outbox.closed() => return Err(Interrupt::Disconnected),
        };
        debug!(model = %model.describe(), "model acquired");

        let mut tokens = model.generate(prompt, &self.options);
        loop {
            let next = tokio::select! {
                next = self.next_token(&mut tokens) => next?,
                () = outbox.closed() => return Err(Interrupt::Disconnected),
            };
            let Some(fragment) = next else {
                break;
            };
            session.push(&fragment);

            if self.scan == ScanMode::Fragment && session.detect() {
                debug!("invocation complete, stopping generation early");
                break;
            }
        }

        session.detect();
        Ok(())
    }

    async fn next_token(&self, tokens: &mut TokenStream<'_>) -> Result<Option<String>, ModelError> {
        match self.token_timeout {
            Some(limit) => match tokio::time::timeout(limit, tokens.next()).await {
                Ok(next) => next.transpose(),
                Err(_) => Err(ModelError::Timeout(limit)),
            },
            None => tokens.next().await.transpose(),
        }
    }
}
