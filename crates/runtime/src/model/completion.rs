//! Streaming client for an OpenAI-compatible `/v1/completions` server
//! (llama.cpp `llama-server`, vLLM, and similar).

use std::time::Duration;

use eventsource_stream::{EventStreamError, Eventsource};
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use super::{GenerationOptions, ModelError, TokenSource, TokenStream};

const HEALTH_TIMEOUT: Duration = Duration::from_secs(2);
const DONE_SENTINEL: &str = "[DONE]";

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
    temperature: f32,
    stop: &'a [String],
    stream: bool,
}

/// One streamed `data:` payload. Servers disagree on the shape, so accept
/// the common ones.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StreamChunk {
    Choices { choices: Vec<Choice> },
    Content {
        content: String,
        #[serde(default)]
        stop: bool,
    },
    Text { text: String },
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    delta: Option<Delta>,
}

#[derive(Debug, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

/// A decoded `data:` payload.
#[derive(Debug, PartialEq)]
struct Decoded {
    fragment: String,
    done: bool,
}

fn decode(data: &str) -> Result<Decoded, ModelError> {
    if data == DONE_SENTINEL {
        return Ok(Decoded {
            fragment: String::new(),
            done: true,
        });
    }

    let chunk: StreamChunk = serde_json::from_str(data)
        .map_err(|e| ModelError::InvalidResponse(format!("{e}: {data}")))?;

    Ok(match chunk {
        StreamChunk::Choices { choices } => Decoded {
            fragment: choices
                .into_iter()
                .next()
                .and_then(|c| c.delta.and_then(|d| d.content).or(c.text))
                .unwrap_or_default(),
            done: false,
        },
        StreamChunk::Content { content, stop } => Decoded {
            fragment: content,
            done: stop,
        },
        StreamChunk::Text { text } => Decoded {
            fragment: text,
            done: false,
        },
    })
}

fn stream_error(e: EventStreamError<reqwest::Error>) -> ModelError {
    match e {
        EventStreamError::Transport(e) => ModelError::Network(e.without_url().to_string()),
        other => ModelError::InvalidResponse(other.to_string()),
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ModelError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ModelError::Api(format!("{status}: {body}")))
}

/// Builder for [`CompletionBackend`].
#[derive(Debug, Clone)]
pub struct CompletionBackendBuilder {
    base_url: String,
    model: String,
    client: Option<reqwest::Client>,
}

impl CompletionBackendBuilder {
    /// Model name sent with each request.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Use a preconfigured HTTP client.
    pub fn client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn build(self) -> CompletionBackend {
        CompletionBackend {
            base_url: self.base_url.trim_end_matches('/').to_string(),
            model: self.model,
            client: self.client.unwrap_or_default(),
        }
    }
}

/// Token source backed by a local model server.
#[derive(Debug, Clone)]
pub struct CompletionBackend {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl CompletionBackend {
    pub fn builder(base_url: impl Into<String>) -> CompletionBackendBuilder {
        CompletionBackendBuilder {
            base_url: base_url.into(),
            model: String::new(),
            client: None,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl TokenSource for CompletionBackend {
    fn generate<'a>(&'a self, prompt: &'a str, options: &'a GenerationOptions) -> TokenStream<'a> {
        Box::pin(async_stream::try_stream! {
            let request = CompletionRequest {
                model: &self.model,
                prompt,
                max_tokens: options.max_tokens,
                temperature: options.temperature,
                stop: &options.stop,
                stream: true,
            };

            let response = self
                .client
                .post(format!("{}/v1/completions", self.base_url))
                .json(&request)
                .send()
                .await
                .map_err(|e| ModelError::Network(e.without_url().to_string()))?;

            let response = ensure_success(response).await?;
            let mut events = response.bytes_stream().eventsource();

            while let Some(event) = events.next().await {
                let event = event.map_err(stream_error)?;
                if event.data.is_empty() {
                    continue;
                }
                let decoded = decode(&event.data)?;
                if !decoded.fragment.is_empty() {
                    yield decoded.fragment;
                }
                if decoded.done {
                    break;
                }
            }
        })
    }

    async fn is_reachable(&self) -> bool {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await;
        matches!(response, Ok(r) if r.status().is_success())
    }

    fn describe(&self) -> String {
        format!("{} @ {}", self.model, self.base_url)
    }
}
