//! Deterministic token source for tests and offline runs.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{GenerationOptions, ModelError, TokenSource, TokenStream};

/// Replays a fixed list of fragments, optionally failing part-way.
///
/// Clones share one prompt log.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTokens {
    fragments: Vec<String>,
    failure: Option<(usize, String)>,
    delay: Option<Duration>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedTokens {
    pub fn new<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fragments: fragments.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Yield `message` as an API error after the first `count` fragments.
    pub fn failing_after(mut self, count: usize, message: impl Into<String>) -> Self {
        self.failure = Some((count, message.into()));
        self
    }

    /// Sleep before each fragment.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every prompt this source has been asked to continue, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

impl TokenSource for ScriptedTokens {
    fn generate<'a>(&'a self, prompt: &'a str, _options: &'a GenerationOptions) -> TokenStream<'a> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        let emitted = match &self.failure {
            Some((count, _)) => (*count).min(self.fragments.len()),
            None => self.fragments.len(),
        };

        Box::pin(async_stream::stream! {
            for fragment in &self.fragments[..emitted] {
                if let Some(delay) = self.delay {
                    tokio::time::sleep(delay).await;
                }
                yield Ok(fragment.clone());
            }
            if let Some((_, message)) = &self.failure {
                yield Err(ModelError::Api(message.clone()));
            }
        })
    }

    async fn is_reachable(&self) -> bool {
        true
    }

    fn describe(&self) -> String {
        format!("scripted({} fragments)", self.fragments.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn replays_fragments_and_records_prompt() {
        let source = ScriptedTokens::new(["Hel", "lo"]);
        let options = GenerationOptions::default();
        let out: Vec<_> = source.generate("hi", &options).collect().await;

        assert_eq!(out, vec![Ok("Hel".to_string()), Ok("lo".to_string())]);
        assert_eq!(source.prompts(), vec!["hi".to_string()]);
    }

    #[tokio::test]
    async fn fails_after_count() {
        let source = ScriptedTokens::new(["a", "b", "c"]).failing_after(1, "boom");
        let options = GenerationOptions::default();
        let out: Vec<_> = source.generate("p", &options).collect().await;

        assert_eq!(
            out,
            vec![Ok("a".to_string()), Err(ModelError::Api("boom".into()))]
        );
    }
}
