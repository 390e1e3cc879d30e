//! Token source boundary and the exclusive model handle.

mod completion;
pub mod errors;
mod scripted;
pub mod types;

use std::future::Future;
use std::ops::Deref;
use std::sync::Arc;

use futures::stream::BoxStream;
use tokio::sync::{Mutex, OwnedMutexGuard};

pub use completion::{CompletionBackend, CompletionBackendBuilder};
pub use errors::ModelError;
pub use scripted::ScriptedTokens;
pub use types::{GenerationOptions, Message, Role, STOP_SEQUENCES};

/// Text fragments as the model produces them. Ends on completion or the
/// first error.
pub type TokenStream<'a> = BoxStream<'a, Result<String, ModelError>>;

/// Trait for anything that turns a prompt into a stream of text fragments.
///
/// Implementations are not expected to handle concurrent generations; the
/// orchestrator serializes access through [`ModelHandle`].
pub trait TokenSource: Send + Sync {
    /// Start generating a continuation of `prompt`.
    fn generate<'a>(&'a self, prompt: &'a str, options: &'a GenerationOptions) -> TokenStream<'a>;

    /// Whether the model is reachable right now.
    fn is_reachable(&self) -> impl Future<Output = bool> + Send;

    /// Short human-readable identity, used in logs and health output.
    fn describe(&self) -> String;
}

/// Shared handle to a single model.
///
/// At most one generation runs at a time: [`acquire`](Self::acquire) waits
/// for the previous holder to drop its guard. Probing and describing the
/// model do not take the lock.
pub struct ModelHandle<M> {
    model: Arc<M>,
    permit: Arc<Mutex<()>>,
}

impl<M> Clone for ModelHandle<M> {
    fn clone(&self) -> Self {
        Self {
            model: Arc::clone(&self.model),
            permit: Arc::clone(&self.permit),
        }
    }
}

impl<M: TokenSource> ModelHandle<M> {
    pub fn new(model: M) -> Self {
        Self {
            model: Arc::new(model),
            permit: Arc::new(Mutex::new(())),
        }
    }

    /// Wait for exclusive use of the model.
    pub async fn acquire(&self) -> ModelGuard<M> {
        let permit = Arc::clone(&self.permit).lock_owned().await;
        ModelGuard {
            model: Arc::clone(&self.model),
            _permit: permit,
        }
    }

    /// True while a generation holds the model.
    pub fn is_busy(&self) -> bool {
        self.permit.try_lock().is_err()
    }

    pub async fn is_reachable(&self) -> bool {
        self.model.is_reachable().await
    }

    pub fn describe(&self) -> String {
        self.model.describe()
    }
}

/// Exclusive access to the model, released on drop.
pub struct ModelGuard<M> {
    model: Arc<M>,
    _permit: OwnedMutexGuard<()>,
}

impl<M> Deref for ModelGuard<M> {
    type Target = M;

    fn deref(&self) -> &M {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn guard_marks_model_busy_until_dropped() {
        let handle = ModelHandle::new(ScriptedTokens::new(["a"]));
        assert!(!handle.is_busy());

        let guard = handle.acquire().await;
        assert!(handle.is_busy());
        assert!(handle.clone().is_busy());

        drop(guard);
        assert!(!handle.is_busy());
    }

    #[tokio::test]
    async fn second_acquire_waits_for_first() {
        let handle = ModelHandle::new(ScriptedTokens::new(["a"]));
        let guard = handle.acquire().await;

        let waiter = {
            let handle = handle.clone();
            tokio::spawn(async move {
                let _guard = handle.acquire().await;
            })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.await.unwrap();
        assert!(!handle.is_busy());
    }
}
