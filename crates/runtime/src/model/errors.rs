use std::time::Duration;

use thiserror::Error;

/// Errors from the token source.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ModelError {
    /// The model server could not be reached or the connection dropped.
    #[error("network: {0}")]
    Network(String),

    /// The model server answered with an error status.
    #[error("model api: {0}")]
    Api(String),

    /// A streamed chunk could not be decoded.
    #[error("invalid model response: {0}")]
    InvalidResponse(String),

    /// No fragment arrived within the per-token deadline.
    #[error("no token within {0:?}")]
    Timeout(Duration),
}
