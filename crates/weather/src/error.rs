use thiserror::Error;

/// Weather lookup failures.
///
/// The display text of each variant is shown to the end user verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum Error {
    /// The location was not of the form `City, CC`.
    #[error("Location must be 'City, CC' (e.g. 'San Juan, PR')")]
    InvalidFormat,

    /// The region part was not a two-letter code.
    #[error("Country/state code must be two letters")]
    InvalidRegion,

    /// The geocoding request did not complete.
    #[error("Geocoding failed: {0}")]
    Geocoding(String),

    /// The provider knows no place by that name.
    #[error("Location not found: {0}")]
    NotFound(String),

    /// The current-conditions request did not complete.
    #[error("Weather request failed: {0}")]
    Conditions(String),

    /// The provider answered with a body we could not interpret.
    #[error("Unexpected response format from OpenWeather")]
    UnexpectedFormat,
}

pub type Result<T> = std::result::Result<T, Error>;
