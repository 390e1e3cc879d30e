//! `City, CC` location parsing.

use crate::{Error, Result};

/// A place name qualified by a two-letter country or state code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub city: String,
    pub region: String,
}

impl Location {
    /// Parse `"City, CC"`. The region code is normalized to upper case.
    pub fn parse(input: &str) -> Result<Self> {
        let (city, region) = input.trim().split_once(',').ok_or(Error::InvalidFormat)?;
        let city = city.trim();
        let region = region.trim();

        if city.is_empty() {
            return Err(Error::InvalidFormat);
        }
        if region.chars().count() != 2 || !region.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(Error::InvalidRegion);
        }

        Ok(Self {
            city: city.to_string(),
            region: region.to_ascii_uppercase(),
        })
    }

    /// Geocoding query string (`City,CC`).
    pub fn query(&self) -> String {
        format!("{},{}", self.city, self.region)
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}", self.city, self.region)
    }
}
