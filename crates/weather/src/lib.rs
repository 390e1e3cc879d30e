//! Current-conditions lookup against the OpenWeather API.
//!
//! A lookup is two sequential, individually time-bounded requests: the
//! geocoding endpoint resolves `"City,CC"` to coordinates, then the
//! current-weather endpoint (imperial units) is queried for those
//! coordinates. Every failure is mapped to a distinct [`Error`] variant whose
//! text is suitable for showing to the user.
//!
//! ```no_run
//! use weather::{Client, Config, Location};
//!
//! # async fn example() -> weather::Result<()> {
//! let client = Client::new(Config::new("api-key"));
//! let report = client.current(&Location::parse("Paris, FR")?).await?;
//! println!("{report}");
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod location;
mod report;

pub use client::{CURRENT_URL, Client, Config, DEFAULT_TIMEOUT, GEO_URL};
pub use error::{Error, Result};
pub use location::Location;
pub use report::WeatherReport;
