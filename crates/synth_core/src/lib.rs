//! Synthetic hourly retail sales.
//!
//! Weather observations become a pleasantness index, a Poisson baseline is
//! thinned by weather and time of day, and the accepted sales are apportioned
//! to salespeople and then to products without creating or losing units.

pub mod apportion;
pub mod calendar;
pub mod daytime;
pub mod distributions;
pub mod error;
pub mod ids;
pub mod locale;
pub mod orchestrator;
pub mod salesperson;
pub mod weather;

#[cfg(feature = "test-helpers")]
pub mod test_helpers;

pub use error::{ConfigError, FetchError, InvariantViolation, SynthError};
pub use ids::{LocaleId, ProductId, RecipientId};
