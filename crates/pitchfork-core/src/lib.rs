pub mod aggregate;
pub mod error;
pub mod models;
#[cfg(any(test, feature = "testutil"))]
pub mod testutil;
pub mod traits;

pub use aggregate::{Aggregator, AggregatorConfig};
pub use error::AppError;
pub use models::{AggregateOutcome, Location, NewsArticle, RawContent, Review};
pub use traits::{Extractor, Fetcher, LocationSource};
