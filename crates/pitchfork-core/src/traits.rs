use std::future::Future;

use crate::error::AppError;
use crate::models::{Location, RawContent};

/// Retrieves the raw content of one document.
///
/// Implementations make exactly one outbound request per call and never retry.
pub trait Fetcher: Send + Sync + Clone {
    fn fetch(
        &self,
        location: &Location,
    ) -> impl Future<Output = Result<RawContent, AppError>> + Send;
}

/// Builds a structured record from fetched content.
///
/// Must be a pure function of its input: no hidden state, and a failure never
/// yields a partially filled record.
pub trait Extractor: Send + Sync + Clone {
    type Record: Send + 'static;

    fn extract(&self, content: &RawContent) -> Result<Self::Record, AppError>;
}

/// Enumerates the locations an aggregation run should fetch.
pub trait LocationSource: Send + Sync {
    fn locations(&self) -> impl Future<Output = Result<Vec<Location>, AppError>> + Send;
}

/// A fixed list of locations, for callers that already know what to fetch.
#[derive(Debug, Clone, Default)]
pub struct StaticLocations(pub Vec<Location>);

impl LocationSource for StaticLocations {
    async fn locations(&self) -> Result<Vec<Location>, AppError> {
        Ok(self.0.clone())
    }
}
