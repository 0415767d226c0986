use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Relative path of one document to retrieve.
///
/// Produced by a [`LocationSource`](crate::traits::LocationSource) and never
/// modified afterwards. The fetcher resolves it against its base URL, so
/// absolute URLs and paths carrying a query string are accepted too.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Location(String);

impl Location {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Location {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for Location {
    fn from(path: String) -> Self {
        Self(path)
    }
}

/// A fetched document: the URL it was resolved to plus its body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawContent {
    pub url: String,
    pub body: String,
}

impl RawContent {
    pub fn new(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            body: body.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.body.trim().is_empty()
    }
}

/// Details of one album review.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Review {
    pub artist: String,
    pub album: String,
    pub label: String,
    /// Release year as printed on the page; may be empty.
    pub year: String,
    pub review_date: String,
    pub author: String,
    /// Review body rendered as plain text, one paragraph per line.
    pub review: String,
    pub url: String,
    pub score: f64,
}

/// A headline from the news listing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NewsArticle {
    pub title: String,
    pub url: String,
}

/// Everything an aggregation run produced.
///
/// `records` are in arrival order, which varies between runs. `error` holds
/// the first failure observed; when it is set, `records` is a partial batch.
#[derive(Debug)]
pub struct AggregateOutcome<R> {
    pub records: Vec<R>,
    pub error: Option<AppError>,
}

impl<R> AggregateOutcome<R> {
    pub fn new(records: Vec<R>, error: Option<AppError>) -> Self {
        Self { records, error }
    }

    /// An outcome with no records and a terminal error.
    pub fn failed(error: AppError) -> Self {
        Self {
            records: Vec::new(),
            error: Some(error),
        }
    }

    /// True when every dispatched location produced a record.
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    /// All-or-nothing view: any error discards the partial batch.
    pub fn into_result(self) -> Result<Vec<R>, AppError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.records),
        }
    }
}
