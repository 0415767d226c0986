//! Test utilities: mock implementations of the core traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::aggregate::{AggregateEvent, AggregateReporter, AggregateState};
use crate::error::AppError;
use crate::models::{Location, RawContent};
use crate::traits::{Extractor, Fetcher, LocationSource};

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

#[derive(Default)]
struct FetcherState {
    bodies: HashMap<String, String>,
    /// Errors are handed out once; a second fetch of the same path succeeds.
    errors: HashMap<String, AppError>,
    delays: HashMap<String, Duration>,
    fetched: Vec<Location>,
}

/// Mock fetcher serving canned bodies per location.
///
/// Locations without a configured body get [`MockFetcher::default_body`].
#[derive(Clone, Default)]
pub struct MockFetcher {
    state: Arc<Mutex<FetcherState>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Body returned for a location nobody configured.
    pub fn default_body(location: &Location) -> String {
        format!("<html><body>{location}</body></html>")
    }

    pub fn with_body(self, path: &str, body: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .bodies
            .insert(path.to_string(), body.to_string());
        self
    }

    pub fn fail_on(self, path: &str, error: AppError) -> Self {
        self.state
            .lock()
            .unwrap()
            .errors
            .insert(path.to_string(), error);
        self
    }

    /// Sleep before answering for `path`.
    pub fn with_delay(self, path: &str, delay: Duration) -> Self {
        self.state
            .lock()
            .unwrap()
            .delays
            .insert(path.to_string(), delay);
        self
    }

    /// Every location fetched so far, in call order.
    pub fn fetched(&self) -> Vec<Location> {
        self.state.lock().unwrap().fetched.clone()
    }

    /// Number of live clones of this fetcher.
    pub fn live_handles(&self) -> usize {
        Arc::strong_count(&self.state)
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, location: &Location) -> Result<RawContent, AppError> {
        let delay = {
            let mut state = self.state.lock().unwrap();
            state.fetched.push(location.clone());
            state.delays.get(location.as_str()).copied()
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        if let Some(error) = state.errors.remove(location.as_str()) {
            return Err(error);
        }
        let body = state
            .bodies
            .get(location.as_str())
            .cloned()
            .unwrap_or_else(|| Self::default_body(location));

        Ok(RawContent::new(
            format!("http://mock.test{location}"),
            body,
        ))
    }
}

// ---------------------------------------------------------------------------
// MockExtractor
// ---------------------------------------------------------------------------

/// Mock extractor whose record is the fetched body itself.
#[derive(Clone, Default)]
pub struct MockExtractor {
    rejected: Arc<HashSet<String>>,
}

impl MockExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails extraction for any body equal to `body`.
    pub fn rejecting(body: &str) -> Self {
        Self {
            rejected: Arc::new(HashSet::from([body.to_string()])),
        }
    }
}

impl Extractor for MockExtractor {
    type Record = String;

    fn extract(&self, content: &RawContent) -> Result<String, AppError> {
        if content.is_empty() {
            return Err(AppError::ExtractionError("empty content".into()));
        }
        if self.rejected.contains(&content.body) {
            return Err(AppError::ExtractionError(format!(
                "rejected body from {}",
                content.url
            )));
        }
        Ok(content.body.clone())
    }
}

// ---------------------------------------------------------------------------
// MockLocationSource
// ---------------------------------------------------------------------------

/// Mock location source returning a fixed list or an error.
#[derive(Clone)]
pub struct MockLocationSource {
    locations: Vec<Location>,
    error: Arc<Mutex<Option<AppError>>>,
    pub calls: Arc<Mutex<usize>>,
}

impl MockLocationSource {
    pub fn new(locations: Vec<Location>) -> Self {
        Self {
            locations,
            error: Arc::new(Mutex::new(None)),
            calls: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_error(error: AppError) -> Self {
        Self {
            locations: Vec::new(),
            error: Arc::new(Mutex::new(Some(error))),
            calls: Arc::new(Mutex::new(0)),
        }
    }
}

impl LocationSource for MockLocationSource {
    async fn locations(&self) -> Result<Vec<Location>, AppError> {
        *self.calls.lock().unwrap() += 1;
        if let Some(e) = self.error.lock().unwrap().take() {
            return Err(e);
        }
        Ok(self.locations.clone())
    }
}

// ---------------------------------------------------------------------------
// RecordingReporter
// ---------------------------------------------------------------------------

/// Reporter that records state transitions and dispatch counts.
#[derive(Default)]
pub struct RecordingReporter {
    transitions: Mutex<Vec<(AggregateState, AggregateState)>>,
    dispatched: Mutex<usize>,
    failures: Mutex<Vec<(Location, bool)>>,
}

impl RecordingReporter {
    pub fn transitions(&self) -> Vec<(AggregateState, AggregateState)> {
        self.transitions.lock().unwrap().clone()
    }

    pub fn dispatched(&self) -> usize {
        *self.dispatched.lock().unwrap()
    }

    /// Failed locations with whether each became the terminal error.
    pub fn failures(&self) -> Vec<(Location, bool)> {
        self.failures.lock().unwrap().clone()
    }
}

impl AggregateReporter for RecordingReporter {
    fn report(&self, event: AggregateEvent<'_>) {
        match event {
            AggregateEvent::StateChanged { from, to } => {
                self.transitions.lock().unwrap().push((from, to));
            }
            AggregateEvent::TaskDispatched { .. } => {
                *self.dispatched.lock().unwrap() += 1;
            }
            AggregateEvent::TaskFailed {
                location, first, ..
            } => {
                self.failures
                    .lock()
                    .unwrap()
                    .push((location.clone(), first));
            }
            _ => {}
        }
    }
}
