//! Concurrent fetch → extract → aggregate pipeline.
//!
//! ```text
//! Aggregator ──locations()──> LocationSource
//!     │
//!     ├─ dispatch ──spawn──> Task Unit (fetch → extract) ──┐
//!     │              ...                                   ├──> mpsc ──> Collector
//!     │              spawn──> Task Unit (fetch → extract) ──┘               │
//!     │                                                                    │
//!     └────────────── waits for outstanding == 0 <──────────────────────────┘
//! ```
//!
//! Every dispatched task writes exactly one [`TaskResult`]. The [`Collector`]
//! is the only reader and the only owner of the outstanding count; it drains
//! every result even after a failure so no task is ever left blocked on a
//! full channel.

use std::fmt;

use tokio::sync::mpsc;

use crate::error::AppError;
use crate::models::{AggregateOutcome, Location};
use crate::traits::{Extractor, Fetcher, LocationSource};

/// Result channel capacity used when none is configured.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 5;

/// Tuning for an [`Aggregator`].
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Upper bound on the result channel buffer. The effective capacity is
    /// `min(expected, channel_capacity)`, never below 1.
    pub channel_capacity: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl AggregatorConfig {
    pub fn new(channel_capacity: usize) -> Self {
        Self { channel_capacity }
    }

    fn capacity_for(&self, expected: usize) -> usize {
        expected.min(self.channel_capacity).max(1)
    }
}

/// Lifecycle of one aggregation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateState {
    /// No work started.
    Idle,
    /// Locations enumerated, task units being spawned.
    Dispatching,
    /// Waiting for the outstanding count to reach zero.
    Collecting,
    /// Terminal. The result channel has been closed.
    Done,
}

impl AggregateState {
    pub fn can_transition_to(self, next: AggregateState) -> bool {
        matches!(
            (self, next),
            (AggregateState::Idle, AggregateState::Dispatching)
                | (AggregateState::Idle, AggregateState::Done)
                | (AggregateState::Dispatching, AggregateState::Collecting)
                | (AggregateState::Collecting, AggregateState::Done)
        )
    }
}

impl fmt::Display for AggregateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateState::Idle => write!(f, "idle"),
            AggregateState::Dispatching => write!(f, "dispatching"),
            AggregateState::Collecting => write!(f, "collecting"),
            AggregateState::Done => write!(f, "done"),
        }
    }
}

/// What a single task unit reports back.
#[derive(Debug)]
pub struct TaskResult<R> {
    pub location: Location,
    pub result: Result<R, AppError>,
}

/// Events emitted during an aggregation run for monitoring/logging.
#[derive(Debug, Clone)]
pub enum AggregateEvent<'a> {
    StateChanged {
        from: AggregateState,
        to: AggregateState,
    },
    Enumerated {
        count: usize,
    },
    EnumerationFailed {
        error: &'a AppError,
    },
    TaskDispatched {
        location: &'a Location,
    },
    RecordCollected {
        location: &'a Location,
        outstanding: usize,
    },
    TaskFailed {
        location: &'a Location,
        error: &'a AppError,
        /// True if this failure became the run's terminal error.
        first: bool,
        outstanding: usize,
    },
    Finished {
        records: usize,
        failed: bool,
    },
}

/// Trait for receiving aggregation events (decoupled logging).
pub trait AggregateReporter: Send + Sync {
    fn report(&self, event: AggregateEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl AggregateReporter for TracingReporter {
    fn report(&self, event: AggregateEvent<'_>) {
        match event {
            AggregateEvent::StateChanged { from, to } => {
                tracing::debug!(%from, %to, "Aggregator state changed");
            }
            AggregateEvent::Enumerated { count } => {
                tracing::info!(%count, "Enumerated locations");
            }
            AggregateEvent::EnumerationFailed { error } => {
                tracing::error!(%error, "Location enumeration failed");
            }
            AggregateEvent::TaskDispatched { location } => {
                tracing::debug!(%location, "Task dispatched");
            }
            AggregateEvent::RecordCollected {
                location,
                outstanding,
            } => {
                tracing::info!(%location, %outstanding, "Record collected");
            }
            AggregateEvent::TaskFailed {
                location,
                error,
                first,
                outstanding,
            } => {
                tracing::warn!(%location, %error, %first, %outstanding, "Task failed");
            }
            AggregateEvent::Finished { records, failed } => {
                tracing::info!(%records, %failed, "Aggregation finished");
            }
        }
    }
}

/// Fetch one location, extract it, and write exactly one result.
///
/// Fetch and extraction failures are written like any other result. If the
/// collector has already gone away the result is dropped with a warning.
pub async fn run_task<F, X>(
    location: Location,
    fetcher: F,
    extractor: X,
    results: mpsc::Sender<TaskResult<X::Record>>,
) where
    F: Fetcher,
    X: Extractor,
{
    let result = match fetcher.fetch(&location).await {
        Ok(content) => extractor.extract(&content),
        Err(e) => Err(e),
    };

    if let Err(mpsc::error::SendError(unsent)) =
        results.send(TaskResult { location, result }).await
    {
        tracing::warn!(location = %unsent.location, "Collector closed, dropping task result");
    }
}

/// Sole reader of the result channel.
///
/// Owns the outstanding count: it is set once from the dispatcher's expected
/// count and decremented exactly once per drained result.
pub struct Collector<R> {
    results: mpsc::Receiver<TaskResult<R>>,
    outstanding: usize,
    records: Vec<R>,
    first_error: Option<AppError>,
}

impl<R> Collector<R> {
    pub fn new(results: mpsc::Receiver<TaskResult<R>>, expected: usize) -> Self {
        Self {
            results,
            outstanding: expected,
            records: Vec::with_capacity(expected),
            first_error: None,
        }
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// Drain until the outstanding count reaches zero, then close the channel.
    pub async fn drain<RP: AggregateReporter>(mut self, reporter: &RP) -> AggregateOutcome<R> {
        while self.outstanding > 0 {
            match self.results.recv().await {
                Some(task) => self.accept(task, reporter),
                None => {
                    // Every sender is gone but results are missing.
                    let lost = self.outstanding;
                    self.outstanding = 0;
                    tracing::error!(%lost, "Result channel closed with results outstanding");
                    self.first_error.get_or_insert(AppError::TaskLost(lost));
                }
            }
        }

        self.results.close();
        AggregateOutcome::new(self.records, self.first_error)
    }

    fn accept<RP: AggregateReporter>(&mut self, task: TaskResult<R>, reporter: &RP) {
        self.outstanding -= 1;
        let TaskResult { location, result } = task;

        match result {
            Ok(record) => {
                self.records.push(record);
                reporter.report(AggregateEvent::RecordCollected {
                    location: &location,
                    outstanding: self.outstanding,
                });
            }
            Err(error) => {
                let first = self.first_error.is_none();
                reporter.report(AggregateEvent::TaskFailed {
                    location: &location,
                    error: &error,
                    first,
                    outstanding: self.outstanding,
                });
                if first {
                    self.first_error = Some(error);
                }
            }
        }
    }
}

/// Tracks the run's state and reports each transition.
struct RunState<'a, RP> {
    state: AggregateState,
    reporter: &'a RP,
}

impl<'a, RP: AggregateReporter> RunState<'a, RP> {
    fn new(reporter: &'a RP) -> Self {
        Self {
            state: AggregateState::Idle,
            reporter,
        }
    }

    fn advance(&mut self, to: AggregateState) {
        debug_assert!(
            self.state.can_transition_to(to),
            "invalid aggregator transition {} -> {}",
            self.state,
            to
        );
        self.reporter.report(AggregateEvent::StateChanged {
            from: self.state,
            to,
        });
        self.state = to;
    }
}

/// Public entry point of the pipeline: enumerate, dispatch, collect.
///
/// Generic over the fetcher and extractor so the same pipeline serves any
/// record type, and so tests can inject mocks instead of real HTTP.
pub struct Aggregator<F, X>
where
    F: Fetcher,
    X: Extractor,
{
    fetcher: F,
    extractor: X,
    config: AggregatorConfig,
}

impl<F, X> Aggregator<F, X>
where
    F: Fetcher + 'static,
    X: Extractor + 'static,
{
    pub fn new(fetcher: F, extractor: X) -> Self {
        Self::with_config(fetcher, extractor, AggregatorConfig::default())
    }

    pub fn with_config(fetcher: F, extractor: X, config: AggregatorConfig) -> Self {
        Self {
            fetcher,
            extractor,
            config,
        }
    }

    /// Run the pipeline, logging through `tracing`.
    pub async fn aggregate<S: LocationSource>(&self, source: &S) -> AggregateOutcome<X::Record> {
        self.aggregate_with(source, &TracingReporter).await
    }

    /// Run the pipeline, sending events to `reporter`.
    ///
    /// 1. Enumerate locations (failure ends the run with zero records)
    /// 2. Spawn one task unit per location
    /// 3. Drain results until none are outstanding
    pub async fn aggregate_with<S, RP>(&self, source: &S, reporter: &RP) -> AggregateOutcome<X::Record>
    where
        S: LocationSource,
        RP: AggregateReporter,
    {
        let mut run = RunState::new(reporter);

        let locations = match source.locations().await {
            Ok(locations) => locations,
            Err(e) => {
                reporter.report(AggregateEvent::EnumerationFailed { error: &e });
                run.advance(AggregateState::Done);
                let error = match e {
                    AppError::Enumeration(_) => e,
                    other => AppError::Enumeration(Box::new(other)),
                };
                return AggregateOutcome::failed(error);
            }
        };
        reporter.report(AggregateEvent::Enumerated {
            count: locations.len(),
        });

        run.advance(AggregateState::Dispatching);
        let (results, expected) = self.dispatch(locations, reporter);

        run.advance(AggregateState::Collecting);
        let outcome = Collector::new(results, expected).drain(reporter).await;

        run.advance(AggregateState::Done);
        reporter.report(AggregateEvent::Finished {
            records: outcome.records.len(),
            failed: outcome.error.is_some(),
        });

        outcome
    }

    /// Spawn one task unit per location on a shared result channel.
    ///
    /// Returns the receiving half and the number of results to expect. No
    /// sender outlives this call except those owned by the spawned tasks.
    pub fn dispatch<RP: AggregateReporter>(
        &self,
        locations: Vec<Location>,
        reporter: &RP,
    ) -> (mpsc::Receiver<TaskResult<X::Record>>, usize) {
        let (tx, rx) = mpsc::channel(self.config.capacity_for(locations.len()));
        let mut expected = 0;

        for location in locations {
            expected += 1;
            reporter.report(AggregateEvent::TaskDispatched {
                location: &location,
            });
            tokio::spawn(run_task(
                location,
                self.fetcher.clone(),
                self.extractor.clone(),
                tx.clone(),
            ));
        }

        (rx, expected)
    }
}
