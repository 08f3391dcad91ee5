//! Result collection and reduction
//!
//! Workers append one [`TargetCount`] per claimed target. Once the pool has
//! joined, [`Aggregator::finish`] reduces the collection into a [`Report`].

use crate::error::CountError;
use crate::target::Target;

use std::sync::{Mutex, PoisonError};

/// Outcome for exactly one target
#[derive(Debug)]
pub struct TargetCount {
    pub target: Target,
    pub outcome: Result<u64, CountError>,
}

impl TargetCount {
    pub fn counted(target: Target, count: u64) -> Self {
        Self {
            target,
            outcome: Ok(count),
        }
    }

    pub fn failed(target: Target, error: CountError) -> Self {
        Self {
            target,
            outcome: Err(error),
        }
    }

    /// Display label: the path, or empty for stdin
    pub fn label(&self) -> String {
        self.target.label()
    }

    /// The count, or `None` if the target failed
    pub fn count(&self) -> Option<u64> {
        self.outcome.as_ref().ok().copied()
    }

    pub fn error(&self) -> Option<&CountError> {
        self.outcome.as_ref().err()
    }
}

/// Append-only, thread-safe result list
#[derive(Debug, Default)]
pub struct Aggregator {
    results: Mutex<Vec<TargetCount>>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            results: Mutex::new(Vec::with_capacity(capacity)),
        }
    }

    /// Append one result
    pub fn record(&self, result: TargetCount) {
        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(result);
    }

    /// Number of results recorded so far
    pub(crate) fn len(&self) -> usize {
        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Reduce after every worker has joined
    pub fn finish(self, submitted: usize) -> Report {
        let results = self
            .results
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        Report::new(results, submitted)
    }
}

/// Final, single-threaded view of a run
#[derive(Debug)]
pub struct Report {
    results: Vec<TargetCount>,
    submitted: usize,
    total: u64,
    failures: usize,
}

impl Report {
    pub fn new(results: Vec<TargetCount>, submitted: usize) -> Self {
        let mut total = 0u64;
        let mut failures = 0;
        for result in &results {
            match result.count() {
                Some(count) => total += count,
                None => failures += 1,
            }
        }

        Self {
            results,
            submitted,
            total,
            failures,
        }
    }

    /// Per-target results in the order they were recorded
    pub fn results(&self) -> &[TargetCount] {
        &self.results
    }

    /// Number of unique targets submitted to the run
    pub fn submitted(&self) -> usize {
        self.submitted
    }

    /// Sum of all successful counts
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn failures(&self) -> usize {
        self.failures
    }

    pub fn is_success(&self) -> bool {
        self.failures == 0
    }

    /// Count recorded for `target`, if it succeeded
    pub fn count_for(&self, target: &Target) -> Option<u64> {
        self.results
            .iter()
            .find(|r| &r.target == target)
            .and_then(TargetCount::count)
    }

    pub fn errors(&self) -> impl Iterator<Item = (&Target, &CountError)> {
        self.results
            .iter()
            .filter_map(|r| r.error().map(|e| (&r.target, e)))
    }
}
