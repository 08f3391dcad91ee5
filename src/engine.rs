//! Core counting engine
//!
//! A fixed pool of workers drains a shared [`WorkQueue`]. Each worker reads its
//! target with its own [`InputReader`], counts it, and records exactly one
//! [`TargetCount`] in the shared [`Aggregator`]. The report is built only after
//! every worker has returned.

use crate::aggregate::{Aggregator, Report, TargetCount};
use crate::cli::Args;
use crate::distributor::WorkQueue;
use crate::error::CountError;
use crate::kernel::{Backend, Counter, NEWLINE};
use crate::progress::{create_bytes_progress_bar, ProcessingStats};
use crate::reader::{InputReader, ReadStrategy};
use crate::target::{Target, TargetSet};

use anyhow::Context;
use indicatif::ProgressBar;
use std::sync::Arc;

/// What is counted for each target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CountMode {
    /// Newline bytes, through the vectorized kernel
    #[default]
    Lines,
    /// Total bytes read
    Bytes,
}

/// Engine configuration
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub mode: CountMode,
    pub strategy: ReadStrategy,
    /// Worker count; `None` uses the host's hardware concurrency
    pub threads: Option<usize>,
    /// Kernel backend; `None` picks the widest the CPU supports
    pub backend: Option<Backend>,
    /// Draw a bytes progress bar on stderr
    pub progress: bool,
}

impl EngineConfig {
    pub fn from_args(args: &Args) -> anyhow::Result<Self> {
        Ok(Self {
            mode: args.count_mode(),
            strategy: args.read_strategy()?,
            threads: args.threads,
            backend: args.backend(),
            progress: args.progress && !args.quiet,
        })
    }
}

/// Counting engine
pub struct Engine {
    config: EngineConfig,
    counter: Counter,
    stats: Arc<ProcessingStats>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> anyhow::Result<Self> {
        let counter = match config.backend {
            None => Counter::new(NEWLINE),
            Some(backend) => Counter::with_backend(NEWLINE, backend)
                .with_context(|| format!("kernel '{}' is not supported on this CPU", backend))?,
        };

        log::debug!(
            "kernel {} ({}-byte steps), strategy {}",
            counter.backend(),
            counter.backend().width(),
            config.strategy.name()
        );

        Ok(Self {
            config,
            counter,
            stats: Arc::new(ProcessingStats::new()),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn counter(&self) -> Counter {
        self.counter
    }

    /// Number of workers a pooled run spawns, never less than one
    pub fn worker_count(&self) -> usize {
        self.config.threads.unwrap_or_else(num_cpus::get).max(1)
    }

    /// Count every target and reduce the results.
    ///
    /// Per-target failures are part of the report; only a failure to set up
    /// the worker pool is returned as an error.
    pub fn run(&self, targets: TargetSet) -> anyhow::Result<Report> {
        let submitted = targets.len();
        let stdin_only = targets.is_stdin_only();
        self.stats.add_targets(submitted as u64);

        let progress = if self.config.progress {
            create_bytes_progress_bar(targets.known_size(), "Counting...")
        } else {
            ProgressBar::hidden()
        };

        let queue = WorkQueue::new(targets);
        let aggregator = Aggregator::with_capacity(submitted);

        if stdin_only {
            log::debug!("single stdin target, counting inline");
            self.work(&queue, &aggregator, &progress);
        } else {
            let workers = self.worker_count();
            log::debug!("spawning {} workers for {} targets", workers, submitted);

            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(workers)
                .thread_name(|i| format!("wcl-worker-{}", i))
                .build()
                .context("failed to start worker pool")?;

            pool.scope(|scope| {
                for _ in 0..workers {
                    scope.spawn(|_| self.work(&queue, &aggregator, &progress));
                }
            });
        }

        log::debug!("{} of {} targets recorded by workers", aggregator.len(), submitted);

        // Only reachable when every worker stopped early
        for target in queue.drain() {
            log::warn!("{} left unclaimed by the worker pool", target);
            self.stats.fail_target();
            let error = CountError::WorkerUnavailable { name: target.name() };
            aggregator.record(TargetCount::failed(target, error));
        }

        progress.finish_and_clear();
        Ok(aggregator.finish(submitted))
    }

    /// Worker loop: claim, count, record, until the queue is empty
    fn work(&self, queue: &WorkQueue, aggregator: &Aggregator, progress: &ProgressBar) {
        let mut reader = match InputReader::new(self.config.strategy) {
            Ok(reader) => reader,
            Err(e) => {
                log::error!("worker stopping, cannot allocate its read buffer: {}", e);
                return;
            }
        };

        while let Some(target) = queue.take_next() {
            let result = self.count_target(&mut reader, target, progress);
            aggregator.record(result);
        }
    }

    fn count_target(&self, reader: &mut InputReader, target: Target, progress: &ProgressBar) -> TargetCount {
        let counter = self.counter;
        let mode = self.config.mode;
        let mut count = 0u64;
        let mut scanned = 0u64;

        let outcome = reader.scan(&target, |chunk| {
            let len = chunk.len() as u64;
            scanned += len;
            count += match mode {
                CountMode::Lines => counter.count(chunk),
                CountMode::Bytes => len,
            };
            progress.inc(len);
        });
        self.stats.add_bytes(scanned);

        match outcome {
            Ok(()) => {
                self.stats.complete_target();
                TargetCount::counted(target, count)
            }
            Err(e) => {
                log::debug!("{} failed ({}): {}", target, e.kind(), e);
                self.stats.fail_target();
                TargetCount::failed(target, e)
            }
        }
    }

    /// Get processing statistics
    pub fn stats(&self) -> Arc<ProcessingStats> {
        Arc::clone(&self.stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::DEFAULT_CHUNK_SIZE;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn engine(threads: usize, mode: CountMode, strategy: ReadStrategy) -> Engine {
        Engine::new(EngineConfig {
            mode,
            strategy,
            threads: Some(threads),
            ..Default::default()
        })
        .unwrap()
    }

    fn write(dir: &Path, name: &str, content: &[u8]) -> Target {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        Target::File(path)
    }

    /// `n` files where file `i` holds `i % 17` newlines
    fn corpus(dir: &Path, n: usize) -> TargetSet {
        (0..n)
            .map(|i| {
                let body = "line\n".repeat(i % 17) + "tail";
                write(dir, &format!("f{i}.txt"), body.as_bytes())
            })
            .collect()
    }

    #[test]
    fn test_two_targets_and_total() {
        let dir = TempDir::new().unwrap();
        let a = write(dir.path(), "a", b"one\ntwo\n");
        let b = write(dir.path(), "b", b"1\n2\n3\n");
        let targets: TargetSet = [a.clone(), b.clone()].into_iter().collect();

        let report = engine(2, CountMode::Lines, ReadStrategy::default()).run(targets).unwrap();

        assert_eq!(report.submitted(), 2);
        assert_eq!(report.count_for(&a), Some(2));
        assert_eq!(report.count_for(&b), Some(3));
        assert_eq!(report.total(), 5);
        assert!(report.is_success());
    }

    #[test]
    fn test_scenario_counts() {
        let dir = TempDir::new().unwrap();
        let cases: [(&str, &[u8], u64); 3] = [("xyz", b"x\ny\nz", 2), ("empty", b"", 0), ("nl", b"\n", 1)];

        for (name, content, expected) in cases {
            let target = write(dir.path(), name, content);
            let report = engine(1, CountMode::Lines, ReadStrategy::default())
                .run(std::iter::once(target.clone()).collect())
                .unwrap();
            assert_eq!(report.count_for(&target), Some(expected), "{name}");
            assert_eq!(report.total(), expected);
        }
    }

    #[test]
    fn test_every_target_reported_once_for_any_pool_size() {
        let dir = TempDir::new().unwrap();
        let targets = corpus(dir.path(), 40);

        for threads in [1, 2, 3, 8, 64] {
            let report = engine(threads, CountMode::Lines, ReadStrategy::default())
                .run(targets.clone())
                .unwrap();

            let mut labels: Vec<String> = report.results().iter().map(|r| r.label()).collect();
            labels.sort();
            let before = labels.len();
            labels.dedup();

            let mut expected: Vec<String> = targets.iter().map(Target::label).collect();
            expected.sort();

            assert_eq!(before, labels.len(), "duplicate results with {threads} workers");
            assert_eq!(labels, expected, "{threads} workers");
        }
    }

    #[test]
    fn test_counts_independent_of_pool_size_and_strategy() {
        let dir = TempDir::new().unwrap();
        let targets = corpus(dir.path(), 25);
        let baseline = engine(1, CountMode::Lines, ReadStrategy::default())
            .run(targets.clone())
            .unwrap();

        let strategies = [
            ReadStrategy::Streaming { chunk_size: DEFAULT_CHUNK_SIZE },
            ReadStrategy::Streaming { chunk_size: 7 },
            ReadStrategy::WholeBuffer,
            ReadStrategy::Mapped,
        ];
        for threads in [1, 2, 8] {
            for strategy in strategies {
                let report = engine(threads, CountMode::Lines, strategy)
                    .run(targets.clone())
                    .unwrap();
                assert_eq!(report.total(), baseline.total(), "{threads} {strategy:?}");
                for target in targets.iter() {
                    assert_eq!(report.count_for(target), baseline.count_for(target));
                }
            }
        }
    }

    #[test]
    fn test_missing_target_is_isolated() {
        let dir = TempDir::new().unwrap();
        let good = write(dir.path(), "good", b"a\nb\n");
        let missing = Target::File(dir.path().join("missing"));
        let targets: TargetSet = [good.clone(), missing.clone()].into_iter().collect();

        let eng = engine(4, CountMode::Lines, ReadStrategy::default());
        let report = eng.run(targets).unwrap();

        assert_eq!(report.results().len(), 2);
        assert_eq!(report.count_for(&good), Some(2));
        assert_eq!(report.total(), 2);
        assert_eq!(report.failures(), 1);

        let (failed, error) = report.errors().next().unwrap();
        assert_eq!(failed, &missing);
        assert!(matches!(error, CountError::TargetUnavailable { .. }));

        assert_eq!(eng.stats().get_failed_targets(), 1);
        assert_eq!(eng.stats().get_processed_targets(), 2);
    }

    #[test]
    fn test_byte_mode() {
        let dir = TempDir::new().unwrap();
        let a = write(dir.path(), "a", b"hello");
        let b = write(dir.path(), "b", b"\n\n\n");
        let targets: TargetSet = [a.clone(), b.clone()].into_iter().collect();

        for strategy in [ReadStrategy::Streaming { chunk_size: 2 }, ReadStrategy::WholeBuffer] {
            let report = engine(2, CountMode::Bytes, strategy).run(targets.clone()).unwrap();
            assert_eq!(report.count_for(&a), Some(5));
            assert_eq!(report.count_for(&b), Some(3));
            assert_eq!(report.total(), 8);
        }
    }

    #[test]
    fn test_large_file_crosses_chunks() {
        let dir = TempDir::new().unwrap();
        let mut content = Vec::new();
        for i in 0..50_000u32 {
            content.extend_from_slice(format!("row {i}\n").as_bytes());
        }
        let target = write(dir.path(), "big", &content);

        let report = engine(2, CountMode::Lines, ReadStrategy::Streaming { chunk_size: 4093 })
            .run(std::iter::once(target.clone()).collect())
            .unwrap();

        assert_eq!(report.count_for(&target), Some(50_000));
    }

    #[test]
    fn test_worker_count_is_at_least_one() {
        assert_eq!(engine(0, CountMode::Lines, ReadStrategy::default()).worker_count(), 1);
        assert_eq!(engine(5, CountMode::Lines, ReadStrategy::default()).worker_count(), 5);

        let auto = Engine::new(EngineConfig::default()).unwrap();
        assert!(auto.worker_count() >= 1);
    }

    #[test]
    fn test_pinned_backend() {
        let config = EngineConfig {
            backend: Some(Backend::Scalar),
            ..Default::default()
        };
        let eng = Engine::new(config).unwrap();
        assert_eq!(eng.counter().backend(), Backend::Scalar);
    }

    #[test]
    fn test_empty_target_set() {
        let report = engine(4, CountMode::Lines, ReadStrategy::default())
            .run(TargetSet::new())
            .unwrap();

        assert_eq!(report.total(), 0);
        assert!(report.results().is_empty());
    }

    #[test]
    fn test_unclaimed_targets_become_worker_unavailable() {
        let dir = TempDir::new().unwrap();
        let targets = corpus(dir.path(), 5);
        let submitted = targets.len();

        // No worker can reserve its scratch buffer, so none claims anything
        let strategy = ReadStrategy::Streaming { chunk_size: usize::MAX };
        let report = engine(3, CountMode::Lines, strategy).run(targets).unwrap();

        assert_eq!(report.results().len(), submitted);
        assert_eq!(report.failures(), submitted);
        assert_eq!(report.total(), 0);
        assert!(!report.is_success());
        for (_, error) in report.errors() {
            assert!(matches!(error, CountError::WorkerUnavailable { .. }), "{error}");
            assert_eq!(error.kind(), "worker-unavailable");
        }
        assert_eq!(report.errors().count(), submitted);
    }
}
