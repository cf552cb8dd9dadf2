//! Parameters of every demonstration block.

use std::num::NonZeroUsize;
use std::time::Duration;

const GREETERS: u32 = 3;
const GREET_DELAY: Duration = Duration::from_millis(100);
const ITEMS: i64 = 5;
const GENERATE_DELAY: Duration = Duration::from_millis(100);
const BUFFERED: [&str; 3] = ["First", "Second", "Third"];
const JOBS: i64 = 5;
const WORKERS: NonZeroUsize = match NonZeroUsize::new(3) {
    Some(workers) => workers,
    None => unreachable!(),
};
const WORK_DELAY: Duration = Duration::from_millis(150);
const SOURCES: [(&str, Duration); 2] = [
    ("Channel 1", Duration::from_millis(20)),
    ("Channel 2", Duration::from_millis(10)),
];
const SELECT_TIMEOUT: Duration = Duration::from_millis(30);
const SELECT_ITERATIONS: usize = 2;
const COUNTER_UNITS: usize = 10;
const COUNTER_INCREMENTS: usize = 1_000;

/// Demonstration parameters.
///
/// Defaults replay the reference run; tests tweak a few of them through the `with_*` builders.
#[derive(Debug, Clone)]
pub struct Config {
    /// Number of units greeting concurrently, unit `id` sleeping `id * greet_delay`.
    pub(crate) greeters: u32,
    pub(crate) greet_delay: Duration,
    /// Length of the generated sequence.
    pub(crate) items: i64,
    pub(crate) generate_delay: Duration,
    /// Messages pushed to a buffered channel before anything receives them.
    pub(crate) buffered: Vec<String>,
    /// Jobs are `1..=jobs`.
    pub(crate) jobs: i64,
    pub(crate) workers: NonZeroUsize,
    pub(crate) work_delay: Duration,
    pub(crate) sources: [(String, Duration); 2],
    pub(crate) select_timeout: Duration,
    pub(crate) select_iterations: usize,
    pub(crate) counter_units: usize,
    pub(crate) counter_increments: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            greeters: GREETERS,
            greet_delay: GREET_DELAY,
            items: ITEMS,
            generate_delay: GENERATE_DELAY,
            buffered: BUFFERED.map(String::from).to_vec(),
            jobs: JOBS,
            workers: WORKERS,
            work_delay: WORK_DELAY,
            sources: SOURCES.map(|(label, delay)| (label.to_owned(), delay)),
            select_timeout: SELECT_TIMEOUT,
            select_iterations: SELECT_ITERATIONS,
            counter_units: COUNTER_UNITS,
            counter_increments: COUNTER_INCREMENTS,
        }
    }
}

impl Config {
    #[inline]
    pub fn with_items(self, items: i64) -> Self {
        Self { items, ..self }
    }

    #[inline]
    pub fn with_jobs(self, jobs: i64) -> Self {
        Self { jobs, ..self }
    }

    #[inline]
    pub fn with_workers(self, workers: NonZeroUsize) -> Self {
        Self { workers, ..self }
    }

    #[inline]
    pub fn with_counter(self, units: usize, increments: usize) -> Self {
        Self {
            counter_units: units,
            counter_increments: increments,
            ..self
        }
    }
}
