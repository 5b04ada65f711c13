use std::time::Duration;

use operon_ncbi::NcbiConfig;

/// Bases added before and after a CDS when requesting its neighborhood.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPadding {
    pub before: u64,
    pub after: u64,
}

impl WindowPadding {
    pub const fn new(before: u64, after: u64) -> Self {
        Self { before, after }
    }

    /// Window for `[start, stop]`, clamped to the first base of the genome.
    pub fn apply(&self, start: u64, stop: u64) -> (u64, u64) {
        (start.saturating_sub(self.before).max(1), stop.saturating_add(self.after))
    }
}

/// Windows tried in order until the provider answers one of them.
pub const DEFAULT_WINDOW_PADDINGS: [WindowPadding; 4] = [
    WindowPadding::new(10_000, 10_000),
    WindowPadding::new(5_000, 5_000),
    WindowPadding::new(0, 5_000),
    WindowPadding::new(5_000, 0),
];

/// Retries of transient provider failures. Every attempt passes the rate
/// gate again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after a transient failure (timeout, HTTP 429 or 5xx).
    pub max_retries: u32,
    /// Pause before the first retry; doubled for every further one.
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            initial_backoff: Duration::ZERO,
        }
    }
}

/// Configuration for operon context inference.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum distance between a gene's start and the query gene's start for
    /// the gene to join the operon.
    pub max_operon_distance: u64,
    /// An intergenic gap must be longer than this to count as a promoter.
    pub min_intergenic_gap: u64,
    /// Promoter candidates longer than this are discarded.
    pub max_promoter_length: usize,
    /// Neighborhood windows, largest first.
    pub window_paddings: Vec<WindowPadding>,
    /// Minimum spacing between two provider calls.
    pub min_call_interval: Duration,
    pub retry: RetryPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_operon_distance: 8_000,
            min_intergenic_gap: 100,
            max_promoter_length: 1_000,
            window_paddings: DEFAULT_WINDOW_PADDINGS.to_vec(),
            min_call_interval: Duration::from_millis(340),
            retry: RetryPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Defaults with the call spacing NCBI allows for `ncbi`'s credentials.
    pub fn for_ncbi(ncbi: &NcbiConfig) -> Self {
        Self::default().with_min_call_interval(ncbi.recommended_interval())
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_min_call_interval(mut self, interval: Duration) -> Self {
        self.min_call_interval = interval;
        self
    }
}
