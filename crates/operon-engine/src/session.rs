//! Per-batch access to the provider: one rate gate for every call, a memo
//! table per lookup kind, and the cancellation signal.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::{Duration, Instant};

use log::{debug, warn};
use operon_core::annotation::CdsCoordinate;
use operon_core::lookup::Lookup;
use operon_core::provider::{GenomicProvider, ProviderError};
use serde::Serialize;

use crate::config::RetryPolicy;
use crate::EngineError;

/// Enforces a minimum spacing between consecutive provider calls.
///
/// Shared by every engine that talks to the same provider account, so the
/// spacing holds process-wide and not only within one batch.
#[derive(Debug)]
pub struct RateGate {
    interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl RateGate {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_call: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Block until a call may be issued and claim that slot.
    pub fn wait(&self) {
        let mut last = self
            .last_call
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.interval {
                std::thread::sleep(self.interval - elapsed);
            }
        }
        *last = Some(Instant::now());
    }
}

/// Cooperative cancellation for an in-flight batch.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Provider traffic of one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchStats {
    pub provider_calls: u64,
    pub cache_hits: u64,
}

type Cell<V> = Arc<OnceLock<Result<V, ProviderError>>>;

/// Memo table keyed by request. Failures are memoized as well, and concurrent
/// requests for one key wait for the first instead of issuing their own.
struct Memo<K, V> {
    cells: Mutex<HashMap<K, Cell<V>>>,
}

impl<K: Eq + Hash, V: Clone> Memo<K, V> {
    fn new() -> Self {
        Self {
            cells: Mutex::new(HashMap::new()),
        }
    }

    fn cell(&self, key: K) -> Cell<V> {
        let mut cells = self.cells.lock().unwrap_or_else(PoisonError::into_inner);
        cells.entry(key).or_default().clone()
    }

    /// Returns the value and whether it came from the table.
    fn get_or_fetch(
        &self,
        key: K,
        fetch: impl FnOnce() -> Result<V, ProviderError>,
    ) -> (Result<V, ProviderError>, bool) {
        let cell = self.cell(key);
        let mut fetched = false;
        let result = cell.get_or_init(|| {
            fetched = true;
            fetch()
        });
        (result.clone(), !fetched)
    }

    /// Record a value obtained elsewhere, unless the key is already known.
    fn seed(&self, key: K, value: V) {
        let _ = self.cell(key).set(Ok(value));
    }
}

type Region = (String, u64, u64);

/// Gateway to the provider for the lifetime of one batch.
pub struct Session<'a, P: ?Sized> {
    provider: &'a P,
    gate: &'a RateGate,
    cancel: &'a CancellationToken,
    retry: RetryPolicy,
    coordinates: Memo<String, Lookup<CdsCoordinate>>,
    windows: Memo<Region, Vec<String>>,
    sequences: Memo<Region, String>,
    provider_calls: AtomicU64,
    cache_hits: AtomicU64,
}

impl<'a, P: GenomicProvider + ?Sized> Session<'a, P> {
    pub fn new(provider: &'a P, gate: &'a RateGate, cancel: &'a CancellationToken) -> Self {
        Self {
            provider,
            gate,
            cancel,
            retry: RetryPolicy::none(),
            coordinates: Memo::new(),
            windows: Memo::new(),
            sequences: Memo::new(),
            provider_calls: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn check_cancelled(&self) -> Result<(), EngineError> {
        if self.cancel.is_cancelled() {
            Err(EngineError::Cancelled)
        } else {
            Ok(())
        }
    }

    pub fn stats(&self) -> BatchStats {
        BatchStats {
            provider_calls: self.provider_calls.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
        }
    }

    /// Issue a provider call through the gate, retrying transient failures.
    /// Each attempt waits for the gate and counts as a provider call.
    fn call<T>(&self, f: impl Fn(&P) -> Result<T, ProviderError>) -> Result<T, ProviderError> {
        let mut attempt = 0;
        let mut backoff = self.retry.initial_backoff;

        loop {
            self.gate.wait();
            self.provider_calls.fetch_add(1, Ordering::Relaxed);
            match f(self.provider) {
                Err(e)
                    if e.is_transient()
                        && attempt < self.retry.max_retries
                        && !self.cancel.is_cancelled() =>
                {
                    attempt += 1;
                    warn!(
                        "Provider call failed ({e}); retry {attempt}/{} in {backoff:?}",
                        self.retry.max_retries
                    );
                    std::thread::sleep(backoff);
                    backoff *= 2;
                }
                result => return result,
            }
        }
    }

    fn finish<V>(&self, what: &str, (result, hit): (Result<V, ProviderError>, bool)) -> Result<V, EngineError> {
        if hit {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
            debug!("Cache hit: {what}");
        } else {
            debug!("Cache miss: {what}");
        }
        result.map_err(EngineError::from)
    }

    /// One batched coordinate request. Definitive answers are memoized so a
    /// later single lookup of the same accession is free.
    pub fn batch_coordinates(
        &self,
        accessions: &[String],
    ) -> Result<HashMap<String, Lookup<CdsCoordinate>>, EngineError> {
        self.check_cancelled()?;
        let resolved = self.call(|p| p.batch_coordinates(accessions))?;
        for (accession, coordinate) in &resolved {
            self.coordinates.seed(accession.clone(), coordinate.clone());
        }
        Ok(resolved)
    }

    pub fn coordinate(&self, accession: &str) -> Result<Lookup<CdsCoordinate>, EngineError> {
        self.check_cancelled()?;
        let outcome = self
            .coordinates
            .get_or_fetch(accession.to_string(), || {
                self.call(|p| p.coordinate(accession))
            });
        self.finish(&format!("coordinate {accession}"), outcome)
    }

    pub fn annotated_window(
        &self,
        genome_id: &str,
        start: u64,
        stop: u64,
    ) -> Result<Vec<String>, EngineError> {
        self.check_cancelled()?;
        let outcome = self
            .windows
            .get_or_fetch((genome_id.to_string(), start, stop), || {
                self.call(|p| p.annotated_window(genome_id, start, stop))
            });
        self.finish(&format!("window {genome_id}:{start}-{stop}"), outcome)
    }

    pub fn sequence(&self, genome_id: &str, start: u64, stop: u64) -> Result<String, EngineError> {
        self.check_cancelled()?;
        let outcome = self
            .sequences
            .get_or_fetch((genome_id.to_string(), start, stop), || {
                self.call(|p| p.sequence(genome_id, start, stop))
            });
        self.finish(&format!("sequence {genome_id}:{start}-{stop}"), outcome)
    }
}
