use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::annotation::CdsCoordinate;
use crate::lookup::Lookup;

/// Failure talking to the genomic data provider.
///
/// Errors are `Clone` so a memoized failure can be handed to every caller
/// that asks for the same key during a batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("HTTP error {status}: {url}")]
    Http { status: u16, url: String },
    #[error("Request timed out: {url}")]
    Timeout { url: String },
    #[error("Network error: {0}")]
    Network(String),
    #[error("Malformed provider response: {0}")]
    Malformed(String),
    #[error("Provider reported an error: {0}")]
    Upstream(String),
}

impl ProviderError {
    /// Whether repeating the same request could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Http { status, .. } => *status == 429 || *status >= 500,
            ProviderError::Timeout { .. } | ProviderError::Network(_) => true,
            ProviderError::Malformed(_) | ProviderError::Upstream(_) => false,
        }
    }
}

/// The external genomic data service (NCBI E-utilities or a stand-in).
///
/// Implementations perform one external call per method invocation; rate
/// limiting and memoization are the caller's job.
pub trait GenomicProvider: Send + Sync {
    /// Resolve many accessions in one request. Accessions missing from the
    /// returned map were not mentioned by the provider and may be retried
    /// individually; `Lookup::Absent` entries are definitive.
    fn batch_coordinates(
        &self,
        accessions: &[String],
    ) -> Result<HashMap<String, Lookup<CdsCoordinate>>, ProviderError>;

    fn coordinate(&self, accession: &str) -> Result<Lookup<CdsCoordinate>, ProviderError>;

    /// Raw annotation records (one per gene) for `[start, stop]` of a genome,
    /// in the provider's positional order.
    fn annotated_window(
        &self,
        genome_id: &str,
        start: u64,
        stop: u64,
    ) -> Result<Vec<String>, ProviderError>;

    /// Forward-strand nucleotides of `[start, stop]`, 1-based inclusive.
    fn sequence(&self, genome_id: &str, start: u64, stop: u64) -> Result<String, ProviderError>;
}

impl<P: GenomicProvider + ?Sized> GenomicProvider for Arc<P> {
    fn batch_coordinates(
        &self,
        accessions: &[String],
    ) -> Result<HashMap<String, Lookup<CdsCoordinate>>, ProviderError> {
        (**self).batch_coordinates(accessions)
    }

    fn coordinate(&self, accession: &str) -> Result<Lookup<CdsCoordinate>, ProviderError> {
        (**self).coordinate(accession)
    }

    fn annotated_window(
        &self,
        genome_id: &str,
        start: u64,
        stop: u64,
    ) -> Result<Vec<String>, ProviderError> {
        (**self).annotated_window(genome_id, start, stop)
    }

    fn sequence(&self, genome_id: &str, start: u64, stop: u64) -> Result<String, ProviderError> {
        (**self).sequence(genome_id, start, stop)
    }
}
