//! Genomic context inference: from protein accessions to operons, their
//! reconstructed sequence and predicted promoters.

pub mod config;
pub mod coordinate;
pub mod engine;
pub mod neighborhood;
pub mod operon;
pub mod promoter;
pub mod reconstruct;
pub mod session;

use operon_core::provider::ProviderError;
use thiserror::Error;

pub use config::{EngineConfig, RetryPolicy, WindowPadding};
pub use engine::{BatchReport, ContextEngine, OperonContexts};
pub use session::{BatchStats, CancellationToken, RateGate};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("Batch cancelled")]
    Cancelled,
}
