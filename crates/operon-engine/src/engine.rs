use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use log::{debug, info, warn};
use operon_core::annotation::CdsCoordinate;
use operon_core::context::OperonContext;
use operon_core::lookup::Lookup;
use operon_core::provider::GenomicProvider;
use operon_ncbi::{NcbiClient, NcbiConfig};
use rayon::prelude::*;
use serde::Serialize;

use crate::config::EngineConfig;
use crate::session::{BatchStats, CancellationToken, RateGate, Session};
use crate::{coordinate, neighborhood, operon, promoter, reconstruct, EngineError};

/// Result of a batch: one entry per distinct input accession, `Absent` for
/// accessions without a resolvable context.
pub type OperonContexts = BTreeMap<String, Lookup<OperonContext>>;

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub contexts: OperonContexts,
    pub stats: BatchStats,
}

/// Resolves protein accessions to their operon contexts.
///
/// All provider calls, across batches and threads, pass through one
/// [`RateGate`]. Caches live for a single batch.
pub struct ContextEngine<P> {
    provider: P,
    gate: Arc<RateGate>,
    config: EngineConfig,
}

impl ContextEngine<NcbiClient> {
    /// Engine over NCBI E-utilities, spaced for the configured credentials.
    pub fn ncbi(ncbi: NcbiConfig) -> Result<Self, EngineError> {
        let config = EngineConfig::for_ncbi(&ncbi);
        Ok(Self::new(NcbiClient::new(ncbi)?, config))
    }
}

impl<P: GenomicProvider> ContextEngine<P> {
    pub fn new(provider: P, config: EngineConfig) -> Self {
        let gate = Arc::new(RateGate::new(config.min_call_interval));
        Self::with_gate(provider, config, gate)
    }

    /// Share a gate with other engines using the same provider account.
    pub fn with_gate(provider: P, config: EngineConfig, gate: Arc<RateGate>) -> Self {
        Self {
            provider,
            gate,
            config,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn gate(&self) -> &Arc<RateGate> {
        &self.gate
    }

    /// Resolve a set of accessions. Duplicates are collapsed.
    ///
    /// Fails only when the batched coordinate lookup fails; every other
    /// problem turns that accession into `Absent`.
    pub fn resolve_operon_contexts<I, S>(&self, accessions: I) -> Result<OperonContexts, EngineError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.run_batch(accessions, &CancellationToken::new())
            .map(|report| report.contexts)
    }

    /// Single-accession form of [`Self::resolve_operon_contexts`].
    pub fn resolve_operon_context(&self, accession: &str) -> Result<Lookup<OperonContext>, EngineError> {
        let mut contexts = self.resolve_operon_contexts([accession])?;
        Ok(contexts.remove(accession).unwrap_or_default())
    }

    /// Resolve a batch under a cancellation token and report provider traffic.
    ///
    /// Returns [`EngineError::Cancelled`] if the token fires before the batch
    /// completes; no new provider calls are issued after that.
    pub fn run_batch<I, S>(
        &self,
        accessions: I,
        cancel: &CancellationToken,
    ) -> Result<BatchReport, EngineError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let accessions: Vec<String> = accessions
            .into_iter()
            .map(Into::into)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        info!("Resolving operon contexts for {} accessions", accessions.len());
        let session =
            Session::new(&self.provider, self.gate.as_ref(), cancel).with_retry(self.config.retry);
        let coordinates = coordinate::resolve_batch(&session, &accessions)?;

        let outcomes: Vec<(String, Result<Lookup<OperonContext>, EngineError>)> = coordinates
            .into_par_iter()
            .map(|(accession, coordinate)| {
                let outcome = match coordinate {
                    Lookup::Found(coordinate) => self.build_context(&session, &accession, &coordinate),
                    Lookup::Absent => Ok(Lookup::Absent),
                };
                (accession, outcome)
            })
            .collect();

        session.check_cancelled()?;

        let mut contexts = OperonContexts::new();
        for (accession, outcome) in outcomes {
            let context = match outcome {
                Ok(context) => context,
                Err(EngineError::Cancelled) => return Err(EngineError::Cancelled),
                Err(EngineError::Provider(e)) => {
                    warn!("{accession}: {e}; reporting no context");
                    Lookup::Absent
                }
            };
            contexts.insert(accession, context);
        }

        let stats = session.stats();
        let found = contexts.values().filter(|c| c.is_found()).count();
        info!(
            "Resolved {found}/{} operon contexts ({} provider calls, {} cache hits)",
            contexts.len(),
            stats.provider_calls,
            stats.cache_hits
        );

        Ok(BatchReport { contexts, stats })
    }

    /// Everything after coordinate resolution for one accession.
    fn build_context(
        &self,
        session: &Session<'_, P>,
        accession: &str,
        coordinate: &CdsCoordinate,
    ) -> Result<Lookup<OperonContext>, EngineError> {
        let window = match neighborhood::fetch_window(session, coordinate, &self.config.window_paddings)? {
            Lookup::Found(window) => window,
            Lookup::Absent => return Ok(Lookup::Absent),
        };

        // The annotation record's strand wins over the IPG report's.
        let query_strand = window.query().strand;
        if query_strand != coordinate.strand {
            debug!(
                "{accession}: annotation strand {query_strand} disagrees with IPG strand {}",
                coordinate.strand
            );
        }
        let operon = operon::build_operon(&window, query_strand, self.config.max_operon_distance);
        let Some((start, stop)) = operon.bounds() else {
            return Ok(Lookup::Absent);
        };

        let fragment = session.sequence(&coordinate.genome_id, start, stop)?;
        let (segments, reassembly_match) = reconstruct::reconstruct(&fragment, &operon);
        let expected = stop.saturating_sub(start) + 1;
        if !reassembly_match || fragment.len() as u64 != expected {
            warn!(
                "{accession}: fragment {}:{start}-{stop} has {} bases, expected {expected} (reassembly match: {reassembly_match})",
                coordinate.genome_id,
                fragment.len()
            );
        }

        let promoter = promoter::predict(session, &operon, &coordinate.genome_id, &self.config)?;

        Ok(Lookup::Found(OperonContext {
            enzyme_index: operon.query_index,
            enzyme_direction: query_strand,
            operon,
            reconstructed_segments: segments,
            reassembly_match,
            promoter,
            genome_id: coordinate.genome_id.clone(),
        }))
    }
}
