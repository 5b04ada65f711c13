use log::{debug, warn};
use operon_core::annotation::Strand;
use operon_core::context::{Operon, PromoterRegion, RegionType};
use operon_core::lookup::Lookup;
use operon_core::provider::GenomicProvider;

use crate::config::EngineConfig;
use crate::session::Session;
use crate::EngineError;

/// Intergenic span chosen as the promoter, 1-based inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromoterCandidate {
    pub start: u64,
    pub stop: u64,
    pub region_type: RegionType,
}

/// Pick the intergenic region in front of the operon, or `None` when the
/// boundary is ambiguous.
///
/// For a `+` query the genes before it are scanned toward the operon start
/// for a divergent (`-`) gene; the region between that gene and the next one
/// is chosen. Without one, the gaps before the query are tested in the same
/// order and the first longer than `min_gap` is chosen. A `-` query mirrors
/// this toward the operon end.
pub fn select_region(operon: &Operon, min_gap: u64) -> Option<PromoterCandidate> {
    let q = operon.query_index;
    let genes = &operon.genes;
    if q >= genes.len() {
        return None;
    }

    // Gap k lies between genes[k] and genes[k + 1].
    let (divergent, gaps): (Option<usize>, Vec<usize>) = match genes[q].strand {
        Strand::Forward => {
            let divergent = (0..q).rev().find(|&k| genes[k].strand == Strand::Reverse);
            (divergent, (0..q).rev().collect())
        }
        Strand::Reverse => {
            let divergent = (q + 1..genes.len())
                .find(|&k| genes[k].strand == Strand::Forward)
                .map(|k| k - 1);
            (divergent, (q..genes.len().saturating_sub(1)).collect())
        }
    };

    let between = |k: usize, region_type| {
        let (upstream, downstream) = (&genes[k], &genes[k + 1]);
        PromoterCandidate {
            start: upstream.stop.saturating_add(1),
            stop: downstream.start.saturating_sub(1),
            region_type,
        }
    };

    if let Some(k) = divergent {
        return Some(between(k, RegionType::AdjacentDivergent));
    }

    gaps.into_iter()
        .find(|&k| genes[k + 1].start.saturating_sub(genes[k].stop) > min_gap)
        .map(|k| between(k, RegionType::LongIntergenic))
}

/// Predict the promoter of an operon and fetch its sequence.
///
/// Provider failures and over-long regions yield `Absent`; only cancellation
/// is returned as an error.
pub fn predict<P: GenomicProvider + ?Sized>(
    session: &Session<'_, P>,
    operon: &Operon,
    genome_id: &str,
    config: &EngineConfig,
) -> Result<Lookup<PromoterRegion>, EngineError> {
    let Some(candidate) = select_region(operon, config.min_intergenic_gap) else {
        debug!("No promoter boundary for operon of {}", describe(operon));
        return Ok(Lookup::Absent);
    };
    if candidate.start > candidate.stop {
        debug!("Promoter region of {} is empty", describe(operon));
        return Ok(Lookup::Absent);
    }

    let sequence = match session.sequence(genome_id, candidate.start, candidate.stop) {
        Ok(sequence) => sequence,
        Err(EngineError::Cancelled) => return Err(EngineError::Cancelled),
        Err(EngineError::Provider(e)) => {
            warn!(
                "Promoter fetch {genome_id}:{}-{} failed: {e}",
                candidate.start, candidate.stop
            );
            return Ok(Lookup::Absent);
        }
    };

    if sequence.len() > config.max_promoter_length {
        warn!(
            "Discarding {} bp promoter of {} (limit {})",
            sequence.len(),
            describe(operon),
            config.max_promoter_length
        );
        return Ok(Lookup::Absent);
    }

    Ok(Lookup::Found(PromoterRegion {
        sequence,
        region_type: candidate.region_type,
        start: candidate.start,
        stop: candidate.stop,
    }))
}

fn describe(operon: &Operon) -> &str {
    operon
        .genes
        .get(operon.query_index)
        .map(|g| g.locus_tag.as_str())
        .unwrap_or("?")
}
