//! Operon assembly by directional walks from the query gene.

use log::debug;
use operon_core::annotation::{GeneAnnotation, Strand};
use operon_core::context::{GeneWindow, Operon};

/// Direction of a walk through the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Walk {
    /// Toward decreasing window index.
    Downstream,
    /// Toward increasing window index.
    Upstream,
}

/// Build the operon around the window's query gene.
///
/// The result is `[downstream run reversed] + [query] + [upstream run]` and
/// its `query_index` is the length of the downstream run. Deterministic in
/// its inputs.
pub fn build_operon(window: &GeneWindow, query_strand: Strand, max_distance: u64) -> Operon {
    let q = window.query_index;
    let query = window.query();

    let downstream = walk(
        window.genes[..q].iter().rev(),
        query,
        query_strand,
        Walk::Downstream,
        max_distance,
    );
    let upstream = walk(
        window.genes[q + 1..].iter(),
        query,
        query_strand,
        Walk::Upstream,
        max_distance,
    );

    let query_index = downstream.len();
    let mut genes = Vec::with_capacity(downstream.len() + 1 + upstream.len());
    genes.extend(downstream.into_iter().rev());
    genes.push(query.clone());
    genes.extend(upstream);

    debug!(
        "Operon around {} spans {} genes (query at {query_index})",
        query.locus_tag,
        genes.len()
    );

    Operon {
        genes,
        query_index,
        strand: query_strand,
    }
}

/// A gene pointing away from the reference strand in the walking direction,
/// i.e. the head of a divergently transcribed neighbor cluster.
fn crosses_divergent(reference: Strand, candidate: Strand, direction: Walk) -> bool {
    matches!(
        (reference, candidate, direction),
        (Strand::Reverse, Strand::Forward, Walk::Upstream)
            | (Strand::Forward, Strand::Reverse, Walk::Downstream)
    )
}

fn walk<'a>(
    candidates: impl Iterator<Item = &'a GeneAnnotation>,
    query: &GeneAnnotation,
    query_strand: Strand,
    direction: Walk,
    max_distance: u64,
) -> Vec<GeneAnnotation> {
    let mut candidates = candidates.peekable();
    let mut reference = query_strand;

    if let Some(neighbor) = candidates.peek() {
        if crosses_divergent(reference, neighbor.strand, direction) {
            debug!(
                "{direction:?} neighbor {} is divergent, following strand {}",
                neighbor.locus_tag, neighbor.strand
            );
            reference = neighbor.strand;
        }
    }

    let mut run = Vec::new();
    for gene in candidates {
        if query.start_distance(gene) > max_distance {
            debug!("{direction:?} walk stops at {}: too far from query", gene.locus_tag);
            break;
        }
        if gene.strand == reference || crosses_divergent(reference, gene.strand, direction) {
            run.push(gene.clone());
        } else {
            debug!("{direction:?} walk stops at convergent {}", gene.locus_tag);
            break;
        }
    }
    run
}
