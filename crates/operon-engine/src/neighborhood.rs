use log::{debug, warn};
use operon_core::annotation::{CdsCoordinate, GeneAnnotation};
use operon_core::context::GeneWindow;
use operon_core::lookup::Lookup;
use operon_core::provider::GenomicProvider;
use operon_formats::annotation;

use crate::config::WindowPadding;
use crate::session::Session;
use crate::EngineError;

/// Fetch the annotated neighborhood of a CDS.
///
/// Paddings are tried in order; the first window the provider answers with at
/// least one record is used, and the query gene is looked up only there.
/// Provider failures move on to the next padding. Only cancellation is an
/// error.
pub fn fetch_window<P: GenomicProvider + ?Sized>(
    session: &Session<'_, P>,
    coordinate: &CdsCoordinate,
    paddings: &[WindowPadding],
) -> Result<Lookup<GeneWindow>, EngineError> {
    let genome = &coordinate.genome_id;

    for (attempt, padding) in paddings.iter().enumerate() {
        let (start, stop) = padding.apply(coordinate.start, coordinate.stop);
        debug!("Window attempt {} for {genome}:{start}-{stop}", attempt + 1);

        match session.annotated_window(genome, start, stop) {
            Ok(records) if !records.is_empty() => {
                let window = locate_query(&records, coordinate.start, coordinate.stop);
                if window.is_absent() {
                    warn!(
                        "No annotation in {genome}:{start}-{stop} covers {}-{}",
                        coordinate.start, coordinate.stop
                    );
                }
                return Ok(window);
            }
            Ok(_) => debug!("Window {genome}:{start}-{stop} has no annotated genes"),
            Err(EngineError::Provider(e)) => debug!("Window {genome}:{start}-{stop} failed: {e}"),
            Err(EngineError::Cancelled) => return Err(EngineError::Cancelled),
        }
    }

    warn!(
        "All {} window attempts failed around {genome}:{}-{}",
        paddings.len(),
        coordinate.start,
        coordinate.stop
    );
    Ok(Lookup::Absent)
}

/// Parse window records and find the first gene spanning `[start, stop]`.
/// Record order is kept as returned.
pub fn locate_query(records: &[String], start: u64, stop: u64) -> Lookup<GeneWindow> {
    let genes: Vec<GeneAnnotation> = records
        .iter()
        .map(|raw| annotation::parse_record(raw))
        .collect();

    match genes.iter().position(|g| g.contains(start, stop)) {
        Some(query_index) => Lookup::Found(GeneWindow { genes, query_index }),
        None => Lookup::Absent,
    }
}
