use std::collections::BTreeMap;

use log::{debug, warn};
use operon_core::annotation::CdsCoordinate;
use operon_core::lookup::Lookup;
use operon_core::provider::GenomicProvider;

use crate::session::Session;
use crate::EngineError;

/// Resolve every accession to the coding sequence behind it.
///
/// Issues one batched request for the whole set. Accessions the batch answer
/// does not mention are looked up one by one; a failure there degrades only
/// that accession to `Absent`. A failed batch request is returned as is.
pub fn resolve_batch<P: GenomicProvider + ?Sized>(
    session: &Session<'_, P>,
    accessions: &[String],
) -> Result<BTreeMap<String, Lookup<CdsCoordinate>>, EngineError> {
    let mut resolved: BTreeMap<String, Lookup<CdsCoordinate>> = BTreeMap::new();
    if accessions.is_empty() {
        return Ok(resolved);
    }

    let batch = session.batch_coordinates(accessions)?;

    for accession in accessions {
        let coordinate = match batch.get(accession) {
            Some(found) => found.clone(),
            None => {
                debug!("{accession} missing from batch answer, resolving individually");
                match session.coordinate(accession) {
                    Ok(found) => found,
                    Err(EngineError::Cancelled) => return Err(EngineError::Cancelled),
                    Err(EngineError::Provider(e)) => {
                        warn!("Coordinate lookup for {accession} failed: {e}");
                        Lookup::Absent
                    }
                }
            }
        };
        resolved.insert(accession.clone(), coordinate);
    }

    Ok(resolved)
}
