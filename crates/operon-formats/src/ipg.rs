//! NCBI identical-protein-group reports (`efetch db=protein rettype=ipg`).
//!
//! Only the first protein of a report and the first CDS of that protein are
//! used to place an accession on a genome.

use log::warn;
use operon_core::annotation::{CdsCoordinate, Strand};
use operon_core::lookup::Lookup;
use serde::Deserialize;

use crate::ParseError;

/// One `IPGReport` reduced to the coordinate it implies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpgReport {
    /// The accession the report answers for (`product_acc`). Reports without
    /// it cannot be tied back to a request.
    pub product_accession: Option<String>,
    /// `Absent` when the report lists no proteins or the protein has no CDS.
    pub cds: Lookup<CdsCoordinate>,
}

/// Parse an `IPGReportSet` document.
///
/// Fails when the document is not XML or holds no `IPGReport` at all.
pub fn parse_ipg_report(xml: &str) -> Result<Vec<IpgReport>, ParseError> {
    let parsed: IpgReportSetXml =
        quick_xml::de::from_str(xml).map_err(|e| ParseError::Xml(e.to_string()))?;

    if parsed.reports.is_empty() {
        return Err(ParseError::MissingField("IPGReport"));
    }

    Ok(parsed.reports.into_iter().map(report_from_xml).collect())
}

fn report_from_xml(report: IpgReportXml) -> IpgReport {
    let cds = report
        .protein_list
        .and_then(|list| list.proteins.into_iter().next())
        .and_then(|protein| protein.cds_list)
        .and_then(|list| list.cds.into_iter().next());

    let cds = match cds {
        Some(cds) => coordinate_from_xml(cds, report.product_acc.as_deref()),
        None => Lookup::Absent,
    };

    IpgReport {
        product_accession: report.product_acc,
        cds,
    }
}

fn coordinate_from_xml(cds: CdsXml, product: Option<&str>) -> Lookup<CdsCoordinate> {
    let product = product.unwrap_or("?");
    let (Some(genome_id), Some(start), Some(stop)) = (cds.accver, cds.start, cds.stop) else {
        warn!("IPG report for {product} has an incomplete CDS entry");
        return Lookup::Absent;
    };

    let strand = match cds.strand.as_deref().map(Strand::from_symbol) {
        Some(Some(strand)) => strand,
        _ => {
            warn!(
                "IPG report for {product} has unreadable strand {:?}",
                cds.strand
            );
            return Lookup::Absent;
        }
    };

    Lookup::Found(CdsCoordinate::new(
        genome_id,
        start.min(stop),
        start.max(stop),
        strand,
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename = "IPGReportSet")]
struct IpgReportSetXml {
    #[serde(rename = "IPGReport", default)]
    reports: Vec<IpgReportXml>,
}

#[derive(Debug, Deserialize)]
struct IpgReportXml {
    #[serde(rename = "@product_acc")]
    product_acc: Option<String>,
    #[serde(rename = "ProteinList")]
    protein_list: Option<ProteinListXml>,
}

#[derive(Debug, Deserialize)]
struct ProteinListXml {
    #[serde(rename = "Protein", default)]
    proteins: Vec<ProteinXml>,
}

#[derive(Debug, Deserialize)]
struct ProteinXml {
    #[serde(rename = "CDSList")]
    cds_list: Option<CdsListXml>,
}

#[derive(Debug, Deserialize)]
struct CdsListXml {
    #[serde(rename = "CDS", default)]
    cds: Vec<CdsXml>,
}

#[derive(Debug, Deserialize)]
struct CdsXml {
    #[serde(rename = "@accver")]
    accver: Option<String>,
    #[serde(rename = "@start")]
    start: Option<u64>,
    #[serde(rename = "@stop")]
    stop: Option<u64>,
    #[serde(rename = "@strand")]
    strand: Option<String>,
}
