//! Parser for the bracketed-tag headers of NCBI `fasta_cds_aa` records, e.g.
//!
//! ```text
//! lcl|NC_000913.3_prot_NP_414542.1_1 [gene=thrL] [locus_tag=b0001]
//!     [protein=thr operon leader peptide] [protein_id=NP_414542.1]
//!     [location=190..255] [gbkey=CDS]
//! ```

use log::debug;
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::char,
    combinator::{all_consuming, map, map_res},
    multi::separated_list1,
    sequence::{delimited, pair, separated_pair},
    IResult,
};
use operon_core::annotation::{GeneAnnotation, Strand};

use crate::ParseError;

/// Outer bounds and strand of a feature location, 1-based inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationSpan {
    pub start: u64,
    pub stop: u64,
    pub strand: Strand,
}

impl LocationSpan {
    fn new(a: u64, b: u64) -> Self {
        Self {
            start: a.min(b),
            stop: a.max(b),
            strand: Strand::Forward,
        }
    }
}

/// Parse one raw annotation record into gene metadata.
///
/// Never fails: missing or malformed tags leave the corresponding fields at
/// their defaults (empty strings, zero coordinates, `+` strand).
pub fn parse_record(raw: &str) -> GeneAnnotation {
    let (gene, problems) = parse_fields(raw);
    for problem in &problems {
        debug!("Partial annotation record ({problem}): {raw}");
    }
    gene
}

/// Like [`parse_record`], but reports the first missing or malformed field.
pub fn parse_record_strict(raw: &str) -> Result<GeneAnnotation, ParseError> {
    let (gene, problems) = parse_fields(raw);
    match problems.into_iter().next() {
        Some(problem) => Err(problem),
        None => Ok(gene),
    }
}

/// `key=value` pairs of the bracketed tags in a record header.
pub fn tags(raw: &str) -> impl Iterator<Item = (&str, &str)> {
    raw.split(" [").filter_map(|piece| {
        let piece = piece.trim().trim_start_matches('[');
        let piece = piece.strip_suffix(']').unwrap_or(piece);
        piece.split_once('=')
    })
}

fn parse_fields(raw: &str) -> (GeneAnnotation, Vec<ParseError>) {
    let mut gene = GeneAnnotation::default();
    let mut problems = Vec::new();
    let mut has_location = false;

    for (key, value) in tags(raw) {
        match key {
            "locus_tag" => gene.locus_tag = value.to_string(),
            "protein" => gene.description = value.replace('\'', ""),
            "protein_id" => gene.accession = value.to_string(),
            "location" => {
                has_location = true;
                match parse_location(value) {
                    Ok(span) => {
                        gene.start = span.start;
                        gene.stop = span.stop;
                        gene.strand = span.strand;
                    }
                    Err(e) => problems.push(e),
                }
            }
            _ => {}
        }
    }

    if !has_location {
        problems.push(ParseError::MissingField("location"));
    }

    (gene, problems)
}

/// Parse a feature location such as `190..255`, `complement(<1..>400)` or
/// `join(1..5,8..20)`.
///
/// Partial-range markers and other non-digit characters inside a bound are
/// stripped. Joined locations collapse to their outer bounds.
pub fn parse_location(raw: &str) -> Result<LocationSpan, ParseError> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let parsed = all_consuming(location)(compact.as_str())
        .map(|(_, span)| span)
        .map_err(|_| ParseError::InvalidLocation(raw.to_string()));
    parsed
}

fn location(input: &str) -> IResult<&str, LocationSpan> {
    alt((complement, join, range))(input)
}

fn complement(input: &str) -> IResult<&str, LocationSpan> {
    map(
        delimited(tag("complement("), location, char(')')),
        |span| LocationSpan {
            strand: span.strand.opposite(),
            ..span
        },
    )(input)
}

fn join(input: &str) -> IResult<&str, LocationSpan> {
    map(
        delimited(
            pair(alt((tag("join"), tag("order"))), char('(')),
            separated_list1(char(','), location),
            char(')'),
        ),
        merge_spans,
    )(input)
}

fn range(input: &str) -> IResult<&str, LocationSpan> {
    alt((
        map(separated_pair(bound, tag(".."), bound), |(a, b)| {
            LocationSpan::new(a, b)
        }),
        map(bound, |pos| LocationSpan::new(pos, pos)),
    ))(input)
}

fn bound(input: &str) -> IResult<&str, u64> {
    map_res(
        take_while1(|c: char| !matches!(c, '.' | ',' | '(' | ')')),
        digits_only,
    )(input)
}

fn digits_only(raw: &str) -> Result<u64, std::num::ParseIntError> {
    raw.chars()
        .filter(char::is_ascii_digit)
        .collect::<String>()
        .parse()
}

fn merge_spans(parts: Vec<LocationSpan>) -> LocationSpan {
    let strand = parts.first().map(|p| p.strand).unwrap_or_default();
    let start = parts.iter().map(|p| p.start).min().unwrap_or(0);
    let stop = parts.iter().map(|p| p.stop).max().unwrap_or(0);
    LocationSpan {
        start,
        stop,
        strand,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THRL: &str = "lcl|NC_000913.3_prot_NP_414542.1_1 [gene=thrL] [locus_tag=b0001] \
        [db_xref=UniProtKB/Swiss-Prot:P0AD86] [protein=thr operon leader peptide] \
        [protein_id=NP_414542.1] [location=190..255] [gbkey=CDS]";

    #[test]
    fn test_parse_forward_record() {
        let gene = parse_record(THRL);
        assert_eq!(gene.locus_tag, "b0001");
        assert_eq!(gene.description, "thr operon leader peptide");
        assert_eq!(gene.accession, "NP_414542.1");
        assert_eq!((gene.start, gene.stop), (190, 255));
        assert_eq!(gene.strand, Strand::Forward);
    }

    #[test]
    fn test_parse_complement_record() {
        let raw = ">lcl|NC_000913.3_prot_NP_414555.1_14 [locus_tag=b0014] \
            [protein=4'-phosphopantetheinyl transferase] [protein_id=NP_414555.1] \
            [location=complement(12163..14079)] [gbkey=CDS]";
        let gene = parse_record(raw);
        assert_eq!(gene.strand, Strand::Reverse);
        assert_eq!((gene.start, gene.stop), (12163, 14079));
        assert_eq!(gene.description, "4-phosphopantetheinyl transferase");
    }

    #[test]
    fn test_missing_protein_id_is_empty_accession() {
        let raw = "lcl|x [locus_tag=pseudo_1] [location=100..200] [gbkey=CDS]";
        let gene = parse_record(raw);
        assert_eq!(gene.accession, "");
        assert_eq!(gene.locus_tag, "pseudo_1");
        assert!(parse_record_strict(raw).is_ok());
    }

    #[test]
    fn test_missing_location_is_partial() {
        let raw = "lcl|x [locus_tag=b9] [protein_id=WP_1.1]";
        let gene = parse_record(raw);
        assert_eq!(gene.accession, "WP_1.1");
        assert_eq!((gene.start, gene.stop), (0, 0));
        assert_eq!(
            parse_record_strict(raw),
            Err(ParseError::MissingField("location"))
        );
    }

    #[test]
    fn test_parse_location_partial_markers() {
        let span = parse_location("<1..>400").unwrap();
        assert_eq!((span.start, span.stop), (1, 400));
        let span = parse_location("complement(<5..200)").unwrap();
        assert_eq!((span.start, span.stop, span.strand), (5, 200, Strand::Reverse));
    }

    #[test]
    fn test_parse_location_join() {
        let span = parse_location("join(100..200, 300..400)").unwrap();
        assert_eq!((span.start, span.stop), (100, 400));
        assert_eq!(span.strand, Strand::Forward);

        let span = parse_location("complement(join(3..5,9..12))").unwrap();
        assert_eq!((span.start, span.stop, span.strand), (3, 12, Strand::Reverse));
    }

    #[test]
    fn test_parse_location_invalid() {
        assert!(parse_location("unknown").is_err());
        assert!(parse_location("complement(1..5").is_err());
    }
}
