use crate::ParseError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastaRecord {
    /// Header line without the leading `>`.
    pub header: String,
    pub sequence: String,
}

/// Parse a FASTA format string into one or more records
pub fn parse(input: &str) -> Result<Vec<FastaRecord>, ParseError> {
    let mut records = Vec::new();
    let mut current_header: Option<String> = None;
    let mut current_seq = String::new();

    for line in input.lines() {
        let trimmed = line.trim();

        if trimmed.is_empty() || trimmed.starts_with(';') {
            continue;
        }

        if let Some(header) = trimmed.strip_prefix('>') {
            if let Some(prev) = current_header.take() {
                records.push(FastaRecord {
                    header: prev,
                    sequence: std::mem::take(&mut current_seq),
                });
            }
            current_header = Some(header.trim().to_string());
        } else if current_header.is_some() {
            push_residues(&mut current_seq, trimmed);
        } else {
            return Err(ParseError::InvalidFormat(
                "Sequence data before the first FASTA header".to_string(),
            ));
        }
    }

    if let Some(header) = current_header {
        records.push(FastaRecord {
            header,
            sequence: current_seq,
        });
    }

    if records.is_empty() {
        return Err(ParseError::InvalidFormat(
            "No records found in FASTA input".to_string(),
        ));
    }

    Ok(records)
}

/// Header lines of a FASTA document, in order.
///
/// A `fasta_cds_aa` window yields one header per annotated gene; these are the
/// raw annotation records.
pub fn headers(input: &str) -> Vec<String> {
    input
        .lines()
        .filter_map(|line| line.trim().strip_prefix('>'))
        .map(|header| header.trim().to_string())
        .collect()
}

/// Residues of every record in the document joined into one string.
pub fn sequence(input: &str) -> Result<String, ParseError> {
    let records = parse(input)?;
    Ok(records.into_iter().map(|r| r.sequence).collect())
}

fn push_residues(seq: &mut String, line: &str) {
    seq.extend(
        line.chars()
            .filter(|c| c.is_ascii_alphabetic())
            .map(|c| c.to_ascii_uppercase()),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_record() {
        let input = ">NC_000913.3:190-255 Escherichia coli\nATGAAACGCA\nTTAGCACCAC\n\n";
        let records = parse(input).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].header, "NC_000913.3:190-255 Escherichia coli");
        assert_eq!(records[0].sequence, "ATGAAACGCATTAGCACCAC");
    }

    #[test]
    fn test_sequence_lowercase_normalized() {
        assert_eq!(sequence(">x\nacgt\nnnAC\n").unwrap(), "ACGTNNAC");
    }

    #[test]
    fn test_header_only_record_is_empty_sequence() {
        assert_eq!(sequence(">x\n").unwrap(), "");
    }

    #[test]
    fn test_headers() {
        let input = ">lcl|a [locus_tag=b0001]\nMKR\n>lcl|b [locus_tag=b0002]\nMRV\n";
        assert_eq!(
            headers(input),
            vec!["lcl|a [locus_tag=b0001]", "lcl|b [locus_tag=b0002]"]
        );
    }

    #[test]
    fn test_empty_input() {
        assert!(parse("").is_err());
        assert!(parse("ACGT\n").is_err());
    }
}
