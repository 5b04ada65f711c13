use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strand {
    #[default]
    #[serde(rename = "+")]
    Forward,
    #[serde(rename = "-")]
    Reverse,
}

impl Strand {
    pub fn as_symbol(&self) -> char {
        match self {
            Strand::Forward => '+',
            Strand::Reverse => '-',
        }
    }

    /// Accepts the symbols used by NCBI reports (`+`/`-`) and the numeric
    /// form (`1`/`-1`).
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol.trim() {
            "+" | "1" | "+1" => Some(Strand::Forward),
            "-" | "-1" | "\u{2212}" => Some(Strand::Reverse),
            _ => None,
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Strand::Forward => Strand::Reverse,
            Strand::Reverse => Strand::Forward,
        }
    }
}

impl std::fmt::Display for Strand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_symbol())
    }
}

/// Genomic location of the coding sequence behind a protein accession.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CdsCoordinate {
    /// Versioned nucleotide accession of the genome record (e.g. `NC_000913.3`).
    pub genome_id: String,
    pub start: u64,
    pub stop: u64,
    pub strand: Strand,
}

impl CdsCoordinate {
    pub fn new(genome_id: impl Into<String>, start: u64, stop: u64, strand: Strand) -> Self {
        Self {
            genome_id: genome_id.into(),
            start,
            stop,
            strand,
        }
    }
}

/// A gene taken from an annotated genome window.
///
/// `start` and `stop` are 1-based and inclusive, with `start <= stop`
/// regardless of strand.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneAnnotation {
    #[serde(default)]
    pub accession: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub locus_tag: String,
    pub start: u64,
    pub stop: u64,
    pub strand: Strand,
}

impl GeneAnnotation {
    pub fn new(
        accession: impl Into<String>,
        locus_tag: impl Into<String>,
        start: u64,
        stop: u64,
        strand: Strand,
    ) -> Self {
        Self {
            accession: accession.into(),
            description: String::new(),
            locus_tag: locus_tag.into(),
            start,
            stop,
            strand,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Number of bases covered by the gene.
    pub fn span(&self) -> u64 {
        if self.stop < self.start {
            0
        } else {
            self.stop - self.start + 1
        }
    }

    /// True if the gene's span covers both `start` and `stop`.
    pub fn contains(&self, start: u64, stop: u64) -> bool {
        self.start <= start && start <= self.stop && self.start <= stop && stop <= self.stop
    }

    /// Distance between the start coordinates of two genes.
    pub fn start_distance(&self, other: &GeneAnnotation) -> u64 {
        self.start.abs_diff(other.start)
    }
}
