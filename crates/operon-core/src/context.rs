use std::sync::LazyLock;

use regex::Regex;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::annotation::{GeneAnnotation, Strand};
use crate::lookup::Lookup;

static REGULATOR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"regulator|repressor|activator").expect("valid regex"));

/// Annotated genes around a query gene, in the provider's positional order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneWindow {
    pub genes: Vec<GeneAnnotation>,
    /// Index of the gene matching the resolved query coordinate.
    pub query_index: usize,
}

impl GeneWindow {
    pub fn query(&self) -> &GeneAnnotation {
        &self.genes[self.query_index]
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }
}

/// A contiguous run of window genes predicted to be co-transcribed with the
/// query gene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operon {
    pub genes: Vec<GeneAnnotation>,
    /// Position of the query gene within `genes`.
    pub query_index: usize,
    /// Strand of the query gene the walk started from.
    pub strand: Strand,
}

impl Operon {
    pub fn query(&self) -> &GeneAnnotation {
        &self.genes[self.query_index]
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    /// Genomic span from the first gene's start to the last gene's stop.
    pub fn bounds(&self) -> Option<(u64, u64)> {
        let first = self.genes.first()?;
        let last = self.genes.last()?;
        Some((first.start, last.stop))
    }

    /// Genes whose description names them as a transcriptional regulator.
    pub fn regulator_candidates(&self) -> impl Iterator<Item = &GeneAnnotation> {
        self.genes
            .iter()
            .filter(|g| REGULATOR_PATTERN.is_match(&g.description))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegionType {
    /// Intergenic region next to a divergently transcribed neighbor.
    AdjacentDivergent,
    /// First intergenic gap inside the operon longer than the gap threshold.
    LongIntergenic,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromoterRegion {
    pub sequence: String,
    pub region_type: RegionType,
    /// Genomic bounds of the region, 1-based inclusive.
    pub start: u64,
    pub stop: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SegmentKind {
    Gene { strand: Strand },
    Overlap,
    Spacer,
}

/// One named piece of a reconstructed genome fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub kind: SegmentKind,
    /// Position of the gene this segment belongs to, in assembly order.
    pub index: usize,
    pub sequence: String,
}

impl Segment {
    pub fn name(&self) -> String {
        match self.kind {
            SegmentKind::Gene {
                strand: Strand::Forward,
            } => format!("gene{}fwd", self.index),
            SegmentKind::Gene {
                strand: Strand::Reverse,
            } => format!("gene{}", self.index),
            SegmentKind::Overlap => format!("overlap{}", self.index),
            SegmentKind::Spacer => format!("spacer{}", self.index),
        }
    }
}

/// Ordered segments of a fragment. Serializes as an ordered `name -> bases`
/// object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Segments(pub Vec<Segment>);

impl Segments {
    pub fn iter(&self) -> std::slice::Iter<'_, Segment> {
        self.0.iter()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|s| s.name() == name)
            .map(|s| s.sequence.as_str())
    }

    pub fn names(&self) -> Vec<String> {
        self.0.iter().map(Segment::name).collect()
    }

    /// All segment bases joined in emitted order.
    pub fn concatenate(&self) -> String {
        self.0.iter().map(|s| s.sequence.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Segments {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for segment in &self.0 {
            map.serialize_entry(&segment.name(), &segment.sequence)?;
        }
        map.end()
    }
}

/// Everything inferred about the genomic neighborhood of one accession.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperonContext {
    pub operon: Operon,
    pub enzyme_index: usize,
    pub enzyme_direction: Strand,
    pub reconstructed_segments: Segments,
    pub reassembly_match: bool,
    pub promoter: Lookup<PromoterRegion>,
    pub genome_id: String,
}
