use operon_core::annotation::GeneAnnotation;
use operon_core::context::{Operon, Segment, SegmentKind, Segments};

/// Split a genome fragment into per-gene, overlap and spacer segments.
///
/// `fragment` holds the bases from the first gene's start to the last gene's
/// stop. Bases shared with the next gene go into `overlap{N}` and are cut from
/// both genes; bases between genes go into `spacer{N}`; bases after the last
/// gene go into a trailing spacer. Returns the segments and whether they
/// concatenate back to `fragment`.
pub fn reconstruct(fragment: &str, operon: &Operon) -> (Segments, bool) {
    let segments = split(fragment.as_bytes(), &operon.genes);
    let matches = segments.concatenate() == fragment;
    (segments, matches)
}

fn split(bases: &[u8], genes: &[GeneAnnotation]) -> Segments {
    let Some(origin) = genes.first().map(|g| g.start) else {
        return Segments::default();
    };
    let len = bases.len();
    // Offsets relative to the fragment, end-exclusive and clamped to it.
    let offset = |pos: u64| (pos.saturating_sub(origin) as usize).min(len);
    let slice = |from: usize, to: usize| {
        if from < to {
            String::from_utf8_lossy(&bases[from..to]).into_owned()
        } else {
            String::new()
        }
    };

    let mut segments = Vec::new();
    let mut cursor = 0;

    for (index, gene) in genes.iter().enumerate() {
        let gene_start = offset(gene.start).max(cursor);
        let gene_end = offset(gene.stop.saturating_add(1));
        let next_start = genes.get(index + 1).map(|next| offset(next.start));

        let (body_end, overlap) = match next_start {
            Some(next) if next < gene_end && next >= gene_start => (next, Some((next, gene_end))),
            _ => (gene_end, None),
        };

        segments.push(Segment {
            kind: SegmentKind::Gene {
                strand: gene.strand,
            },
            index,
            sequence: slice(gene_start, body_end),
        });
        if let Some((from, to)) = overlap {
            segments.push(Segment {
                kind: SegmentKind::Overlap,
                index,
                sequence: slice(from, to),
            });
        }

        cursor = cursor.max(gene_end);
        let spacer_end = next_start.unwrap_or(len);
        if spacer_end > cursor {
            segments.push(Segment {
                kind: SegmentKind::Spacer,
                index,
                sequence: slice(cursor, spacer_end),
            });
            cursor = spacer_end;
        }
    }

    Segments(segments)
}
