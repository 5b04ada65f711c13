use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use operon_core::annotation::{CdsCoordinate, Strand};
use operon_core::context::{OperonContext, RegionType};
use operon_core::lookup::Lookup;
use operon_core::provider::{GenomicProvider, ProviderError};
use operon_engine::{CancellationToken, ContextEngine, EngineConfig, EngineError, RetryPolicy};
use operon_ncbi::NcbiConfig;

const GENOME: &str = "NC_TEST.1";
const BROKEN_GENOME: &str = "NC_BROKEN.1";

struct MockGene {
    accession: &'static str,
    locus_tag: &'static str,
    description: &'static str,
    start: u64,
    stop: u64,
    strand: Strand,
}

/// Genes in positional order on `GENOME`.
///
/// ```text
/// r1(-) 700..1600 | a1(+) 1801..2700 | a2(+) 2750..3650 | a3(+) 3640..4500
/// a4(-) 4700..5600 | a5(-) 5700..6500 | a6(+) 6700..7500
/// ```
fn test_genes() -> Vec<MockGene> {
    fn gene(
        accession: &'static str,
        locus_tag: &'static str,
        description: &'static str,
        start: u64,
        stop: u64,
        strand: Strand,
    ) -> MockGene {
        MockGene {
            accession,
            locus_tag,
            description,
            start,
            stop,
            strand,
        }
    }
    vec![
        gene("WP_R.1", "r1", "LysR family transcriptional regulator", 700, 1600, Strand::Reverse),
        gene("WP_1.1", "a1", "4'-hydroxybenzoate hydroxylase", 1801, 2700, Strand::Forward),
        gene("WP_2.1", "a2", "MFS transporter", 2750, 3650, Strand::Forward),
        gene("WP_3.1", "a3", "porin", 3640, 4500, Strand::Forward),
        gene("WP_4.1", "a4", "hypothetical protein", 4700, 5600, Strand::Reverse),
        gene("WP_5.1", "a5", "dehydrogenase", 5700, 6500, Strand::Reverse),
        gene("WP_6.1", "a6", "TetR family repressor", 6700, 7500, Strand::Forward),
    ]
}

/// Deterministic pseudo-random nucleotides.
fn test_genome(len: usize) -> String {
    let mut state: u32 = 0x2545_f491;
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            ['A', 'C', 'G', 'T'][((state >> 16) & 3) as usize]
        })
        .collect()
}

struct MockProvider {
    genes: Vec<MockGene>,
    genome: String,
    /// Batch answer; accessions missing here are "not mentioned".
    ipg: HashMap<String, Lookup<CdsCoordinate>>,
    single: HashMap<String, Lookup<CdsCoordinate>>,
    /// Windows longer than this are refused, like an oversized efetch.
    max_window: u64,
    fail_batch: bool,
    cancel_on_window: Option<CancellationToken>,
    calls: Mutex<Vec<String>>,
}

impl MockProvider {
    fn new() -> Self {
        let genes = test_genes();
        let ipg = genes
            .iter()
            .filter(|g| g.accession != "WP_4.1")
            .map(|g| {
                (
                    g.accession.to_string(),
                    Lookup::Found(CdsCoordinate::new(GENOME, g.start, g.stop, g.strand)),
                )
            })
            .chain([
                ("WP_NOCDS.1".to_string(), Lookup::Absent),
                (
                    "WP_FLIP.1".to_string(),
                    Lookup::Found(CdsCoordinate::new(GENOME, 1801, 2700, Strand::Reverse)),
                ),
                (
                    "WP_BROKEN.1".to_string(),
                    Lookup::Found(CdsCoordinate::new(BROKEN_GENOME, 5000, 5900, Strand::Forward)),
                ),
            ])
            .collect();
        let single = HashMap::from([(
            "WP_4.1".to_string(),
            Lookup::Found(CdsCoordinate::new(GENOME, 4700, 5600, Strand::Reverse)),
        )]);

        Self {
            genes,
            genome: test_genome(20_000),
            ipg,
            single,
            max_window: 12_000,
            fail_batch: false,
            cancel_on_window: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn bases(&self, start: u64, stop: u64) -> String {
        self.genome[(start - 1) as usize..stop as usize].to_string()
    }

    fn header(index: usize, gene: &MockGene) -> String {
        let span = format!("{}..{}", gene.start, gene.stop);
        let location = match gene.strand {
            Strand::Forward => span,
            Strand::Reverse => format!("complement({span})"),
        };
        format!(
            "lcl|{GENOME}_prot_{}_{index} [locus_tag={}] [protein={}] [protein_id={}] [location={location}] [gbkey=CDS]",
            gene.accession, gene.locus_tag, gene.description, gene.accession
        )
    }
}

impl GenomicProvider for MockProvider {
    fn batch_coordinates(
        &self,
        accessions: &[String],
    ) -> Result<HashMap<String, Lookup<CdsCoordinate>>, ProviderError> {
        self.record(format!("batch {}", accessions.join(",")));
        if self.fail_batch {
            return Err(ProviderError::Http {
                status: 502,
                url: "efetch".to_string(),
            });
        }
        Ok(accessions
            .iter()
            .filter_map(|a| self.ipg.get(a).map(|c| (a.clone(), c.clone())))
            .collect())
    }

    fn coordinate(&self, accession: &str) -> Result<Lookup<CdsCoordinate>, ProviderError> {
        self.record(format!("coordinate {accession}"));
        Ok(self.single.get(accession).cloned().unwrap_or_default())
    }

    fn annotated_window(
        &self,
        genome_id: &str,
        start: u64,
        stop: u64,
    ) -> Result<Vec<String>, ProviderError> {
        self.record(format!("window {genome_id}:{start}-{stop}"));
        if let Some(token) = &self.cancel_on_window {
            token.cancel();
        }
        if genome_id != GENOME || stop - start + 1 > self.max_window {
            return Err(ProviderError::Upstream("window unavailable".to_string()));
        }
        Ok(self
            .genes
            .iter()
            .enumerate()
            .filter(|(_, g)| g.start >= start && g.stop <= stop)
            .map(|(i, g)| Self::header(i, g))
            .collect())
    }

    fn sequence(&self, genome_id: &str, start: u64, stop: u64) -> Result<String, ProviderError> {
        self.record(format!("sequence {genome_id}:{start}-{stop}"));
        if genome_id != GENOME {
            return Err(ProviderError::Timeout {
                url: genome_id.to_string(),
            });
        }
        Ok(self.bases(start, stop))
    }
}

fn config() -> EngineConfig {
    EngineConfig::default()
        .with_min_call_interval(Duration::ZERO)
        .with_retry(RetryPolicy {
            max_retries: 2,
            initial_backoff: Duration::ZERO,
        })
}

fn found(context: &Lookup<OperonContext>) -> &OperonContext {
    match context {
        Lookup::Found(context) => context,
        Lookup::Absent => panic!("expected an operon context"),
    }
}

fn tags(context: &OperonContext) -> Vec<&str> {
    context
        .operon
        .genes
        .iter()
        .map(|g| g.locus_tag.as_str())
        .collect()
}

#[test]
fn test_forward_query_with_divergent_regulator() {
    let engine = ContextEngine::new(MockProvider::new(), config());
    let context = engine.resolve_operon_context("WP_2.1").unwrap();
    let context = found(&context);

    assert_eq!(tags(context), vec!["r1", "a1", "a2", "a3"]);
    assert_eq!(context.enzyme_index, 2);
    assert_eq!(context.enzyme_direction, Strand::Forward);
    assert_eq!(context.genome_id, GENOME);

    assert!(context.reassembly_match);
    assert_eq!(
        context.reconstructed_segments.names(),
        vec![
            "gene0", "spacer0", "gene1fwd", "spacer1", "gene2fwd", "overlap2", "gene3fwd"
        ]
    );
    let provider = MockProvider::new();
    assert_eq!(
        context.reconstructed_segments.concatenate(),
        provider.bases(700, 4500)
    );
    assert_eq!(
        context.reconstructed_segments.get("overlap2"),
        Some(provider.bases(3640, 3650).as_str())
    );

    let promoter = context.promoter.as_ref().found().unwrap();
    assert_eq!(promoter.region_type, RegionType::AdjacentDivergent);
    assert_eq!((promoter.start, promoter.stop), (1601, 1800));
    assert_eq!(promoter.sequence, provider.bases(1601, 1800));

    let regulators: Vec<&str> = context
        .operon
        .regulator_candidates()
        .map(|g| g.locus_tag.as_str())
        .collect();
    assert_eq!(regulators, vec!["r1"]);
}

#[test]
fn test_window_shrinks_past_provider_limit() {
    let engine = ContextEngine::new(MockProvider::new(), config());
    engine.resolve_operon_context("WP_2.1").unwrap();

    let windows: Vec<String> = engine_calls(&engine)
        .into_iter()
        .filter(|c| c.starts_with("window"))
        .collect();
    assert_eq!(
        windows,
        vec!["window NC_TEST.1:1-13650", "window NC_TEST.1:1-8650"]
    );
}

#[test]
fn test_reverse_query_from_single_lookup() {
    let engine = ContextEngine::new(MockProvider::new(), config());
    let report = engine
        .run_batch(["WP_4.1"], &CancellationToken::new())
        .unwrap();
    let context = found(&report.contexts["WP_4.1"]);

    // a3(+) converges with the query and is left out.
    assert_eq!(tags(context), vec!["a4", "a5", "a6"]);
    assert_eq!(context.enzyme_index, 0);
    assert_eq!(context.enzyme_direction, Strand::Reverse);

    let promoter = context.promoter.as_ref().found().unwrap();
    assert_eq!(promoter.region_type, RegionType::AdjacentDivergent);
    assert_eq!((promoter.start, promoter.stop), (6501, 6699));

    let calls = engine_calls(&engine);
    assert_eq!(calls[0], "batch WP_4.1");
    assert_eq!(calls[1], "coordinate WP_4.1");
}

#[test]
fn test_absent_accessions_are_isolated() {
    let engine = ContextEngine::new(MockProvider::new(), config());
    let contexts = engine
        .resolve_operon_contexts(["WP_NOCDS.1", "WP_2.1", "WP_BROKEN.1", "WP_UNKNOWN.1"])
        .unwrap();

    assert_eq!(contexts.len(), 4);
    assert!(contexts["WP_NOCDS.1"].is_absent());
    // Every window attempt fails for this genome.
    assert!(contexts["WP_BROKEN.1"].is_absent());
    // Neither the batch nor the single lookup knows it.
    assert!(contexts["WP_UNKNOWN.1"].is_absent());
    assert!(contexts["WP_2.1"].is_found());

    let calls = engine_calls(&engine);
    let broken_windows = calls
        .iter()
        .filter(|c| c.starts_with("window NC_BROKEN.1"))
        .count();
    assert_eq!(broken_windows, 4);
    // An explicit absent from the batch is not retried.
    assert!(!calls.contains(&"coordinate WP_NOCDS.1".to_string()));
    assert!(calls.contains(&"coordinate WP_UNKNOWN.1".to_string()));
}

#[test]
fn test_lookups_are_memoized_within_a_batch() {
    let engine = ContextEngine::new(MockProvider::new(), config());
    let report = engine
        .run_batch(["WP_2.1", "WP_3.1", "WP_2.1"], &CancellationToken::new())
        .unwrap();

    assert_eq!(report.contexts.len(), 2);
    let a2 = found(&report.contexts["WP_2.1"]);
    let a3 = found(&report.contexts["WP_3.1"]);
    assert_eq!(tags(a2), tags(a3));
    assert_eq!(a3.enzyme_index, 3);
    assert_eq!(a2.promoter, a3.promoter);

    // Both accessions need the same fragment and promoter region.
    let calls = engine_calls(&engine);
    let unique: HashSet<&String> = calls.iter().collect();
    assert_eq!(unique.len(), calls.len(), "duplicate provider calls: {calls:?}");
    assert_eq!(report.stats.provider_calls, calls.len() as u64);
    assert_eq!(report.stats.cache_hits, 2);
}

#[test]
fn test_batch_failure_is_fatal() {
    let mut provider = MockProvider::new();
    provider.fail_batch = true;
    let engine = ContextEngine::new(provider, config());

    let result = engine.resolve_operon_contexts(["WP_2.1", "WP_3.1"]);
    assert_eq!(
        result.unwrap_err(),
        EngineError::Provider(ProviderError::Http {
            status: 502,
            url: "efetch".to_string()
        })
    );
    // 502 is transient: the batch is attempted once plus two retries.
    let batches = engine_calls(&engine)
        .into_iter()
        .filter(|c| c.starts_with("batch"))
        .count();
    assert_eq!(batches, 3);
}

#[test]
fn test_annotation_strand_overrides_ipg_strand() {
    // WP_FLIP.1 points at a1, which the annotation records as `+` while the
    // IPG report says `-`.
    let engine = ContextEngine::new(MockProvider::new(), config());
    let context = engine.resolve_operon_context("WP_FLIP.1").unwrap();
    let context = found(&context);

    assert_eq!(context.enzyme_direction, Strand::Forward);
    assert_eq!(context.operon.strand, Strand::Forward);
    assert_eq!(tags(context), vec!["r1", "a1", "a2", "a3"]);
    assert_eq!(context.enzyme_index, 1);
}

#[test]
fn test_ncbi_engine_uses_keyed_spacing() {
    let engine = ContextEngine::ncbi(NcbiConfig::default().with_api_key("abc")).unwrap();
    assert_eq!(engine.gate().interval(), Duration::from_millis(100));
    assert_eq!(engine.config().min_call_interval, Duration::from_millis(100));
}

#[test]
fn test_cancelled_batch_stops_issuing_calls() {
    let engine = ContextEngine::new(MockProvider::new(), config());
    let cancel = CancellationToken::new();
    cancel.cancel();
    assert_eq!(
        engine.run_batch(["WP_2.1"], &cancel).unwrap_err(),
        EngineError::Cancelled
    );
    assert!(engine_calls(&engine).is_empty());

    let cancel = CancellationToken::new();
    let mut provider = MockProvider::new();
    provider.cancel_on_window = Some(cancel.clone());
    let engine = ContextEngine::new(provider, config());
    assert_eq!(
        engine.run_batch(["WP_2.1"], &cancel).unwrap_err(),
        EngineError::Cancelled
    );
    let calls = engine_calls(&engine);
    assert_eq!(calls.len(), 2, "{calls:?}");
    assert!(calls.iter().all(|c| !c.starts_with("sequence")));
}

#[test]
fn test_empty_batch_makes_no_calls() {
    let engine = ContextEngine::new(MockProvider::new(), config());
    let contexts = engine.resolve_operon_contexts(Vec::<String>::new()).unwrap();
    assert!(contexts.is_empty());
    assert!(engine_calls(&engine).is_empty());
}

#[test]
fn test_operon_invariants() {
    let engine = ContextEngine::new(MockProvider::new(), config());
    let accessions: Vec<&str> = test_genes().iter().map(|g| g.accession).collect();
    let contexts = engine.resolve_operon_contexts(accessions).unwrap();

    for (accession, context) in &contexts {
        let Lookup::Found(context) = context else {
            continue;
        };
        let query = &context.operon.genes[context.enzyme_index];
        assert_eq!(&query.accession, accession);
        assert!(context.reassembly_match, "{accession}");
        assert!(context
            .operon
            .genes
            .iter()
            .all(|g| g.start.abs_diff(query.start) <= 8_000));
        if let Lookup::Found(promoter) = &context.promoter {
            assert!(promoter.sequence.len() <= 1_000);
        }
    }
}

#[test]
fn test_serialized_output() {
    let engine = ContextEngine::new(MockProvider::new(), config());
    let contexts = engine
        .resolve_operon_contexts(["WP_2.1", "WP_NOCDS.1"])
        .unwrap();
    let json = serde_json::to_value(&contexts).unwrap();

    assert_eq!(json["WP_NOCDS.1"], "EMPTY");
    let context = &json["WP_2.1"];
    assert_eq!(context["enzyme_index"], 2);
    assert_eq!(context["enzyme_direction"], "+");
    assert_eq!(context["genome_id"], GENOME);
    assert_eq!(context["operon"]["genes"][0]["strand"], "-");
    assert_eq!(
        context["operon"]["genes"][1]["description"],
        "4-hydroxybenzoate hydroxylase"
    );
    let segments = context["reconstructed_segments"].as_object().unwrap();
    assert_eq!(
        segments.keys().next().map(String::as_str),
        Some("gene0")
    );
    assert_eq!(context["promoter"]["region_type"], "AdjacentDivergent");
}

fn engine_calls(engine: &ContextEngine<MockProvider>) -> Vec<String> {
    engine.provider().calls()
}
