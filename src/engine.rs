use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::cluster::{Cluster, ClusterId, ClusterManager};
use crate::config::MatchConfig;
use crate::error::ParseError;
use crate::index::NgramIndex;
use crate::scorer::Scorer;
use crate::signature::{Signature, SignatureParser};

/// Receives accepted matches. The engine guarantees the first signature is
/// the query and the second the known-side candidate; everything about
/// presentation (plain, CSV, and so on) is the handler's business.
pub trait MatchHandler {
    fn on_match(&mut self, query: &Signature, known: &Signature, score: u8);
}

/// Closures are handlers, which is what most call sites want.
impl<F> MatchHandler for F
where
    F: FnMut(&Signature, &Signature, u8),
{
    fn on_match(&mut self, query: &Signature, known: &Signature, score: u8) {
        self(query, known, score)
    }
}

/// One accepted match in list form: the known signature's id and the score
/// the scorer assigned to the pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoredMatch {
    pub id: u64,
    pub score: u8,
}

/// Running comparison counters, mostly interesting to tests and callers
/// that report load/query summaries.
#[derive(Debug, Default, Clone, Copy)]
pub struct EngineStats {
    /// Candidate pairs actually handed to the scorer.
    pub comparisons: u64,
    /// Pairs the scorer rejected as malformed.
    pub scorer_rejections: u64,
}

/// The fuzzy-hash match engine: the 7-gram index, the all-files list, the
/// parser (and with it the id counter), the cluster manager, and the
/// configuration, as one explicitly-passed value.
///
/// Single-threaded: ingestion and querying share the index without
/// synchronization, and all ordering below is deterministic given the
/// ingestion sequence.
pub struct MatchEngine {
    config: MatchConfig,
    scorer: Box<dyn Scorer>,
    parser: SignatureParser,
    index: NgramIndex,
    files: Vec<Signature>,
    by_id: HashMap<u64, usize>,
    clusters: ClusterManager,
    stats: EngineStats,
}

impl MatchEngine {
    pub fn new(mut config: MatchConfig, scorer: Box<dyn Scorer>) -> Self {
        // Scores never exceed 100, so a larger threshold would silently
        // match nothing.
        config.threshold = config.threshold.min(100);
        Self {
            config,
            scorer,
            parser: SignatureParser::new(),
            index: NgramIndex::new(),
            files: Vec::new(),
            by_id: HashMap::new(),
            clusters: ClusterManager::new(),
            stats: EngineStats::default(),
        }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    /// Parse a line through the engine's own parser, so known and query
    /// signatures draw ids from one sequence.
    pub fn parse(&mut self, line: &str, match_file: Option<&str>) -> Result<Signature, ParseError> {
        self.parser.parse_line(line, match_file)
    }

    /// Ingest a signature: index its windows and append it to the
    /// all-files list. Returns the signature's id.
    pub fn add(&mut self, sig: Signature) -> u64 {
        let id = sig.id();
        self.index.insert(&sig);
        self.by_id.insert(id, self.files.len());
        self.files.push(sig);
        id
    }

    /// Signatures in ingestion order.
    pub fn known_signatures(&self) -> &[Signature] {
        &self.files
    }

    pub fn signature(&self, id: u64) -> Option<&Signature> {
        self.by_id.get(&id).map(|&pos| &self.files[pos])
    }

    /// The primary query: score every known signature sharing a 7-byte
    /// window with `query` and emit the accepted ones, each candidate at
    /// most once, in the order candidates are first seen (window-major,
    /// then bucket ingestion order). Returns whether anything was
    /// accepted.
    ///
    /// In cluster mode accepted matches go to the cluster manager instead
    /// of the handler.
    pub fn compare_against_known(
        &mut self,
        query: &Signature,
        handler: &mut dyn MatchHandler,
    ) -> bool {
        let cluster_mode = self.config.cluster;
        let mut links: Vec<u64> = Vec::new();
        let mut emit = |known: &Signature, score: u8| {
            if cluster_mode {
                links.push(known.id());
            } else {
                handler.on_match(query, known, score);
            }
        };
        let matched = run_query(
            &self.config,
            &*self.scorer,
            &self.index,
            &self.files,
            &self.by_id,
            &mut self.stats,
            query,
            &mut emit,
        );
        for known_id in links {
            self.clusters.link(query.id(), known_id);
        }
        matched
    }

    /// [`compare_against_known`](Self::compare_against_known) in list
    /// form: the accepted `(known, score)` pairs, ignoring cluster mode.
    pub fn matches_for(&mut self, query: &Signature) -> Vec<ScoredMatch> {
        let mut out = Vec::new();
        let mut emit = |known: &Signature, score: u8| {
            out.push(ScoredMatch {
                id: known.id(),
                score,
            });
        };
        run_query(
            &self.config,
            &*self.scorer,
            &self.index,
            &self.files,
            &self.by_id,
            &mut self.stats,
            query,
            &mut emit,
        );
        out
    }

    /// Compare first, insert after: a stream of these yields each
    /// unordered pair of signatures exactly once, which is what the
    /// pretty and cluster pipelines want. Returns the ingested id.
    pub fn add_and_compare(&mut self, sig: Signature, handler: &mut dyn MatchHandler) -> u64 {
        let cluster_mode = self.config.cluster;
        let mut links: Vec<u64> = Vec::new();
        {
            let mut emit = |known: &Signature, score: u8| {
                if cluster_mode {
                    links.push(known.id());
                } else {
                    handler.on_match(&sig, known, score);
                }
            };
            run_query(
                &self.config,
                &*self.scorer,
                &self.index,
                &self.files,
                &self.by_id,
                &mut self.stats,
                &sig,
                &mut emit,
            );
        }
        let id = self.add(sig);
        for known_id in links {
            self.clusters.link(id, known_id);
        }
        id
    }

    /// The all-pairs traversal: every ingested signature queried against
    /// the full index, in ingestion order. With `pretty` set this is the
    /// classic "compare a directory of knowns against itself" mode;
    /// self-matches are suppressed by `(raw, match_file)` identity and
    /// every surviving unordered pair is reported twice, once from each
    /// side. Returns whether anything was accepted.
    pub fn compare_all_known(&mut self, handler: &mut dyn MatchHandler) -> bool {
        let cluster_mode = self.config.cluster;
        let mut links: Vec<(u64, u64)> = Vec::new();
        let mut any = false;
        for pos in 0..self.files.len() {
            let query = &self.files[pos];
            let mut emit = |known: &Signature, score: u8| {
                if cluster_mode {
                    links.push((query.id(), known.id()));
                } else {
                    handler.on_match(query, known, score);
                }
            };
            any |= run_query(
                &self.config,
                &*self.scorer,
                &self.index,
                &self.files,
                &self.by_id,
                &mut self.stats,
                query,
                &mut emit,
            );
        }
        for (a, b) in links {
            self.clusters.link(a, b);
        }
        debug!(
            known = self.files.len(),
            comparisons = self.stats.comparisons,
            "all-pairs traversal complete"
        );
        any
    }

    /// The clusters accumulated so far (cluster mode only ever populates
    /// this). Enumeration order is unspecified; compare by content.
    pub fn all_clusters(&self) -> impl Iterator<Item = &Cluster> {
        self.clusters.all_clusters()
    }

    pub fn cluster_of(&self, id: u64) -> Option<ClusterId> {
        self.clusters.cluster_of(id)
    }

    pub fn clusters(&self) -> &ClusterManager {
        &self.clusters
    }

    /// Resolve a cluster's members to their ingested signatures, in join
    /// order, for reporting. Ids that were linked without ever being
    /// ingested (pure-query links) have nothing to resolve to and are
    /// skipped.
    pub fn cluster_signatures<'a>(
        &'a self,
        cluster: &'a Cluster,
    ) -> impl Iterator<Item = &'a Signature> {
        cluster
            .members()
            .iter()
            .filter_map(move |&id| self.signature(id))
    }
}

/// One query against the index: generate candidates window-major,
/// deduplicate by id, pretty-skip, score, and emit everything accepted.
///
/// Free function over the engine's fields so callers can hold disjoint
/// borrows (the all-pairs traversal queries a signature that lives in
/// `files` itself).
#[allow(clippy::too_many_arguments)]
fn run_query(
    config: &MatchConfig,
    scorer: &dyn Scorer,
    index: &NgramIndex,
    files: &[Signature],
    by_id: &HashMap<u64, usize>,
    stats: &mut EngineStats,
    query: &Signature,
    emit: &mut dyn FnMut(&Signature, u8),
) -> bool {
    let mut seen: HashSet<u64> = HashSet::new();
    let mut matched = false;

    for id in index.candidates(query) {
        // Marked seen before any skip: a candidate dropped by pretty mode
        // or the scorer must not come back through a later window.
        if !seen.insert(id) {
            continue;
        }
        let pos = *by_id
            .get(&id)
            .expect("indexed id missing from the all-files list");
        let known = &files[pos];

        // Identity, not filename: the same hash loaded from another corpus
        // is still a reportable peer.
        if config.pretty && query == known {
            continue;
        }

        stats.comparisons += 1;
        match scorer.fuzzy_compare(query.raw(), known.raw()) {
            Err(_) => {
                warn!(
                    query_id = query.id(),
                    known_id = id,
                    "bad signature pair in comparison"
                );
                stats.scorer_rejections += 1;
            }
            Ok(score) => {
                if config.display_all || score > config.threshold {
                    emit(known, score);
                    matched = true;
                }
            }
        }
    }

    matched
}
