use std::collections::{HashMap, HashSet};

use crate::signature::Signature;

/// Window width of the inverted index. Two CTPH signatures can only score
/// above zero when they share a common substring of at least this length,
/// which is what makes the index a sound pre-filter.
pub const NGRAM_LEN: usize = 7;

/// Index key: one 7-byte window of a signature component.
pub type NgramKey = [u8; NGRAM_LEN];

/// Stand-in key for components shorter than a full window. All short
/// signatures land in this one bucket, so they stay reachable as each
/// other's candidates; the scorer remains the authority on whether any of
/// them actually match.
pub const SENTINEL_KEY: NgramKey = [b'A'; NGRAM_LEN];

/// Inverted map from 7-byte windows of `s1`/`s2` to the ids of the
/// signatures containing them.
///
/// Buckets have set semantics (an id at most once per key) and preserve
/// insertion order, so candidate enumeration is deterministic for a given
/// ingestion sequence. There is no eviction and no cap: bucket load is
/// bounded by corpus size times the at-most-128 window positions per
/// signature.
#[derive(Debug, Default)]
pub struct NgramIndex {
    buckets: HashMap<NgramKey, Vec<u64>>,
}

impl NgramIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every distinct window of both components of `sig`.
    pub fn insert(&mut self, sig: &Signature) {
        let mut inserted: HashSet<NgramKey> = HashSet::new();
        for key in window_keys(sig.s1()).chain(window_keys(sig.s2())) {
            if inserted.insert(key) {
                self.buckets.entry(key).or_default().push(sig.id());
            }
        }
    }

    /// Every known id sharing at least one window with either component of
    /// `sig`, window-major (all of `s1`'s windows first, then `s2`'s),
    /// bucket entries in ingestion order. Duplicates are permitted here;
    /// deduplicating per query is the match engine's job.
    pub fn candidates<'a>(&'a self, sig: &'a Signature) -> impl Iterator<Item = u64> + 'a {
        window_keys(sig.s1())
            .chain(window_keys(sig.s2()))
            .flat_map(move |key| self.bucket(&key).iter().copied())
    }

    /// The ids indexed under one key, in ingestion order.
    pub fn bucket(&self, key: &NgramKey) -> &[u64] {
        self.buckets.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

/// The window keys of one signature component: its contiguous 7-byte
/// substrings, or the sentinel key alone when the component is shorter
/// than one window.
fn window_keys(component: &str) -> impl Iterator<Item = NgramKey> + '_ {
    let bytes = component.as_bytes();
    let sentinel = (bytes.len() < NGRAM_LEN).then_some(SENTINEL_KEY);
    sentinel
        .into_iter()
        .chain(bytes.windows(NGRAM_LEN).map(to_key))
}

fn to_key(window: &[u8]) -> NgramKey {
    let mut key = [0u8; NGRAM_LEN];
    key.copy_from_slice(window);
    key
}
