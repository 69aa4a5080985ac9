use crate::error::ScorerError;

/// The external fuzzy-compare primitive the engine scores candidates with.
///
/// This is the Rust seam for the C `fuzzy_compare(sig1, sig2)` ABI: both
/// arguments are full `BLOCKSIZE:S1:S2` strings, the result is a similarity
/// in `0..=100` (higher is more similar), and `Err(ScorerError)` stands in
/// for the ABI's `-1` on malformed input. Implementations must be
/// reentrant and side-effect-free; the engine may invoke them in any order
/// and will skip (and report) pairs they reject.
pub trait Scorer {
    fn fuzzy_compare(&self, a: &str, b: &str) -> Result<u8, ScorerError>;
}

/// Plain functions and closures work as scorers, which keeps tests and
/// FFI shims equally terse.
impl<F> Scorer for F
where
    F: Fn(&str, &str) -> Result<u8, ScorerError>,
{
    fn fuzzy_compare(&self, a: &str, b: &str) -> Result<u8, ScorerError> {
        self(a, b)
    }
}
