use sigmatch::error::ScorerError;
use sigmatch::scorer::Scorer;

/// Scores 100 for byte-identical `raw` strings and 0 otherwise: the
/// degenerate but fully predictable stand-in for the real fuzzy-compare
/// primitive.
pub fn equality_scorer() -> Box<dyn Scorer> {
    Box::new(|a: &str, b: &str| -> Result<u8, ScorerError> { Ok(if a == b { 100 } else { 0 }) })
}

/// Always returns the same score.
#[allow(dead_code)]
pub fn const_scorer(score: u8) -> Box<dyn Scorer> {
    Box::new(move |_: &str, _: &str| -> Result<u8, ScorerError> { Ok(score) })
}
