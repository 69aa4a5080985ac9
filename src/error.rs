use std::io;

use thiserror::Error;

/// Reason a single corpus line was rejected by the signature parser.
///
/// Parse failures are per-line and recoverable: the loader records the line
/// number and kind, then moves on to the next line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    /// The line was empty after newline chopping.
    #[error("empty signature")]
    EmptySignature,

    /// The block size prefix was empty, non-decimal, or overflowed 32 bits.
    #[error("missing or malformed block size")]
    MissingBlocksize,

    /// A `:` separating the signature components could not be located.
    #[error("missing component separator")]
    MissingSeparator,

    /// A signature component contained a byte outside the base64 alphabet.
    #[error("byte outside the base64 alphabet")]
    InvalidAlphabet,

    /// The filename opened a quote that was never closed.
    #[error("unterminated quote in filename")]
    UnterminatedQuote,
}

/// A rejected signature line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{kind}")]
pub struct ParseError {
    kind: ParseErrorKind,
}

impl ParseError {
    pub(crate) fn new(kind: ParseErrorKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> ParseErrorKind {
        self.kind
    }
}

/// Fatal outcome of a corpus load attempt.
///
/// Either way the engine keeps everything inserted before the failure; only
/// the load attempt itself is abandoned.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The first line of the stream was not a recognized header.
    #[error("{0}: invalid file header")]
    InvalidHeader(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// The scorer's "these signatures are malformed" answer, the `-1` of the C
/// ABI. The engine reports the pair and skips it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("signature pair rejected by scorer")]
pub struct ScorerError;
