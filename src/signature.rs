use std::fmt;

use crate::error::{ParseError, ParseErrorKind};

/// One parsed CTPH signature, as loaded from a line of a known-hashes file
/// or handed in by a caller that computed it from a live file.
///
/// The textual form is `BLOCKSIZE:S1:S2` optionally followed by
/// `,FILENAME` or `,"FILENAME"`. `s1` covers the file at `blocksize`,
/// `s2` at `blocksize * 2`. `raw` keeps the `BLOCKSIZE:S1:S2` prefix
/// exactly as parsed; it is what the scorer consumes.
///
/// A signature is immutable once constructed. Its `id` is unique for the
/// lifetime of the parser that produced it and is what index buckets,
/// seen-sets and clusters use to refer to it.
#[derive(Debug, Clone)]
pub struct Signature {
    id: u64,
    blocksize: u32,
    s1: String,
    s2: String,
    raw: String,
    filename: Option<String>,
    match_file: Option<String>,
}

impl Signature {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn blocksize(&self) -> u32 {
        self.blocksize
    }

    pub fn s1(&self) -> &str {
        &self.s1
    }

    pub fn s2(&self) -> &str {
        &self.s2
    }

    /// The `BLOCKSIZE:S1:S2` prefix, verbatim. Passed to the scorer.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// The known-hashes file this signature was loaded from, if any.
    pub fn match_file(&self) -> Option<&str> {
        self.match_file.as_deref()
    }

    /// Attach a filename after the fact, e.g. when the signature came from
    /// hashing a live file rather than from a corpus line.
    pub fn with_filename(mut self, name: impl Into<String>) -> Self {
        self.filename = Some(name.into());
        self
    }
}

/// Signature identity is `(raw, match_file)`: the same hash loaded from two
/// different corpora is two distinct signatures, while the filename plays
/// no part. Pretty mode leans on exactly this equality to suppress
/// self-matches.
impl PartialEq for Signature {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw && self.match_file == other.match_file
    }
}

impl Eq for Signature {}

/// Reserializes as `blocksize:s1:s2,"filename"` with `"` re-escaped; the
/// output parses back to an equal signature.
impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)?;
        if let Some(name) = &self.filename {
            write!(f, ",\"{}\"", name.replace('"', "\\\""))?;
        }
        Ok(())
    }
}

/// Parses corpus lines into [`Signature`]s and owns the monotonic id
/// counter.
///
/// The id is consumed as soon as the block size has parsed, before any of
/// the remaining failure-prone steps, so a line rejected later still burns
/// its id. Gaps in the id sequence after a partially-bad corpus are
/// expected and observable.
#[derive(Debug, Default)]
pub struct SignatureParser {
    next_id: u64,
}

impl SignatureParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse one newline-chopped corpus line.
    ///
    /// `match_file` names the corpus the line came from; pass `None` for
    /// signatures that did not come out of a known-hashes file.
    pub fn parse_line(
        &mut self,
        line: &str,
        match_file: Option<&str>,
    ) -> Result<Signature, ParseError> {
        if line.is_empty() {
            return Err(ParseError::new(ParseErrorKind::EmptySignature));
        }

        let first = line
            .find(':')
            .ok_or_else(|| ParseError::new(ParseErrorKind::MissingSeparator))?;
        let prefix = &line[..first];
        if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseError::new(ParseErrorKind::MissingBlocksize));
        }
        let blocksize: u32 = prefix
            .parse()
            .map_err(|_| ParseError::new(ParseErrorKind::MissingBlocksize))?;

        // The id is burned here: a line that fails any later step leaves a
        // gap in the sequence rather than handing its id to the next line.
        let id = self.next_id;
        self.next_id += 1;

        let rest = &line[first + 1..];
        let second = rest
            .find(':')
            .ok_or_else(|| ParseError::new(ParseErrorKind::MissingSeparator))?;
        let s1 = &rest[..second];
        check_alphabet(s1)?;

        let tail = &rest[second + 1..];
        let (s2, filename_field) = match tail.find(',') {
            Some(comma) => (&tail[..comma], Some(&tail[comma + 1..])),
            None => (tail, None),
        };
        check_alphabet(s2)?;

        let filename = match filename_field {
            Some(field) => Some(unquote_filename(field)?),
            None => None,
        };

        Ok(Signature {
            id,
            blocksize,
            s1: s1.to_string(),
            s2: s2.to_string(),
            raw: format!("{blocksize}:{s1}:{s2}"),
            filename,
            match_file: match_file.map(str::to_string),
        })
    }
}

/// The 64-character spamsum alphabet: `A-Z a-z 0-9 + /`.
fn is_base64_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'+' || b == b'/'
}

fn check_alphabet(component: &str) -> Result<(), ParseError> {
    if component.bytes().all(is_base64_byte) {
        Ok(())
    } else {
        Err(ParseError::new(ParseErrorKind::InvalidAlphabet))
    }
}

/// Strip one pair of enclosing quotes if present and unescape `\"`.
/// An opening quote without its closing partner is an error; a bare
/// filename passes through untouched.
fn unquote_filename(field: &str) -> Result<String, ParseError> {
    if !field.starts_with('"') {
        return Ok(field.to_string());
    }
    if field.len() < 2 || !field.ends_with('"') {
        return Err(ParseError::new(ParseErrorKind::UnterminatedQuote));
    }
    let inner = &field[1..field.len() - 1];
    Ok(inner.replace("\\\"", "\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Result<Signature, ParseError> {
        SignatureParser::new().parse_line(line, None)
    }

    #[test]
    fn parses_bare_signature() {
        let sig = parse("3:abcdefgh:ijklmnop").unwrap();
        assert_eq!(sig.blocksize(), 3);
        assert_eq!(sig.s1(), "abcdefgh");
        assert_eq!(sig.s2(), "ijklmnop");
        assert_eq!(sig.raw(), "3:abcdefgh:ijklmnop");
        assert_eq!(sig.filename(), None);
        assert_eq!(sig.match_file(), None);
    }

    #[test]
    fn parses_quoted_and_bare_filenames() {
        let sig = parse("3:abc:def,\"a.bin\"").unwrap();
        assert_eq!(sig.filename(), Some("a.bin"));

        let sig = parse("3:abc:def,a.bin").unwrap();
        assert_eq!(sig.filename(), Some("a.bin"));

        // Commas inside the filename belong to the filename.
        let sig = parse("3:abc:def,\"a,b.bin\"").unwrap();
        assert_eq!(sig.filename(), Some("a,b.bin"));
    }

    #[test]
    fn unescapes_quotes_in_filename() {
        let sig = parse("3:abc:def,\"we \\\"quoted\\\" it\"").unwrap();
        assert_eq!(sig.filename(), Some("we \"quoted\" it"));
    }

    #[test]
    fn empty_components_are_valid() {
        let sig = parse("3::").unwrap();
        assert_eq!(sig.s1(), "");
        assert_eq!(sig.s2(), "");
        assert_eq!(sig.raw(), "3::");
    }

    #[test]
    fn rejects_empty_line() {
        assert_eq!(parse("").unwrap_err().kind(), ParseErrorKind::EmptySignature);
    }

    #[test]
    fn rejects_missing_separators() {
        assert_eq!(
            parse("garbage").unwrap_err().kind(),
            ParseErrorKind::MissingSeparator
        );
        assert_eq!(
            parse("3:onlyone").unwrap_err().kind(),
            ParseErrorKind::MissingSeparator
        );
    }

    #[test]
    fn rejects_bad_blocksize() {
        for line in [":abc:def", "x3:abc:def", "3x:abc:def", "12345678901:a:b"] {
            assert_eq!(
                parse(line).unwrap_err().kind(),
                ParseErrorKind::MissingBlocksize,
                "line {line:?}"
            );
        }
    }

    #[test]
    fn accepts_blocksize_up_to_u32() {
        let sig = parse("4294967295:abc:def").unwrap();
        assert_eq!(sig.blocksize(), u32::MAX);
    }

    #[test]
    fn rejects_alphabet_violations() {
        for line in ["3:ab c:def", "3:abc:de=f", "3:a\u{e9}b:def"] {
            assert_eq!(
                parse(line).unwrap_err().kind(),
                ParseErrorKind::InvalidAlphabet,
                "line {line:?}"
            );
        }
    }

    #[test]
    fn rejects_unterminated_quote() {
        assert_eq!(
            parse("3:abc:def,\"open").unwrap_err().kind(),
            ParseErrorKind::UnterminatedQuote
        );
        assert_eq!(
            parse("3:abc:def,\"").unwrap_err().kind(),
            ParseErrorKind::UnterminatedQuote
        );
    }

    #[test]
    fn identity_is_raw_and_match_file() {
        let mut parser = SignatureParser::new();
        let a = parser.parse_line("3:abc:def,\"x\"", Some("known_a.txt")).unwrap();
        let b = parser.parse_line("3:abc:def,\"y\"", Some("known_a.txt")).unwrap();
        let c = parser.parse_line("3:abc:def,\"x\"", Some("known_b.txt")).unwrap();
        let d = parser.parse_line("3:abc:def,\"x\"", None).unwrap();

        // Filename does not participate.
        assert_eq!(a, b);
        // A different corpus does.
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn ids_advance_even_when_parsing_fails_late() {
        let mut parser = SignatureParser::new();
        let a = parser.parse_line("3:abc:def", None).unwrap();
        // Bad alphabet: the block size parsed, so the id is consumed.
        parser.parse_line("3:a!c:def", None).unwrap_err();
        let b = parser.parse_line("3:ghi:jkl", None).unwrap();

        assert_eq!(a.id(), 0);
        assert_eq!(b.id(), 2);
    }

    #[test]
    fn ids_survive_early_failures_unconsumed() {
        let mut parser = SignatureParser::new();
        // No block size yet: no id burned.
        parser.parse_line("nonsense", None).unwrap_err();
        let a = parser.parse_line("3:abc:def", None).unwrap();
        assert_eq!(a.id(), 0);
    }

    #[test]
    fn live_file_signatures_take_a_filename_afterwards() {
        // A signature computed from a live file carries no filename of its
        // own; the caller attaches the path.
        let sig = parse("3:abcdefgh:ijklmnop").unwrap().with_filename("live.bin");
        assert_eq!(sig.filename(), Some("live.bin"));
        assert_eq!(sig.to_string(), "3:abcdefgh:ijklmnop,\"live.bin\"");
    }

    #[test]
    fn display_round_trips() {
        let mut parser = SignatureParser::new();
        let lines = [
            "3:abcdefgh:ijklmnop,\"a.bin\"",
            "3:abc:def",
            "768:aa+bb/cc:dd,\"spaced name.tar.gz\"",
            "3:abc:def,\"we \\\"quoted\\\" it\"",
        ];
        for line in lines {
            let sig = parser.parse_line(line, None).unwrap();
            let reparsed = parser.parse_line(&sig.to_string(), None).unwrap();
            assert_eq!(sig, reparsed, "line {line:?}");
            assert_eq!(sig.filename(), reparsed.filename(), "line {line:?}");
            assert_eq!(sig.blocksize(), reparsed.blocksize(), "line {line:?}");
        }
    }
}
