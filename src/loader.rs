use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{debug, warn};

use crate::engine::{MatchEngine, MatchHandler};
use crate::error::{LoadError, ParseErrorKind};

/// Header line of a version 1.0 known-hashes file.
pub const SSDEEP_HEADER_V1_0: &str = "ssdeep,1.0--blocksize:hash:hash,filename";
/// Header line of a version 1.1 known-hashes file.
pub const SSDEEP_HEADER_V1_1: &str = "ssdeep,1.1--blocksize:hash:hash,filename";

/// One rejected corpus line: where it was and why it fell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineError {
    /// 1-based line number within the corpus (the header is line 1).
    pub line: u64,
    pub kind: ParseErrorKind,
}

/// Outcome of a successful load attempt. Rejected lines are listed here
/// and logged; they never abort the load.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub source: String,
    /// Signatures inserted into the engine.
    pub loaded: u64,
    pub rejected: Vec<LineError>,
}

/// Only the header's own bytes count; anything after it on line 1 is
/// ignored, as are the chopped CR/LF.
fn is_known_header(line: &str) -> bool {
    line.starts_with(SSDEEP_HEADER_V1_0) || line.starts_with(SSDEEP_HEADER_V1_1)
}

/// Load a known-hashes file into the engine. The file's path becomes the
/// `match_file` of every signature it contributes.
pub fn load_path(engine: &mut MatchEngine, path: &Path) -> Result<LoadReport, LoadError> {
    let file = File::open(path)?;
    load_reader(engine, BufReader::new(file), &path.to_string_lossy())
}

/// Load a known-hashes stream into the engine via
/// [`MatchEngine::add`]. `source` names the corpus for `match_file`
/// purposes and diagnostics.
pub fn load_reader(
    engine: &mut MatchEngine,
    reader: impl BufRead,
    source: &str,
) -> Result<LoadReport, LoadError> {
    load_inner(engine, reader, source, LineAction::Insert)
}

/// Like [`load_path`], but every signature is run through
/// [`MatchEngine::add_and_compare`] as it streams in.
pub fn load_and_match_path(
    engine: &mut MatchEngine,
    path: &Path,
    handler: &mut dyn MatchHandler,
) -> Result<LoadReport, LoadError> {
    let file = File::open(path)?;
    load_and_match_reader(engine, BufReader::new(file), &path.to_string_lossy(), handler)
}

/// Like [`load_reader`], but compares each signature against everything
/// loaded before it (compare-then-insert), so a whole-corpus self-match
/// pass reports each unordered pair exactly once. This is the ingestion
/// path for the pretty and cluster pipelines.
pub fn load_and_match_reader(
    engine: &mut MatchEngine,
    reader: impl BufRead,
    source: &str,
    handler: &mut dyn MatchHandler,
) -> Result<LoadReport, LoadError> {
    load_inner(engine, reader, source, LineAction::InsertAndCompare(handler))
}

/// Stream a signature file as queries only: each line is compared against
/// the index and never inserted. `report.loaded` counts queries run. The
/// file needs the same header as a known-hashes file.
pub fn compare_path(
    engine: &mut MatchEngine,
    path: &Path,
    handler: &mut dyn MatchHandler,
) -> Result<LoadReport, LoadError> {
    let file = File::open(path)?;
    compare_reader(engine, BufReader::new(file), &path.to_string_lossy(), handler)
}

/// Reader form of [`compare_path`].
pub fn compare_reader(
    engine: &mut MatchEngine,
    reader: impl BufRead,
    source: &str,
    handler: &mut dyn MatchHandler,
) -> Result<LoadReport, LoadError> {
    load_inner(engine, reader, source, LineAction::CompareOnly(handler))
}

/// What to do with each successfully parsed line.
enum LineAction<'a> {
    Insert,
    InsertAndCompare(&'a mut dyn MatchHandler),
    CompareOnly(&'a mut dyn MatchHandler),
}

fn load_inner(
    engine: &mut MatchEngine,
    reader: impl BufRead,
    source: &str,
    mut action: LineAction<'_>,
) -> Result<LoadReport, LoadError> {
    let mut lines = reader.lines();

    // Line 1 must be a recognized header; a missing or foreign first line
    // fails the whole attempt before anything is inserted.
    let header = match lines.next() {
        Some(line) => line?,
        None => return Err(LoadError::InvalidHeader(source.to_string())),
    };
    if !is_known_header(&header) {
        return Err(LoadError::InvalidHeader(source.to_string()));
    }

    let mut report = LoadReport {
        source: source.to_string(),
        ..LoadReport::default()
    };
    let mut line_number: u64 = 1;

    for line in lines {
        // An I/O failure mid-stream abandons the attempt; everything
        // inserted before it stays in the engine, usable.
        let line = line?;
        line_number += 1;

        match engine.parse(&line, Some(source)) {
            Ok(sig) => {
                match &mut action {
                    LineAction::Insert => {
                        engine.add(sig);
                    }
                    LineAction::InsertAndCompare(handler) => {
                        engine.add_and_compare(sig, &mut **handler);
                    }
                    LineAction::CompareOnly(handler) => {
                        engine.compare_against_known(&sig, &mut **handler);
                    }
                }
                report.loaded += 1;
            }
            Err(err) => {
                warn!(
                    source,
                    line = line_number,
                    kind = %err.kind(),
                    "invalid hash in line"
                );
                report.rejected.push(LineError {
                    line: line_number,
                    kind: err.kind(),
                });
            }
        }
    }

    debug!(
        source,
        loaded = report.loaded,
        rejected = report.rejected.len(),
        "corpus loaded"
    );
    Ok(report)
}
