use std::io;
use thiserror::Error;

/// Fatal, non-recoverable errors surfaced by the carving pipeline.
///
/// These are distinct from per-region outcomes such as a parser failing to find an end
/// marker or a validator rejecting a candidate — those are represented as plain values
/// (`Option`/`bool`) and never raised as errors. A `CarveError` means startup or
/// persistence itself is broken and the operator must intervene.
#[derive(Error, Debug)]
pub enum CarveError {
    #[error("malformed index entry on line {line}: {reason}")]
    IndexParse { line: usize, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("validator dependency unavailable: {0}")]
    MissingValidator(String),
}
