// linesift - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
// Fatal errors terminate the process with status 2 before any scanning;
// per-file errors are reported and recorded but never abort the run.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Errors that terminate the process immediately with exit status 2.
///
/// Everything else in the program is a per-file condition handled in place
/// (see `app::run`), so this enum only carries the conditions that make the
/// invocation itself unusable.
#[derive(Debug)]
pub enum FatalError {
    /// No pattern was supplied via `-e`, `-f`, or a positional operand.
    MissingPattern,

    /// Two different matcher engines were selected (e.g. `-E` with `-F`).
    ConflictingMatchers,

    /// A context length (`-A`/`-B`/`-C`/`-NUM`) did not parse or overflowed.
    InvalidContextLength,

    /// The `-m` argument did not parse.
    InvalidMaxCount,

    /// `--binary-files` received an unrecognized type.
    UnknownBinaryType,

    /// `-d`/`--directories` received an unrecognized action.
    UnknownDirectoriesMethod,

    /// The requested matcher name resolved to no registered engine, not even
    /// the `default` fallback.
    UnknownMatcher { name: String },

    /// Pattern compilation failed.
    Pattern(PatternError),

    /// A `-f FILE` pattern source could not be read.
    PatternFileIo { path: PathBuf, source: io::Error },
}

impl fmt::Display for FatalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingPattern => write!(f, "missing pattern"),
            Self::ConflictingMatchers => write!(f, "conflicting matchers specified"),
            Self::InvalidContextLength => write!(f, "invalid context length argument"),
            Self::InvalidMaxCount => write!(f, "invalid max count"),
            Self::UnknownBinaryType => write!(f, "unknown binary-files type"),
            Self::UnknownDirectoriesMethod => write!(f, "unknown directories method"),
            Self::UnknownMatcher { name } => write!(f, "{name}: no such matcher"),
            Self::Pattern(e) => write!(f, "{e}"),
            Self::PatternFileIo { path, source } => {
                write!(f, "{}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for FatalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Pattern(e) => Some(e),
            Self::PatternFileIo { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<PatternError> for FatalError {
    fn from(e: PatternError) -> Self {
        Self::Pattern(e)
    }
}

// ---------------------------------------------------------------------------
// Pattern errors
// ---------------------------------------------------------------------------

/// Errors raised while translating or compiling a pattern.
#[derive(Debug)]
pub enum PatternError {
    /// The regex engine rejected the translated pattern.
    Compile { source: regex::Error },

    /// A basic-regexp back-reference (`\1`..`\9`), which the modern engine
    /// cannot express.
    BackReference { reference: String },

    /// A bracket expression was left unterminated.
    UnterminatedBracket,
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compile { source } => write!(f, "invalid pattern: {source}"),
            Self::BackReference { reference } => {
                write!(f, "unsupported back-reference '{reference}'")
            }
            Self::UnterminatedBracket => write!(f, "unmatched [ or [^"),
        }
    }
}

impl std::error::Error for PatternError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Compile { source } => Some(source),
            _ => None,
        }
    }
}

/// Convenience alias for fallible pattern compilation.
pub type PatternResult<T> = std::result::Result<T, PatternError>;
