// linesift - core/matcher.rs
//
// The matcher contract and the engine registry. An engine is compiled once
// per process from the concatenated pattern bytes and then executed against
// arbitrary window slices by the scanner.

use crate::util::error::{FatalError, PatternResult};

/// A located match, relative to the slice passed to `execute`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchSpan {
    pub start: usize,
    pub end: usize,
}

/// Constraints shared by all engines. Case folding and the word/line anchors
/// are the engine's responsibility; the scanner only consumes line-confined
/// spans.
#[derive(Debug, Clone, Copy)]
pub struct MatcherOptions {
    pub case_insensitive: bool,
    pub word_match: bool,
    pub line_match: bool,
    pub eol_byte: u8,
}

/// A compiled pattern engine.
///
/// `execute` locates the first match wholly inside a single line of
/// `haystack`. A returned span with `start == haystack.len()` is the reserved
/// sentinel signal and is treated as no-match by the caller. Engines are
/// re-entrant across calls with different slices.
pub trait Matcher {
    fn execute(&self, haystack: &[u8]) -> Option<MatchSpan>;
}

/// Engine constructor signature: pattern bytes plus shared constraints.
pub type CompileFn = fn(&[u8], &MatcherOptions) -> PatternResult<Box<dyn Matcher>>;

/// Static engine registry. `default` is the fallback registration consulted
/// when a requested name is absent.
const ENGINES: &[(&str, CompileFn)] = &[
    ("default", crate::core::engines::compile_basic),
    ("basic", crate::core::engines::compile_basic),
    ("extended", crate::core::engines::compile_extended),
    ("fixed", crate::core::engines::compile_fixed),
    ("perl", crate::core::engines::compile_perl),
];

/// Look up `name` in the registry, falling back to `default`, and compile
/// the pattern. Compilation failures and an unresolvable name are fatal.
pub fn compile(
    name: &str,
    pattern: &[u8],
    options: &MatcherOptions,
) -> Result<Box<dyn Matcher>, FatalError> {
    let constructor = ENGINES
        .iter()
        .find(|(n, _)| *n == name)
        .or_else(|| ENGINES.iter().find(|(n, _)| *n == "default"))
        .map(|(_, f)| *f)
        .ok_or_else(|| FatalError::UnknownMatcher {
            name: name.to_string(),
        })?;

    tracing::debug!(engine = name, pattern_len = pattern.len(), "compiling matcher");
    constructor(pattern, options).map_err(FatalError::from)
}
