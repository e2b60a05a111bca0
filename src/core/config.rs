// linesift - core/config.rs
//
// The immutable search configuration, built once by the CLI layer and passed
// by shared reference everywhere else. No process-wide mutable state.

/// How files that look binary are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BinaryPolicy {
    /// Scan silently and report "Binary file NAME matches" on any match.
    #[default]
    Binary,
    /// Treat the bytes as text and print matching lines normally.
    Text,
    /// Skip binary files entirely, as if they contained no match.
    WithoutMatch,
}

/// How directory operands are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DirPolicy {
    /// Attempt to read the directory like a file (the read error surfaces).
    #[default]
    Read,
    /// Silently skip directories.
    Skip,
    /// Descend into directories recursively.
    Recurse,
}

/// What the output stream carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutMode {
    /// Matching lines (plus any requested context).
    #[default]
    Normal,
    /// One count per file.
    CountOnly,
    /// Names of files with at least one match.
    ListMatching,
    /// Names of files without any match.
    ListNonMatching,
    /// Nothing; only the exit status is of interest.
    Quiet,
}

/// Tri-state filename display resolved by the driver per input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilenameDisplay {
    /// Show when more than one input is searched or recursion is active.
    #[default]
    Auto,
    /// Always show (-H).
    Force,
    /// Never show (-h).
    Suppress,
}

/// Immutable search configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Registered engine name ("basic", "extended", "fixed", "perl",
    /// "default", or a `-X` supplied name).
    pub matcher_name: String,

    /// Concatenated pattern bytes, alternatives separated by `\n`.
    pub pattern: Vec<u8>,

    pub case_insensitive: bool,
    pub word_match: bool,
    pub line_match: bool,
    pub invert_match: bool,

    /// Record terminator: `\n` normally, `\0` in null-data mode.
    pub eol_byte: u8,

    /// Per-file cap on emitted lines. `None` means unbounded; `Some(0)` is
    /// handled before any scanning starts.
    pub max_count: Option<u64>,

    pub before_context: usize,
    pub after_context: usize,

    pub out_mode: OutMode,
    pub show_byte_offset: bool,
    pub show_line_number: bool,
    pub filename_display: FilenameDisplay,
    pub null_after_filename: bool,

    pub binary_policy: BinaryPolicy,
    pub dir_policy: DirPolicy,

    pub use_mmap: bool,
    pub suppress_errors: bool,
}

impl Config {
    /// True when any context was requested; gates the `--` group separator.
    pub fn context_requested(&self) -> bool {
        self.before_context > 0 || self.after_context > 0
    }

    /// True when per-line output is suppressed (count / list / quiet modes).
    pub fn out_quiet(&self) -> bool {
        !matches!(self.out_mode, OutMode::Normal)
    }

    /// True when a file's fate is decided by its first match, so the scan
    /// can stop there.
    pub fn done_on_match(&self) -> bool {
        matches!(self.out_mode, OutMode::ListMatching | OutMode::Quiet)
    }

    /// True when the whole process is decided by the first match (-q).
    pub fn exit_on_match(&self) -> bool {
        matches!(self.out_mode, OutMode::Quiet)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            matcher_name: "default".to_string(),
            pattern: Vec::new(),
            case_insensitive: false,
            word_match: false,
            line_match: false,
            invert_match: false,
            eol_byte: b'\n',
            max_count: None,
            before_context: 0,
            after_context: 0,
            out_mode: OutMode::default(),
            show_byte_offset: false,
            show_line_number: false,
            filename_display: FilenameDisplay::default(),
            null_after_filename: false,
            binary_policy: BinaryPolicy::default(),
            dir_policy: DirPolicy::default(),
            use_mmap: false,
            suppress_errors: false,
        }
    }
}
