// linesift - util/constants.rs
//
// Single source of truth for all named constants, limits, and defaults.

// =============================================================================
// Application metadata
// =============================================================================

/// Program name used in diagnostics ("linesift: file: message").
pub const PROGRAM_NAME: &str = "linesift";

/// Current application version (updated by release script).
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Label used for standard input in output records and diagnostics.
pub const STDIN_LABEL: &str = "(standard input)";

// =============================================================================
// Input buffer
// =============================================================================

/// Initial capacity of the retained save region. The save region holds the
/// trailing residue plus reserved leading-context lines across refills, and
/// doubles whenever a single retained span outgrows it.
pub const INITIAL_SAVE_SIZE: usize = 8 * 1024; // 8 KiB

/// Total window capacity as a multiple of the save region. Fixed policy, not
/// a tunable: it balances retained-context cost against scan batch size.
pub const SAVE_FACTOR: usize = 5;

/// Extra room granted beyond the remaining file size when capping the window
/// allocation for regular files, so a final short read never forces a grow.
pub const FILL_SLACK: usize = 4 * 1024;

// =============================================================================
// Output records
// =============================================================================

/// Separator after the filename / line number / byte offset on a match line.
pub const SEP_MATCH: u8 = b':';

/// Separator after the filename / line number / byte offset on a context line.
pub const SEP_CONTEXT: u8 = b'-';

/// Group separator emitted between discontiguous output regions.
pub const GROUP_SEPARATOR: &[u8] = b"--\n";

// =============================================================================
// Matcher limits
// =============================================================================

/// Maximum compiled-program size handed to the regex builder. Oversized
/// patterns surface as a compile diagnostic rather than unbounded memory.
pub const REGEX_SIZE_LIMIT: usize = 32 * 1024 * 1024; // 32 MiB

// =============================================================================
// Logging
// =============================================================================

/// Default log level when RUST_LOG is unset. "off" keeps stderr clean unless
/// diagnostics are explicitly requested; stdout is never logged to.
pub const DEFAULT_LOG_LEVEL: &str = "off";
