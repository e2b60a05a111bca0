// linesift - cli.rs
//
// Option parsing. Two preprocessing passes run before clap sees the argument
// vector: GREP_OPTIONS tokens are prepended (kept under its established name
// for drop-in compatibility), and classic digit options (-NUM) are folded
// into one context value. Everything else is a conventional derive surface
// whose values are assembled into the immutable Config.

use clap::{CommandFactory, FromArgMatches, Parser};
use std::ffi::{OsStr, OsString};
use std::io::Read;
use std::path::PathBuf;

use crate::core::config::{BinaryPolicy, Config, DirPolicy, FilenameDisplay, OutMode};
use crate::util::error::FatalError;

/// A parsed invocation: the search configuration plus the input operands.
#[derive(Debug)]
pub struct Invocation {
    pub config: Config,
    pub files: Vec<PathBuf>,
}

/// Search for PATTERN in each FILE or standard input.
#[derive(Parser, Debug)]
#[command(
    name = "linesift",
    version,
    about = "Search for PATTERN in each FILE or standard input.",
    override_usage = "linesift [OPTION]... PATTERN [FILE]...",
    disable_help_flag = true,
    args_override_self = true
)]
struct Cli {
    /// Print help.
    #[arg(long, action = clap::ArgAction::HelpLong)]
    help: Option<bool>,

    /// PATTERN is an extended regular expression.
    #[arg(short = 'E', long = "extended-regexp")]
    extended_regexp: bool,

    /// PATTERN is a set of newline-separated fixed strings.
    #[arg(short = 'F', long = "fixed-strings")]
    fixed_strings: bool,

    /// PATTERN is a basic regular expression (the default).
    #[arg(short = 'G', long = "basic-regexp")]
    basic_regexp: bool,

    /// PATTERN is a Perl-style regular expression.
    #[arg(short = 'P', long = "perl-regexp")]
    perl_regexp: bool,

    /// Select a matcher engine by registry name.
    #[arg(short = 'X', value_name = "MATCHER", hide = true)]
    matcher: Option<String>,

    /// Use PATTERN as the pattern; repeatable.
    #[arg(
        short = 'e',
        long = "regexp",
        value_name = "PATTERN",
        allow_hyphen_values = true
    )]
    regexp: Vec<OsString>,

    /// Read patterns from FILE (`-` means standard input); repeatable.
    #[arg(short = 'f', long = "file", value_name = "FILE")]
    file: Vec<PathBuf>,

    /// Ignore case distinctions.
    #[arg(short = 'i', long = "ignore-case", short_alias = 'y')]
    ignore_case: bool,

    /// Match only whole words.
    #[arg(short = 'w', long = "word-regexp")]
    word_regexp: bool,

    /// Match only whole lines.
    #[arg(short = 'x', long = "line-regexp")]
    line_regexp: bool,

    /// Records are terminated by NUL instead of newline.
    #[arg(short = 'z', long = "null-data")]
    null_data: bool,

    /// Suppress error messages about unreadable files.
    #[arg(short = 's', long = "no-messages")]
    no_messages: bool,

    /// Select non-matching lines.
    #[arg(short = 'v', long = "invert-match")]
    invert_match: bool,

    /// Stop each file after NUM matching lines.
    #[arg(short = 'm', long = "max-count", value_name = "NUM")]
    max_count: Option<String>,

    /// Print the byte offset of each output line.
    #[arg(short = 'b', long = "byte-offset")]
    byte_offset: bool,

    /// Print the line number of each output line.
    #[arg(short = 'n', long = "line-number")]
    line_number: bool,

    /// Print the filename for each match.
    #[arg(short = 'H', long = "with-filename")]
    with_filename: bool,

    /// Suppress filename prefixes on output.
    #[arg(short = 'h', long = "no-filename")]
    no_filename: bool,

    /// Suppress all normal output; the exit status tells the story.
    #[arg(short = 'q', long = "quiet", alias = "silent")]
    quiet: bool,

    /// How to handle binary files: binary, text, or without-match.
    #[arg(long = "binary-files", value_name = "TYPE")]
    binary_files: Option<String>,

    /// Equivalent to --binary-files=text.
    #[arg(short = 'a', long = "text")]
    text: bool,

    /// Equivalent to --binary-files=without-match.
    #[arg(short = 'I')]
    binary_without_match: bool,

    /// How to handle directories: read, skip, or recurse.
    #[arg(short = 'd', long = "directories", value_name = "ACTION")]
    directories: Option<String>,

    /// Equivalent to --directories=recurse.
    #[arg(short = 'r', long = "recursive")]
    recursive: bool,

    /// Print only names of files with no matching lines.
    #[arg(short = 'L', long = "files-without-match")]
    files_without_match: bool,

    /// Print only names of files with matching lines.
    #[arg(short = 'l', long = "files-with-matches")]
    files_with_matches: bool,

    /// Print only a count of matching lines per file.
    #[arg(short = 'c', long = "count")]
    count: bool,

    /// Print NUL after each filename.
    #[arg(short = 'Z', long = "null")]
    null: bool,

    /// Print NUM lines of trailing context.
    #[arg(short = 'A', long = "after-context", value_name = "NUM")]
    after_context: Option<String>,

    /// Print NUM lines of leading context.
    #[arg(short = 'B', long = "before-context", value_name = "NUM")]
    before_context: Option<String>,

    /// Print NUM lines of leading and trailing context.
    #[arg(short = 'C', long = "context", value_name = "NUM")]
    context: Option<String>,

    /// Do not strip CR characters at EOL (no-op on POSIX builds).
    #[arg(short = 'U', long = "binary")]
    binary: bool,

    /// Report offsets as if CRs were not there (no-op on POSIX builds).
    #[arg(short = 'u', long = "unix-byte-offsets")]
    unix_byte_offsets: bool,

    /// Use memory-mapped input when possible.
    #[arg(long = "mmap")]
    mmap: bool,

    /// PATTERN (when no -e/-f was given) followed by input files.
    #[arg(value_name = "PATTERN [FILE]...")]
    operands: Vec<OsString>,
}

/// Parse the real process arguments. Usage errors exit 2; --help and
/// --version exit 0, both via the CLI crate.
pub fn parse() -> Result<Invocation, FatalError> {
    let mut argv: Vec<OsString> = std::env::args_os().collect();
    if argv.is_empty() {
        argv.push(OsString::from("linesift"));
    }
    prepend_env_options(&mut argv);
    parse_argv(argv)
}

fn parse_argv(argv: Vec<OsString>) -> Result<Invocation, FatalError> {
    let argv0 = argv[0].clone();
    let mut argv = argv;
    let digit_context = extract_digit_options(&mut argv)?;

    let matches = match Cli::command().try_get_matches_from(&argv) {
        Ok(m) => m,
        Err(e) => e.exit(),
    };
    let cli = Cli::from_arg_matches(&matches).expect("derived mapping cannot fail");

    // --- Matcher selection (conflicts are fatal; same name twice is fine) ---
    let mut selected: Option<String> = None;
    let mut select = |name: &str| -> Result<(), FatalError> {
        match &selected {
            Some(prev) if prev != name => Err(FatalError::ConflictingMatchers),
            _ => {
                selected = Some(name.to_string());
                Ok(())
            }
        }
    };
    if cli.basic_regexp {
        select("basic")?;
    }
    if cli.extended_regexp {
        select("extended")?;
    }
    if cli.fixed_strings {
        select("fixed")?;
    }
    if cli.perl_regexp {
        select("perl")?;
    }
    if let Some(name) = &cli.matcher {
        select(name)?;
    }
    let matcher_name = selected.unwrap_or_else(|| default_matcher_for(&argv0));

    // --- Pattern assembly: -e and -f sources in command-line order ---
    let mut sources: Vec<(usize, PatternSource)> = Vec::new();
    if let Some(indices) = matches.indices_of("regexp") {
        let values = matches
            .get_many::<OsString>("regexp")
            .expect("indices imply values");
        for (i, v) in indices.zip(values) {
            sources.push((i, PatternSource::Expression(v.clone())));
        }
    }
    if let Some(indices) = matches.indices_of("file") {
        let values = matches
            .get_many::<PathBuf>("file")
            .expect("indices imply values");
        for (i, v) in indices.zip(values) {
            sources.push((i, PatternSource::File(v.clone())));
        }
    }
    sources.sort_by_key(|(i, _)| *i);

    let mut pattern: Vec<u8> = Vec::new();
    let had_sources = !sources.is_empty();
    for (_, source) in sources {
        match source {
            PatternSource::Expression(os) => {
                pattern.extend_from_slice(os.as_encoded_bytes());
                pattern.push(b'\n');
            }
            PatternSource::File(path) => {
                let data = read_pattern_file(&path)?;
                let nonempty = !data.is_empty();
                pattern.extend_from_slice(&data);
                if nonempty && pattern.last() != Some(&b'\n') {
                    pattern.push(b'\n');
                }
            }
        }
    }

    let mut operands = cli.operands;
    if had_sources {
        // One trailing separator is construction residue, not a pattern.
        if pattern.last() == Some(&b'\n') {
            pattern.pop();
        }
    } else {
        if operands.is_empty() {
            return Err(FatalError::MissingPattern);
        }
        pattern = operands.remove(0).as_encoded_bytes().to_vec();
    }

    // --- The empty key set flips invert and drops the anchors ---
    let mut invert_match = cli.invert_match;
    let mut word_match = cli.word_regexp;
    let mut line_match = cli.line_regexp;
    if pattern.is_empty() {
        invert_match = !invert_match;
        word_match = false;
        line_match = false;
    }

    // --- Context and limits ---
    let context = match &cli.context {
        Some(s) => Some(parse_context(s)?),
        None => digit_context,
    };
    let before_context = match &cli.before_context {
        Some(s) => parse_context(s)?,
        None => context.unwrap_or(0),
    };
    let after_context = match &cli.after_context {
        Some(s) => parse_context(s)?,
        None => context.unwrap_or(0),
    };
    let max_count = cli
        .max_count
        .as_deref()
        .map(|s| s.parse::<u64>().map_err(|_| FatalError::InvalidMaxCount))
        .transpose()?;

    // --- Policies ---
    let mut binary_policy = match cli.binary_files.as_deref() {
        None => BinaryPolicy::Binary,
        Some("binary") => BinaryPolicy::Binary,
        Some("text") => BinaryPolicy::Text,
        Some("without-match") => BinaryPolicy::WithoutMatch,
        Some(_) => return Err(FatalError::UnknownBinaryType),
    };
    if cli.text {
        binary_policy = BinaryPolicy::Text;
    }
    if cli.binary_without_match {
        binary_policy = BinaryPolicy::WithoutMatch;
    }

    // -r and -d write the same policy; the later occurrence wins.
    let r_last = matches.indices_of("recursive").and_then(|i| i.last());
    let d_last = matches.indices_of("directories").and_then(|i| i.last());
    let dir_policy = match (r_last, d_last) {
        (None, None) => DirPolicy::Read,
        (Some(_), None) => DirPolicy::Recurse,
        (None, Some(_)) => parse_directories(cli.directories.as_deref())?,
        (Some(r), Some(d)) => {
            if r > d {
                DirPolicy::Recurse
            } else {
                parse_directories(cli.directories.as_deref())?
            }
        }
    };

    let out_mode = if cli.quiet {
        OutMode::Quiet
    } else if cli.files_with_matches {
        OutMode::ListMatching
    } else if cli.files_without_match {
        OutMode::ListNonMatching
    } else if cli.count {
        OutMode::CountOnly
    } else {
        OutMode::Normal
    };

    let filename_display = if cli.no_filename {
        FilenameDisplay::Suppress
    } else if cli.with_filename {
        FilenameDisplay::Force
    } else {
        FilenameDisplay::Auto
    };

    // -U / -u are accepted for compatibility; POSIX builds never strip CRs,
    // so both are no-ops here.
    let _ = (cli.binary, cli.unix_byte_offsets);

    let config = Config {
        matcher_name,
        pattern,
        case_insensitive: cli.ignore_case,
        word_match,
        line_match,
        invert_match,
        eol_byte: if cli.null_data { 0 } else { b'\n' },
        max_count,
        before_context,
        after_context,
        out_mode,
        show_byte_offset: cli.byte_offset,
        show_line_number: cli.line_number,
        filename_display,
        null_after_filename: cli.null,
        binary_policy,
        dir_policy,
        use_mmap: cli.mmap,
        suppress_errors: cli.no_messages,
    };

    Ok(Invocation {
        config,
        files: operands.into_iter().map(PathBuf::from).collect(),
    })
}

#[derive(Debug)]
enum PatternSource {
    Expression(OsString),
    File(PathBuf),
}

fn read_pattern_file(path: &PathBuf) -> Result<Vec<u8>, FatalError> {
    if path.as_os_str() == "-" {
        let mut data = Vec::new();
        std::io::stdin()
            .read_to_end(&mut data)
            .map_err(|source| FatalError::PatternFileIo {
                path: path.clone(),
                source,
            })?;
        Ok(data)
    } else {
        std::fs::read(path).map_err(|source| FatalError::PatternFileIo {
            path: path.clone(),
            source,
        })
    }
}

fn parse_context(s: &str) -> Result<usize, FatalError> {
    s.parse::<usize>().map_err(|_| FatalError::InvalidContextLength)
}

fn parse_directories(value: Option<&str>) -> Result<DirPolicy, FatalError> {
    match value {
        Some("read") => Ok(DirPolicy::Read),
        Some("skip") => Ok(DirPolicy::Skip),
        Some("recurse") => Ok(DirPolicy::Recurse),
        _ => Err(FatalError::UnknownDirectoriesMethod),
    }
}

/// Invocation names ending in `egrep`/`fgrep` select their engine.
fn default_matcher_for(argv0: &OsStr) -> String {
    let base = std::path::Path::new(argv0)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    #[cfg(windows)]
    let base = base
        .to_ascii_lowercase()
        .trim_end_matches(".exe")
        .to_string();
    if base.ends_with("egrep") {
        "extended".to_string()
    } else if base.ends_with("fgrep") {
        "fixed".to_string()
    } else {
        "default".to_string()
    }
}

/// Prepend GREP_OPTIONS tokens (whitespace-split, `\` escapes whitespace and
/// backslash) right after the program name.
fn prepend_env_options(argv: &mut Vec<OsString>) {
    let Some(value) = std::env::var_os("GREP_OPTIONS") else {
        return;
    };
    let tokens = split_escaped(&value.to_string_lossy());
    if tokens.is_empty() {
        return;
    }
    tracing::debug!(count = tokens.len(), "prepending GREP_OPTIONS tokens");
    argv.splice(1..1, tokens);
}

fn split_escaped(s: &str) -> Vec<OsString> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut pending = false;
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                    pending = true;
                }
            }
            c if c.is_whitespace() => {
                if pending {
                    tokens.push(OsString::from(std::mem::take(&mut current)));
                    pending = false;
                }
            }
            c => {
                current.push(c);
                pending = true;
            }
        }
    }
    if pending {
        tokens.push(OsString::from(current));
    }
    tokens
}

/// Remove classic digit options from `argv` (up to `--`) and fold their
/// digits, in order, into one context value.
fn extract_digit_options(argv: &mut Vec<OsString>) -> Result<Option<usize>, FatalError> {
    let mut digits = String::new();
    let mut i = 1;
    while i < argv.len() {
        let s = argv[i].to_string_lossy();
        if s == "--" {
            break;
        }
        if s.len() >= 2 && s.starts_with('-') && s[1..].bytes().all(|b| b.is_ascii_digit()) {
            digits.push_str(&s[1..]);
            argv.remove(i);
            continue;
        }
        i += 1;
    }
    if digits.is_empty() {
        return Ok(None);
    }
    digits
        .parse::<usize>()
        .map(Some)
        .map_err(|_| FatalError::InvalidContextLength)
}

// =============================================================================
// Tests
// =============================================================================
