// linesift - main.rs
//
// Entry point. Handles:
// 1. Logging initialisation (RUST_LOG opt-in, stderr only)
// 2. CLI argument parsing into the immutable Config
// 3. One-time matcher compilation
// 4. The search run and the exit status

use std::io::BufWriter;
use std::process::ExitCode;

use linesift::core::matcher::{self, MatcherOptions};
use linesift::core::scan::Searcher;
use linesift::util::constants::PROGRAM_NAME;
use linesift::{app, cli, util};

fn main() -> ExitCode {
    util::logging::init();

    let invocation = match cli::parse() {
        Ok(inv) => inv,
        Err(e) => {
            eprintln!("{PROGRAM_NAME}: {e}");
            return ExitCode::from(2);
        }
    };
    let config = &invocation.config;

    tracing::debug!(
        engine = %config.matcher_name,
        files = invocation.files.len(),
        "starting search"
    );

    // A zero cap can produce no output for any input; the answer is known
    // before anything is opened.
    if config.max_count == Some(0) {
        return ExitCode::from(1);
    }

    let matcher = match matcher::compile(
        &config.matcher_name,
        &config.pattern,
        &MatcherOptions {
            case_insensitive: config.case_insensitive,
            word_match: config.word_match,
            line_match: config.line_match,
            eol_byte: config.eol_byte,
        },
    ) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("{PROGRAM_NAME}: {e}");
            return ExitCode::from(2);
        }
    };

    let stdout = std::io::stdout();
    let out = BufWriter::new(stdout.lock());
    let mut searcher = Searcher::new(config, matcher.as_ref(), out);
    let code = app::run::run(&mut searcher, &invocation.files);
    ExitCode::from(code as u8)
}
