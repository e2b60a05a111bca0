// linesift - app/run.rs
//
// The per-input driver: classify each operand through the platform layer,
// scan or recurse, emit the per-file epilogue records (counts, file lists),
// reposition a capped standard input, and combine everything into the final
// exit code.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::core::config::{FilenameDisplay, OutMode};
use crate::core::scan::Searcher;
use crate::core::walk::{walk_tree, WalkAction, WalkEvent};
use crate::platform::input::{open_input, reposition_stdin, Opened};
use crate::util::constants::{PROGRAM_NAME, STDIN_LABEL};

/// Search every operand (standard input when none) and return the process
/// exit code: 0 for a match, 1 for none, 2 when any error fired.
pub fn run<W: Write>(searcher: &mut Searcher<W>, operands: &[PathBuf]) -> i32 {
    let cfg = searcher.config();
    let show_default = match cfg.filename_display {
        FilenameDisplay::Force => true,
        FilenameDisplay::Suppress => false,
        FilenameDisplay::Auto => operands.len() > 1,
    };

    let mut matched_any = false;
    if operands.is_empty() {
        matched_any = search_operand(searcher, None, show_default);
    } else {
        for path in operands {
            let target: Option<&Path> =
                (path.as_os_str() != "-").then_some(path.as_path());
            matched_any |= search_operand(searcher, target, show_default);
            if searcher.early_exit {
                break;
            }
        }
    }

    if searcher.early_exit {
        // A quiet-mode match decided the run; nothing was written.
        return 0;
    }

    searcher.printer.flush();
    if searcher.printer.write_error() {
        searcher.error_seen = true;
    }
    if searcher.error_seen {
        2
    } else if matched_any {
        0
    } else {
        1
    }
}

/// Search one operand; returns the file's success contribution (matched, or
/// listed under the files-without-match mode).
fn search_operand<W: Write>(
    searcher: &mut Searcher<W>,
    path: Option<&Path>,
    show_filename: bool,
) -> bool {
    let cfg = searcher.config();
    let label: Vec<u8> = match path {
        None => STDIN_LABEL.as_bytes().to_vec(),
        Some(p) => path_bytes(p),
    };

    match open_input(path, cfg) {
        Opened::Skip => false,
        Opened::Failed(e) => {
            searcher.report_error(&label, &e);
            false
        }
        Opened::Recurse => {
            let dir = path.expect("standard input is never a directory");
            search_directory(searcher, dir)
        }
        Opened::Scan(mut source) => {
            let map = source.map.take();
            let report = searcher.scan(
                &mut source.file,
                source.file_size,
                source.initial_offset,
                map,
                &label,
                show_filename,
            );

            let cfg = searcher.config();
            match cfg.out_mode {
                OutMode::CountOnly => {
                    let name = show_filename.then_some(label.as_slice());
                    searcher.printer.count(name, report.lines);
                }
                OutMode::ListMatching if report.lines > 0 => {
                    searcher.printer.file_name(&label);
                }
                OutMode::ListNonMatching if report.lines == 0 => {
                    searcher.printer.file_name(&label);
                }
                _ => {}
            }

            // A capped scan of a seekable standard input leaves the
            // descriptor where the next consumer expects it: at the end of
            // the last scanned buffer while the cap was not reached, else
            // just past the last match line.
            if !searcher.early_exit
                && source.is_stdin
                && source.seekable_regular
                && cfg.max_count.is_some()
            {
                let target = if report.outleft_remaining {
                    report.buffer_offset
                } else {
                    report.after_last_match
                };
                if let Err(e) = reposition_stdin(&mut source, target) {
                    searcher.report_error(&label, &e);
                }
            }

            if cfg.out_mode == OutMode::ListNonMatching {
                report.lines == 0
            } else {
                report.lines > 0
            }
        }
    }
}

/// Recurse into a directory, searching every enumerated file. Filename
/// display is forced on during recursion unless suppressed.
fn search_directory<W: Write>(searcher: &mut Searcher<W>, dir: &Path) -> bool {
    let cfg = searcher.config();
    let show = cfg.filename_display != FilenameDisplay::Suppress;
    let suppress_errors = cfg.suppress_errors;

    let mut matched = false;
    walk_tree(dir, |event| {
        match event {
            WalkEvent::File(child) => {
                matched |= search_operand(searcher, Some(child), show);
                if searcher.early_exit {
                    return WalkAction::Stop;
                }
            }
            WalkEvent::LoopDetected(at) => {
                // Always warned: a cycle is a usage hazard, not an OS error.
                // Message suppression only keeps it out of the exit status.
                eprintln!(
                    "{PROGRAM_NAME}: warning: {}: recursive directory loop",
                    at.display()
                );
                if !suppress_errors {
                    searcher.error_seen = true;
                }
            }
            WalkEvent::TraversalError { path, error } => {
                let subject = path.map(path_bytes).unwrap_or_else(|| path_bytes(dir));
                searcher.report_error(&subject, &error);
            }
        }
        WalkAction::Continue
    });
    matched
}

fn path_bytes(path: &Path) -> Vec<u8> {
    path.as_os_str().as_encoded_bytes().to_vec()
}
