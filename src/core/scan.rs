// linesift - core/scan.rs
//
// The per-file scan loop. Drives the input window, splits it into complete
// lines, feeds the matcher, and hands records to the printer while keeping
// absolute byte offsets, lazy line-number accounting, and the leading /
// trailing context windows exact across refills.
//
// All cursors that must survive a refill (`lastout`, `lastnl`,
// `after_last_match`) are kept as absolute input offsets, so the retained
// region can move freely in memory without invalidating them.

use memchr::{memchr, memchr_iter, memrchr};
use std::io::{Read, Seek, Write};

use crate::core::buffer::InputBuffer;
use crate::core::config::{BinaryPolicy, Config};
use crate::core::format::Printer;
use crate::core::matcher::Matcher;
use crate::util::constants::{PROGRAM_NAME, SEP_CONTEXT, SEP_MATCH};

/// Outcome of scanning one input.
#[derive(Debug, Clone, Copy)]
pub struct ScanReport {
    /// Lines emitted (or counted): matches, or non-matches under invert.
    pub lines: u64,
    /// True when the max-count cap was not exhausted.
    pub outleft_remaining: bool,
    /// Absolute offset one past the last match line.
    pub after_last_match: u64,
    /// The buffer's read offset when the scan ended.
    pub buffer_offset: u64,
}

/// Process-wide search driver: one compiled matcher, one reusable window,
/// one output stream.
pub struct Searcher<'a, W: Write> {
    config: &'a Config,
    matcher: &'a dyn Matcher,
    pub printer: Printer<W>,
    buffer: InputBuffer,
    /// Any per-file error was reported (final status 2).
    pub error_seen: bool,
    /// A quiet-mode match decided the whole run; stop scanning inputs.
    pub early_exit: bool,
}

/// Per-scan mutable state; everything here dies with the file.
struct ScanState<'s> {
    eol: u8,
    invert: bool,
    out_before: usize,
    out_after: u64,
    context_requested: bool,
    show_line: bool,
    show_byte: bool,
    out_quiet: bool,
    done_on_match: bool,
    exit_on_match: bool,
    filename: Option<&'s [u8]>,

    /// Lines still allowed out (max-count), `u64::MAX` when unbounded.
    outleft: u64,
    /// Trailing-context lines still owed.
    pending: u64,
    /// One past the last emitted byte, absolute; None when the next output
    /// is discontiguous.
    lastout: Option<u64>,
    /// Newline count up to `lastnl` (absolute), advanced lazily.
    totalnl: u64,
    lastnl: u64,
    /// One past the last match line, absolute.
    after_last_match: u64,
    /// The file's fate is decided; abandon the scan.
    stop: bool,
    /// The whole run is decided (quiet-mode match).
    exit: bool,
}

impl<'a, W: Write> Searcher<'a, W> {
    pub fn config(&self) -> &'a Config {
        self.config
    }

    pub fn new(config: &'a Config, matcher: &'a dyn Matcher, out: W) -> Self {
        Self {
            config,
            matcher,
            printer: Printer::new(out, config.null_after_filename),
            buffer: InputBuffer::new(),
            error_seen: false,
            early_exit: false,
        }
    }

    /// Report a per-file error and record it in the exit status.
    pub fn report_error(&mut self, subject: &[u8], message: &dyn std::fmt::Display) {
        if !self.config.suppress_errors {
            eprintln!(
                "{PROGRAM_NAME}: {}: {message}",
                String::from_utf8_lossy(subject)
            );
        }
        self.error_seen = true;
    }

    /// Scan one opened input and return what it produced.
    ///
    /// `map`, when given, is the whole-file window for the zero-copy path.
    /// `label` is the display name; `show_filename` controls the per-line
    /// filename prefix. Read errors are reported here and end the scan of
    /// this input without aborting the run.
    pub fn scan<R: Read + Seek>(
        &mut self,
        src: &mut R,
        file_size: Option<u64>,
        initial_offset: u64,
        map: Option<memmap2::Mmap>,
        label: &[u8],
        show_filename: bool,
    ) -> ScanReport {
        let cfg = self.config;
        let mut state = ScanState {
            eol: cfg.eol_byte,
            invert: cfg.invert_match,
            out_before: cfg.before_context,
            out_after: cfg.after_context as u64,
            context_requested: cfg.context_requested(),
            show_line: cfg.show_line_number,
            show_byte: cfg.show_byte_offset,
            out_quiet: cfg.out_quiet(),
            done_on_match: cfg.done_on_match(),
            exit_on_match: cfg.exit_on_match(),
            filename: show_filename.then_some(label),
            outleft: cfg.max_count.unwrap_or(u64::MAX),
            pending: 0,
            lastout: None,
            totalnl: 0,
            lastnl: initial_offset,
            after_last_match: initial_offset,
            stop: false,
            exit: false,
        };

        self.buffer.reset(file_size, initial_offset, map);
        if let Err(e) = self.buffer.fill(src, 0) {
            self.report_error(label, &e);
            return ScanReport {
                lines: 0,
                outleft_remaining: true,
                after_last_match: state.after_last_match,
                buffer_offset: self.buffer.file_offset(),
            };
        }

        // Binary classification on the first window, checked only when the
        // policy can act on the result.
        let not_text = {
            let win = self.buffer.window();
            match cfg.binary_policy {
                BinaryPolicy::Text => false,
                BinaryPolicy::Binary if cfg.out_quiet() => false,
                _ => {
                    if state.eol == b'\n' {
                        memchr(0, win).is_some()
                    } else {
                        win.iter().any(|&b| b >= 0x80)
                    }
                }
            }
        };
        if not_text {
            if cfg.binary_policy == BinaryPolicy::WithoutMatch {
                tracing::debug!(file = %String::from_utf8_lossy(label), "binary input skipped");
                return ScanReport {
                    lines: 0,
                    outleft_remaining: state.outleft > 0,
                    after_last_match: state.after_last_match,
                    buffer_offset: self.buffer.file_offset(),
                };
            }
            // Scan silently and stop at the first match; the canonical
            // binary record is emitted after the scan. These overrides are
            // per-scan locals, restored by construction on the next file.
            state.out_quiet = true;
            state.done_on_match = true;
        }

        let mut nlines: u64 = 0;
        let mut residue: usize = 0;
        let mut save: usize = 0;
        let mut eof = false;

        loop {
            let win_len = self.buffer.window().len();
            if win_len == save {
                eof = true;
                break;
            }
            let beg = save - residue;
            let lim = {
                let win = self.buffer.window();
                match memrchr(state.eol, &win[beg..win_len]) {
                    Some(i) => beg + i + 1,
                    None => beg,
                }
            };
            residue = win_len - lim;

            if beg < lim && state.outleft > 0 {
                let Self {
                    printer,
                    buffer,
                    matcher,
                    ..
                } = self;
                let win = buffer.window();
                let base = buffer.window_base();
                nlines += grepbuf(&mut state, printer, *matcher, win, base, beg, lim);
                if state.pending > 0 {
                    prpending(&mut state, printer, win, base, lim);
                }
            } else if state.pending > 0 {
                let Self {
                    printer, buffer, ..
                } = self;
                prpending(&mut state, printer, buffer.window(), buffer.window_base(), lim);
            }
            if state.stop || (state.outleft == 0 && state.pending == 0) {
                break;
            }

            // Reserve up to before_context lines ahead of the residue,
            // stopping at the already-printed frontier to keep contiguity.
            {
                let win = self.buffer.window();
                let base = self.buffer.window_base();
                let mut reserved = lim;
                for _ in 0..state.out_before {
                    if reserved == 0 || state.lastout == Some(base + reserved as u64) {
                        break;
                    }
                    reserved = memrchr(state.eol, &win[..reserved - 1]).map_or(0, |i| i + 1);
                }
                if state.lastout != Some(base + reserved as u64) {
                    state.lastout = None;
                }
                save = residue + (lim - reserved);
                if state.show_line {
                    nlscan(&mut state, win, base, base + reserved as u64);
                }
            }

            if let Err(e) = self.buffer.fill(src, save) {
                self.report_error(label, &e);
                break;
            }
        }

        // A final incomplete line is completed with the reserved sentinel
        // byte and scanned like any other.
        if eof && residue > 0 && state.outleft > 0 {
            self.buffer.push_sentinel(state.eol);
            let Self {
                printer,
                buffer,
                matcher,
                ..
            } = self;
            let win = buffer.window();
            let base = buffer.window_base();
            let beg = save - residue;
            nlines += grepbuf(&mut state, printer, *matcher, win, base, beg, win.len());
            if state.pending > 0 {
                prpending(&mut state, printer, win, base, win.len());
            }
        }

        if not_text && nlines > 0 {
            self.printer.binary_match(label);
        }
        if state.exit {
            self.early_exit = true;
        }

        tracing::debug!(
            file = %String::from_utf8_lossy(label),
            lines = nlines,
            "scan finished"
        );
        ScanReport {
            lines: nlines,
            outleft_remaining: state.outleft > 0,
            after_last_match: state.after_last_match,
            buffer_offset: self.buffer.file_offset(),
        }
    }
}

// =============================================================================
// Line emission
// =============================================================================

/// Count terminators between `lastnl` and `to_abs` so a line number is the
/// count of terminators strictly before the line start, plus one.
fn nlscan(state: &mut ScanState<'_>, win: &[u8], base: u64, to_abs: u64) {
    if to_abs <= state.lastnl {
        return;
    }
    let from = (state.lastnl - base) as usize;
    let to = (to_abs - base) as usize;
    state.totalnl += memchr_iter(state.eol, &win[from..to]).count() as u64;
    state.lastnl = to_abs;
}

/// Print one line `[beg, lim)` (terminator included) with its prefixes.
fn prline<W: Write>(
    state: &mut ScanState<'_>,
    printer: &mut Printer<W>,
    win: &[u8],
    base: u64,
    beg: usize,
    lim: usize,
    sep: u8,
) {
    let abs = base + beg as u64;
    let line_number = if state.show_line {
        nlscan(state, win, base, abs);
        Some(state.totalnl + 1)
    } else {
        None
    };
    let byte_offset = state.show_byte.then_some(abs);
    printer.line(state.filename, line_number, byte_offset, sep, &win[beg..lim]);
    state.lastout = Some(base + lim as u64);
}

/// Emit owed trailing-context lines that are available below `lim`.
fn prpending<W: Write>(
    state: &mut ScanState<'_>,
    printer: &mut Printer<W>,
    win: &[u8],
    base: u64,
    lim: usize,
) {
    while state.pending > 0 {
        let Some(lo) = state.lastout else { break };
        if lo >= base + lim as u64 {
            break;
        }
        let rel = (lo - base) as usize;
        let Some(i) = memchr(state.eol, &win[rel..lim]) else {
            break;
        };
        state.pending -= 1;
        prline(state, printer, win, base, rel, rel + i + 1, SEP_CONTEXT);
    }
}

/// Emit output text: leading context, the group separator when the output is
/// discontiguous, then either the single match line `[beg, lim)` or (invert)
/// every line of `[beg, lim)` counted against the cap.
fn prtext<W: Write>(
    state: &mut ScanState<'_>,
    printer: &mut Printer<W>,
    win: &[u8],
    base: u64,
    beg: usize,
    lim: usize,
    nlinesp: Option<&mut u64>,
) {
    if !state.out_quiet && state.pending > 0 {
        prpending(state, printer, win, base, beg);
    }

    let mut p = beg;
    if !state.out_quiet {
        let floor = state
            .lastout
            .map_or(0, |lo| (lo - base) as usize)
            .min(beg);
        for _ in 0..state.out_before {
            if p <= floor {
                break;
            }
            p = memrchr(state.eol, &win[floor..p - 1]).map_or(floor, |i| floor + i + 1);
        }

        let discontiguous = state.lastout != Some(base + p as u64);
        if state.context_requested && printer.used() && discontiguous {
            printer.group_separator();
        }

        while p < beg {
            let end = p + memchr(state.eol, &win[p..beg]).map_or(beg - p, |i| i + 1);
            prline(state, printer, win, base, p, end, SEP_CONTEXT);
            p = end;
        }
    }

    match nlinesp {
        Some(count) => {
            let mut q = beg;
            while q < lim && state.outleft > 0 {
                let end = q + memchr(state.eol, &win[q..lim]).map_or(lim - q, |i| i + 1);
                *count += 1;
                state.outleft -= 1;
                if !state.out_quiet {
                    prline(state, printer, win, base, q, end, SEP_MATCH);
                }
                q = end;
            }
        }
        None => prline(state, printer, win, base, beg, lim, SEP_MATCH),
    }

    state.pending = if state.out_quiet { 0 } else { state.out_after };
}

/// Run the matcher over the complete lines in `[beg, lim)`.
fn grepbuf<W: Write>(
    state: &mut ScanState<'_>,
    printer: &mut Printer<W>,
    matcher: &dyn Matcher,
    win: &[u8],
    base: u64,
    beg: usize,
    lim: usize,
) -> u64 {
    let mut nlines: u64 = 0;
    let mut p = beg;

    if !state.invert {
        while p < lim {
            let slice = &win[p..lim];
            let Some(m) = matcher.execute(slice) else {
                break;
            };
            if m.start >= slice.len() {
                // Sentinel match; never real output.
                break;
            }
            let b = p + m.start;
            let e = p + m.end;
            let ls = p + memrchr(state.eol, &win[p..b]).map_or(0, |i| i + 1);
            let le = e + memchr(state.eol, &win[e..lim]).map_or(lim - e, |i| i + 1);

            nlines += 1;
            state.outleft -= 1;
            state.after_last_match = base + le as u64;
            if !state.out_quiet {
                prtext(state, printer, win, base, ls, le, None);
            }
            if state.outleft == 0 || state.done_on_match {
                if state.done_on_match {
                    state.stop = true;
                    if state.exit_on_match {
                        state.exit = true;
                    }
                }
                break;
            }
            p = le;
        }
    } else {
        while p < lim {
            let slice = &win[p..lim];
            let (gap_end, next) = match matcher.execute(slice) {
                None => (lim, lim),
                Some(m) if m.start >= slice.len() => (lim, lim),
                Some(m) => {
                    let b = p + m.start;
                    let e = p + m.end;
                    let ls = p + memrchr(state.eol, &win[p..b]).map_or(0, |i| i + 1);
                    let le = e + memchr(state.eol, &win[e..lim]).map_or(lim - e, |i| i + 1);
                    (ls, le)
                }
            };
            prtext(state, printer, win, base, p, gap_end, Some(&mut nlines));
            p = next;
        }
    }
    nlines
}

// =============================================================================
// Tests
// =============================================================================
