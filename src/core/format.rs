// linesift - core/format.rs
//
// Output records. Every emitted line is: optional filename + separator,
// optional line number + separator, optional byte offset + separator, then
// the line bytes including the trailing terminator. `:` marks matches, `-`
// context; null-filename mode replaces only the separator directly after the
// filename.
//
// Output errors are reported once per run, never abort scanning, and force
// the final exit status to 2.

use std::io::Write;

use crate::util::constants::{GROUP_SEPARATOR, PROGRAM_NAME, SEP_MATCH};

/// Writer for all stdout records, shared by every file in the run.
pub struct Printer<W: Write> {
    out: W,
    null_after_filename: bool,
    /// Whether anything was emitted this run; gates the group separator.
    used: bool,
    write_error: bool,
    write_error_reported: bool,
}

impl<W: Write> Printer<W> {
    pub fn new(out: W, null_after_filename: bool) -> Self {
        Self {
            out,
            null_after_filename,
            used: false,
            write_error: false,
            write_error_reported: false,
        }
    }

    /// One match or context line. `sep` is `:` or `-` and also trails the
    /// line number and byte offset; the filename separator alone becomes NUL
    /// in null-filename mode.
    pub fn line(
        &mut self,
        filename: Option<&[u8]>,
        line_number: Option<u64>,
        byte_offset: Option<u64>,
        sep: u8,
        bytes: &[u8],
    ) {
        if let Some(name) = filename {
            self.emit(name);
            let fsep = if self.null_after_filename { b'\0' } else { sep };
            self.emit(&[fsep]);
        }
        if let Some(n) = line_number {
            self.emit(n.to_string().as_bytes());
            self.emit(&[sep]);
        }
        if let Some(off) = byte_offset {
            self.emit(off.to_string().as_bytes());
            self.emit(&[sep]);
        }
        self.emit(bytes);
        self.used = true;
    }

    /// The `--` line between discontiguous output groups. The caller decides
    /// when one is owed.
    pub fn group_separator(&mut self) {
        self.emit(GROUP_SEPARATOR);
    }

    /// Per-file count record: `[filename<sep>]COUNT\n`.
    pub fn count(&mut self, filename: Option<&[u8]>, count: u64) {
        if let Some(name) = filename {
            self.emit(name);
            let fsep = if self.null_after_filename { b'\0' } else { SEP_MATCH };
            self.emit(&[fsep]);
        }
        self.emit(count.to_string().as_bytes());
        self.emit(b"\n");
    }

    /// File-list record: `filename\n`, or `filename\0` in null-filename mode.
    pub fn file_name(&mut self, name: &[u8]) {
        self.emit(name);
        self.emit(if self.null_after_filename { b"\0" } else { b"\n" });
    }

    /// The canonical binary-match record, emitted irrespective of quiet.
    pub fn binary_match(&mut self, name: &[u8]) {
        self.emit(b"Binary file ");
        self.emit(name);
        self.emit(b" matches\n");
    }

    /// True once any match/context line was emitted this run.
    pub fn used(&self) -> bool {
        self.used
    }

    /// True if any output write failed.
    pub fn write_error(&self) -> bool {
        self.write_error
    }

    pub fn flush(&mut self) {
        if let Err(e) = self.out.flush() {
            self.note_error(&e);
        }
    }

    /// Hand back the underlying writer (test inspection).
    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, bytes: &[u8]) {
        if self.write_error {
            return;
        }
        if let Err(e) = self.out.write_all(bytes) {
            self.note_error(&e);
        }
    }

    fn note_error(&mut self, e: &std::io::Error) {
        if !self.write_error_reported {
            eprintln!("{PROGRAM_NAME}: writing output: {e}");
            self.write_error_reported = true;
        }
        self.write_error = true;
    }
}

// =============================================================================
// Tests
// =============================================================================
