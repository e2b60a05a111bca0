// linesift - core/buffer.rs
//
// The sliding input window. Holds a growable buffer whose front carries the
// bytes retained across refills (trailing residue plus reserved leading
// context) and whose remainder is filled from the input in one read per call.
//
// Architecture note: like core::walk, this module treats its I/O crate as an
// OS abstraction. It never resolves paths or opens anything -- the platform
// layer hands it an already-open handle and, when the zero-copy strategy
// applies, a whole-file memory map that serves as a single window. At EOF of
// a mapped window the retained tail is copied to the heap so the sentinel
// byte can be appended uniformly.
//
// Allocation contract: storage always keeps one addressable byte beyond the
// window so the scanner can synthesize a terminator for a final incomplete
// line.

use memmap2::Mmap;
use std::io::{self, Read, Seek, SeekFrom};

use crate::util::constants::{FILL_SLACK, INITIAL_SAVE_SIZE, SAVE_FACTOR};

/// Growable read window with a retained save region at the front.
///
/// The allocation is reused across files in one process; `reset` rebinds the
/// window to a new input without releasing storage.
#[derive(Debug)]
pub struct InputBuffer {
    /// Heap storage. The window occupies `buf[..window_len]` when no map is
    /// installed; the final byte of the storage is reserved for the sentinel.
    buf: Vec<u8>,

    /// Whole-file map serving as the current window, when the zero-copy
    /// strategy is in effect.
    map: Option<Mmap>,

    /// The mapped window has not been served by `fill` yet.
    map_fresh: bool,

    /// Capacity of the save region. Doubles until any single retained span
    /// fits; total storage tracks it at `SAVE_FACTOR` times.
    save_size: usize,

    /// Valid bytes in `buf` (heap mode).
    window_len: usize,

    /// Absolute input offset of `window()[0]`.
    window_base: u64,

    /// Offset at which the next raw read occurs.
    file_offset: u64,

    /// Total size for regular files; caps allocation growth.
    file_size: Option<u64>,
}

impl InputBuffer {
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            map: None,
            map_fresh: false,
            save_size: INITIAL_SAVE_SIZE,
            window_len: 0,
            window_base: 0,
            file_offset: 0,
            file_size: None,
        }
    }

    /// Rebind the buffer to a new input.
    ///
    /// `file_size` is the stat size for regular files (None otherwise) and
    /// `initial_offset` the position scanning starts from (non-zero only for
    /// a seekable standard input that was already part-consumed). When `map`
    /// is supplied it becomes the first and only full-size window.
    pub fn reset(&mut self, file_size: Option<u64>, initial_offset: u64, map: Option<Mmap>) {
        self.window_len = 0;
        self.window_base = initial_offset;
        self.file_offset = match &map {
            Some(m) => initial_offset + m.len() as u64,
            None => initial_offset,
        };
        self.file_size = file_size;
        self.map_fresh = map.is_some();
        self.map = map;
    }

    /// The current window.
    pub fn window(&self) -> &[u8] {
        match &self.map {
            Some(m) => &m[..],
            None => &self.buf[..self.window_len],
        }
    }

    /// Absolute input offset of the first window byte.
    pub fn window_base(&self) -> u64 {
        self.window_base
    }

    /// Offset of the next raw read; for a fully mapped window this is already
    /// the end of the file as it was at map time.
    pub fn file_offset(&self) -> u64 {
        self.file_offset
    }

    /// Retain the last `save` window bytes at the front, then read once from
    /// `src` into the remainder. Returns the number of fresh bytes (zero at
    /// EOF). Interrupted reads are retried.
    pub fn fill<R: Read + Seek>(&mut self, src: &mut R, save: usize) -> io::Result<usize> {
        debug_assert!(save <= self.window().len());

        // The first fill of a mapped input serves the map itself as one
        // full-size window.
        if self.map_fresh {
            debug_assert_eq!(save, 0);
            self.map_fresh = false;
            let len = self.map.as_ref().map_or(0, |m| m.len());
            return Ok(len);
        }

        if let Some(map) = self.map.take() {
            // The mapped window is exhausted; keep its tail on the heap so
            // further refills and the sentinel work uniformly. The input may
            // have grown since map time, so reads resume at the map end.
            self.ensure_storage(save);
            self.buf[..save].copy_from_slice(&map[map.len() - save..]);
            self.window_len = save;
            self.window_base = self.file_offset - save as u64;
            src.seek(SeekFrom::Start(self.file_offset))?;
        } else {
            self.ensure_storage(save);
            let drop_len = self.window_len - save;
            self.buf.copy_within(drop_len..self.window_len, 0);
            self.window_base += drop_len as u64;
            self.window_len = save;
        }

        let free_end = self.buf.len() - 1; // sentinel byte stays reserved
        let fresh = loop {
            match src.read(&mut self.buf[self.window_len..free_end]) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        };
        self.window_len += fresh;
        self.file_offset += fresh as u64;

        tracing::trace!(
            fresh,
            save,
            window = self.window_len,
            base = self.window_base,
            "buffer refilled"
        );
        Ok(fresh)
    }

    /// Append the terminator for a final incomplete line. The storage always
    /// reserves this byte, and a mapped window has been handed off to the
    /// heap before EOF can be observed.
    pub fn push_sentinel(&mut self, eol: u8) {
        debug_assert!(self.map.is_none());
        debug_assert!(self.window_len < self.buf.len());
        self.buf[self.window_len] = eol;
        self.window_len += 1;
    }

    /// Grow the save region until `save` fits, then size the storage to
    /// `SAVE_FACTOR` times it, capped near the remaining input for regular
    /// files. Storage never shrinks.
    fn ensure_storage(&mut self, save: usize) {
        while self.save_size < save {
            self.save_size *= 2;
        }

        let mut target = self.save_size.saturating_mul(SAVE_FACTOR);
        if let Some(size) = self.file_size {
            let remaining = usize::try_from(size.saturating_sub(self.file_offset))
                .unwrap_or(usize::MAX);
            let cap = self
                .save_size
                .saturating_add(remaining)
                .saturating_add(FILL_SLACK);
            target = target.min(cap);
        }
        // Always leave read room beyond the retained span, plus the sentinel.
        let target = target.max(save + FILL_SLACK) + 1;

        if self.buf.len() < target {
            self.buf.resize(target, 0);
        }
    }
}

impl Default for InputBuffer {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
