// linesift - platform/input.rs
//
// Input acquisition: open and classify paths, duplicate the process's
// standard input into a plain File so classification, mapping, and
// repositioning share one code path, and attempt the whole-file map for the
// zero-copy strategy.

use memmap2::Mmap;
use std::fs::File;
use std::io::{self, Seek, SeekFrom};
use std::path::Path;

use crate::core::config::{Config, DirPolicy};

/// An input ready to scan.
#[derive(Debug)]
pub struct ScanSource {
    pub file: File,
    /// Stat size for regular files.
    pub file_size: Option<u64>,
    /// Position scanning starts from (non-zero only for seekable stdin).
    pub initial_offset: u64,
    /// Whole-file window when the zero-copy strategy applies.
    pub map: Option<Mmap>,
    pub is_stdin: bool,
    /// Standard input backed by a seekable regular file.
    pub seekable_regular: bool,
}

/// Outcome of opening one operand.
#[derive(Debug)]
pub enum Opened {
    Scan(ScanSource),
    /// Directory under the recurse policy: hand off to the walker.
    Recurse,
    /// Silent skip (directory under skip policy, or permission-denied
    /// directory entry while skipping).
    Skip,
    /// Open or stat failure to report.
    Failed(io::Error),
}

/// Open `path` (None means standard input) and classify it per the
/// directory policy.
pub fn open_input(path: Option<&Path>, config: &Config) -> Opened {
    let (file, is_stdin) = match path {
        None => match clone_stdin() {
            Ok(f) => (f, true),
            Err(e) => return Opened::Failed(e),
        },
        Some(p) => match open_retry(p) {
            Ok(f) => (f, false),
            Err(e) => {
                if e.kind() == io::ErrorKind::PermissionDenied
                    && config.dir_policy == DirPolicy::Skip
                    && std::fs::metadata(p).map(|m| m.is_dir()).unwrap_or(false)
                {
                    return Opened::Skip;
                }
                return Opened::Failed(e);
            }
        },
    };

    let meta = match file.metadata() {
        Ok(m) => m,
        Err(e) => return Opened::Failed(e),
    };

    if meta.is_dir() {
        match config.dir_policy {
            DirPolicy::Recurse if !is_stdin => return Opened::Recurse,
            DirPolicy::Skip => return Opened::Skip,
            // Read policy: scan it; the first read fails with the OS error
            // and is reported like any other per-file failure.
            _ => {}
        }
    }

    let regular = meta.is_file();
    let file_size = regular.then(|| meta.len());

    // A seekable stdin may already be part-consumed; scanning starts at its
    // current position so a capped scan can be repositioned afterwards.
    let mut file = file;
    let mut initial_offset = 0;
    let mut seekable_regular = false;
    if is_stdin && regular {
        if let Ok(pos) = file.stream_position() {
            initial_offset = pos;
            seekable_regular = true;
        }
    }

    let map = if config.use_mmap && regular && initial_offset == 0 {
        try_map(&file, meta.len())
    } else {
        None
    };

    Opened::Scan(ScanSource {
        file,
        file_size,
        initial_offset,
        map,
        is_stdin,
        seekable_regular,
    })
}

/// Reposition a seekable standard input after an early-terminated scan so
/// the next consumer of the descriptor picks up at the right byte.
pub fn reposition_stdin(source: &mut ScanSource, target: u64) -> io::Result<()> {
    source.file.seek(SeekFrom::Start(target)).map(|_| ())
}

/// Open with transparent retry on interruption.
fn open_retry(path: &Path) -> io::Result<File> {
    loop {
        match File::open(path) {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}

/// Duplicate the process's standard input into an owned File. The duplicate
/// shares the underlying descriptor's offset, so seeking it repositions the
/// original as required.
#[cfg(unix)]
fn clone_stdin() -> io::Result<File> {
    use std::os::fd::AsFd;
    let owned = std::io::stdin().as_fd().try_clone_to_owned()?;
    Ok(File::from(owned))
}

#[cfg(windows)]
fn clone_stdin() -> io::Result<File> {
    use std::os::windows::io::AsHandle;
    let owned = std::io::stdin().as_handle().try_clone_to_owned()?;
    Ok(File::from(owned))
}

/// Attempt the whole-file map; any failure silently selects the read path.
fn try_map(file: &File, len: u64) -> Option<Mmap> {
    if len == 0 || usize::try_from(len).is_err() {
        return None;
    }
    match unsafe { Mmap::map(file) } {
        Ok(map) => Some(map),
        Err(e) => {
            tracing::debug!(error = %e, "mmap failed; falling back to read");
            None
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
