// linesift - core/walk.rs
//
// Recursive directory traversal for the recurse policy.
//
// Architecture note: this module uses `walkdir` for traversal as an OS
// abstraction (similar to using std::path::Path). With `follow_links`
// enabled the walker keeps the (device, inode) chain of ancestors, which is
// exactly the cycle check the recursion needs: a symlink that leads back
// into its own ancestry surfaces as a loop event instead of descending
// forever. The walker never opens file contents -- that boundary is owned by
// the driver (app::run), which receives each file through the callback.

use std::path::Path;
use walkdir::WalkDir;

/// Caller verdict after each event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkAction {
    Continue,
    /// Abandon the traversal (quiet-mode match decided the run).
    Stop,
}

/// One traversal event, in enumeration order.
#[derive(Debug)]
pub enum WalkEvent<'a> {
    /// A non-directory entry to search.
    File(&'a Path),
    /// An ancestor cycle; the path is the entry that closes the loop.
    LoopDetected(&'a Path),
    /// Any other per-entry traversal failure.
    TraversalError {
        path: Option<&'a Path>,
        error: &'a walkdir::Error,
    },
}

/// Walk the tree under `root`, reporting every file and every per-entry
/// problem to `visit`. Directories themselves produce no event; the walker
/// descends into them in enumeration order.
pub fn walk_tree(root: &Path, mut visit: impl FnMut(WalkEvent<'_>) -> WalkAction) {
    tracing::debug!(root = %root.display(), "recursive walk starting");
    for entry in WalkDir::new(root).follow_links(true) {
        let action = match entry {
            Ok(e) => {
                if e.file_type().is_dir() {
                    continue;
                }
                visit(WalkEvent::File(e.path()))
            }
            Err(err) if err.loop_ancestor().is_some() => {
                let path = err.path().unwrap_or(root);
                tracing::debug!(path = %path.display(), "directory loop detected");
                visit(WalkEvent::LoopDetected(path))
            }
            Err(err) => visit(WalkEvent::TraversalError {
                path: err.path(),
                error: &err,
            }),
        };
        if action == WalkAction::Stop {
            return;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    #[test]
    fn visits_files_depth_first() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("a.txt"), "a\n").unwrap();
        let sub = root.join("sub");
        fs::create_dir(&sub).unwrap();
        fs::write(sub.join("b.txt"), "b\n").unwrap();

        let mut seen: Vec<PathBuf> = Vec::new();
        walk_tree(root, |event| {
            if let WalkEvent::File(p) = event {
                seen.push(p.to_path_buf());
            }
            WalkAction::Continue
        });

        let names: Vec<_> = seen
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert!(names.contains(&"a.txt".to_string()));
        assert!(names.contains(&"b.txt".to_string()));
    }

    #[test]
    fn stop_abandons_the_walk() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("a.txt"), "a\n").unwrap();
        fs::write(root.join("b.txt"), "b\n").unwrap();

        let mut count = 0;
        walk_tree(root, |event| {
            if matches!(event, WalkEvent::File(_)) {
                count += 1;
                return WalkAction::Stop;
            }
            WalkAction::Continue
        });
        assert_eq!(count, 1);
    }

    #[cfg(unix)]
    #[test]
    fn symlink_cycle_reports_one_loop() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("a.txt"), "a\n").unwrap();
        std::os::unix::fs::symlink(root, root.join("loop")).unwrap();

        let mut loops = 0;
        let mut files = 0;
        walk_tree(root, |event| {
            match event {
                WalkEvent::LoopDetected(_) => loops += 1,
                WalkEvent::File(_) => files += 1,
                WalkEvent::TraversalError { .. } => {}
            }
            WalkAction::Continue
        });
        assert_eq!(loops, 1, "exactly one warning per cycle");
        assert_eq!(files, 1, "the cyclic branch produces no files");
    }
}
