// linesift - tests/e2e_search.rs
//
// End-to-end tests for the search pipeline: real files on disk, the real
// open/classify driver, the real window scanner, byte-exact output vectors.
// No mocks, no stubs.

use std::fs;
use std::path::{Path, PathBuf};

use linesift::app;
use linesift::core::config::{BinaryPolicy, Config, DirPolicy, FilenameDisplay, OutMode};
use linesift::core::matcher::{compile, MatcherOptions};
use linesift::core::scan::Searcher;

// =============================================================================
// Helpers
// =============================================================================

/// Run a full search over `operands`, returning (stdout bytes, exit code).
fn run_search(cfg: &Config, operands: &[PathBuf]) -> (Vec<u8>, i32) {
    let matcher = compile(
        &cfg.matcher_name,
        &cfg.pattern,
        &MatcherOptions {
            case_insensitive: cfg.case_insensitive,
            word_match: cfg.word_match,
            line_match: cfg.line_match,
            eol_byte: cfg.eol_byte,
        },
    )
    .expect("pattern compiles");
    let mut searcher = Searcher::new(cfg, matcher.as_ref(), Vec::new());
    let code = app::run::run(&mut searcher, operands);
    (searcher.printer.into_inner(), code)
}

fn fixed(pattern: &[u8]) -> Config {
    Config {
        matcher_name: "fixed".to_string(),
        pattern: pattern.to_vec(),
        ..Config::default()
    }
}

fn write_file(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("fixture write");
    path
}

// =============================================================================
// Scenario: fixed string across multiple files
// =============================================================================

#[test]
fn e2e_fixed_string_multi_file() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_file(dir.path(), "a.txt", b"foo\nbar\nfoo\n");
    let b = write_file(dir.path(), "b.txt", b"baz\n");

    let (out, code) = run_search(&fixed(b"foo"), &[a.clone(), b]);
    let expected = format!("{p}:foo\n{p}:foo\n", p = a.display());
    assert_eq!(String::from_utf8(out).unwrap(), expected);
    assert_eq!(code, 0);
}

// =============================================================================
// Scenario: context with group separator
// =============================================================================

#[test]
fn e2e_context_groups() {
    let dir = tempfile::tempdir().unwrap();
    let f = write_file(dir.path(), "ctx.txt", b"1\n2\n3\nHIT\n5\n6\n7\nHIT\n9\n");

    let cfg = Config {
        before_context: 1,
        after_context: 1,
        ..fixed(b"HIT")
    };
    let (out, code) = run_search(&cfg, &[f]);
    assert_eq!(out, b"3\nHIT\n5\n--\n7\nHIT\n9\n");
    assert_eq!(code, 0);
}

#[test]
fn e2e_group_separator_appears_between_files() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_file(dir.path(), "a.txt", b"HIT\n");
    let b = write_file(dir.path(), "b.txt", b"HIT\n");

    let cfg = Config {
        after_context: 1,
        filename_display: FilenameDisplay::Suppress,
        ..fixed(b"HIT")
    };
    let (out, _) = run_search(&cfg, &[a, b]);
    assert_eq!(out, b"HIT\n--\nHIT\n");
}

// =============================================================================
// Scenario: invert + count
// =============================================================================

#[test]
fn e2e_invert_count() {
    let dir = tempfile::tempdir().unwrap();
    let f = write_file(dir.path(), "ic.txt", b"a\nb\na\n");

    let cfg = Config {
        invert_match: true,
        out_mode: OutMode::CountOnly,
        ..fixed(b"a")
    };
    let (out, code) = run_search(&cfg, &[f]);
    assert_eq!(out, b"1\n");
    assert_eq!(code, 0);
}

// =============================================================================
// Scenario: binary detection
// =============================================================================

#[test]
fn e2e_binary_detection() {
    let dir = tempfile::tempdir().unwrap();
    let f = write_file(dir.path(), "bin.dat", b"hello\x00world\n");

    let (out, code) = run_search(&fixed(b"hello"), &[f.clone()]);
    let expected = format!("Binary file {} matches\n", f.display());
    assert_eq!(String::from_utf8(out).unwrap(), expected);
    assert_eq!(code, 0);

    let cfg = Config {
        binary_policy: BinaryPolicy::Text,
        ..fixed(b"hello")
    };
    let (out, code) = run_search(&cfg, &[f.clone()]);
    assert_eq!(out, b"hello\x00world\n");
    assert_eq!(code, 0);

    let cfg = Config {
        binary_policy: BinaryPolicy::WithoutMatch,
        ..fixed(b"hello")
    };
    let (out, code) = run_search(&cfg, &[f]);
    assert!(out.is_empty());
    assert_eq!(code, 1);
}

// =============================================================================
// Scenario: null-data records
// =============================================================================

#[test]
fn e2e_null_data() {
    let dir = tempfile::tempdir().unwrap();
    let f = write_file(dir.path(), "nul.dat", b"x\0y\0z\0");

    let cfg = Config {
        eol_byte: 0,
        ..fixed(b"y")
    };
    let (out, code) = run_search(&cfg, &[f]);
    assert_eq!(out, b"y\0");
    assert_eq!(code, 0);
}

// =============================================================================
// Scenario: recursive loop detection
// =============================================================================

#[cfg(unix)]
#[test]
fn e2e_recursive_loop_sets_error_status() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write_file(root, "plain.txt", b"nothing here\n");
    std::os::unix::fs::symlink(root, root.join("loop")).unwrap();

    let cfg = Config {
        dir_policy: DirPolicy::Recurse,
        ..fixed(b"absent")
    };
    let (out, code) = run_search(&cfg, &[root.to_path_buf()]);
    assert!(out.is_empty(), "the cyclic branch produces no output");
    assert_eq!(code, 2, "a detected loop is an error");

    let cfg = Config {
        suppress_errors: true,
        ..cfg
    };
    let (_, code) = run_search(&cfg, &[root.to_path_buf()]);
    assert_eq!(code, 1, "-s keeps the loop out of the exit status");
}

#[test]
fn e2e_recursion_forces_filenames() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let sub = root.join("sub");
    fs::create_dir(&sub).unwrap();
    let child = write_file(&sub, "c.txt", b"needle\n");

    let cfg = Config {
        dir_policy: DirPolicy::Recurse,
        ..fixed(b"needle")
    };
    let (out, code) = run_search(&cfg, &[root.to_path_buf()]);
    let expected = format!("{}:needle\n", child.display());
    assert_eq!(String::from_utf8(out).unwrap(), expected);
    assert_eq!(code, 0);
}

// =============================================================================
// Offsets, line numbers, max count
// =============================================================================

#[test]
fn e2e_byte_offsets_point_at_line_starts() {
    let dir = tempfile::tempdir().unwrap();
    let f = write_file(dir.path(), "off.txt", b"a\nbb\nccc\n");

    let cfg = Config {
        show_byte_offset: true,
        ..fixed(b"ccc")
    };
    let (out, _) = run_search(&cfg, &[f]);
    assert_eq!(out, b"5:ccc\n");
}

#[test]
fn e2e_line_numbers_count_terminators() {
    let dir = tempfile::tempdir().unwrap();
    let f = write_file(dir.path(), "ln.txt", b"x\ny\nz\ny\n");

    let cfg = Config {
        show_line_number: true,
        ..fixed(b"y")
    };
    let (out, _) = run_search(&cfg, &[f]);
    assert_eq!(out, b"2:y\n4:y\n");
}

#[test]
fn e2e_max_count_caps_each_file() {
    let dir = tempfile::tempdir().unwrap();
    let f = write_file(dir.path(), "mc.txt", b"hit\nhit\nhit\n");

    let cfg = Config {
        max_count: Some(2),
        ..fixed(b"hit")
    };
    let (out, code) = run_search(&cfg, &[f]);
    assert_eq!(out, b"hit\nhit\n");
    assert_eq!(code, 0);
}

/// The capped-scan reposition contract: after the cap triggers, a seekable
/// descriptor points just past the last match line; when the scan ends for
/// other reasons it points at the end of the last scanned buffer.
#[test]
fn e2e_capped_scan_reposition_targets() {
    use linesift::platform::input::{reposition_stdin, ScanSource};
    use std::io::Seek;

    let dir = tempfile::tempdir().unwrap();
    let f = write_file(dir.path(), "seek.txt", b"hit\nmiss\nhit\nmiss\n");

    let cfg = Config {
        max_count: Some(1),
        ..fixed(b"hit")
    };
    let matcher = compile(
        &cfg.matcher_name,
        &cfg.pattern,
        &MatcherOptions {
            case_insensitive: false,
            word_match: false,
            line_match: false,
            eol_byte: b'\n',
        },
    )
    .unwrap();
    let mut searcher = Searcher::new(&cfg, matcher.as_ref(), Vec::new());

    let file = fs::File::open(&f).unwrap();
    let len = file.metadata().unwrap().len();
    let mut source = ScanSource {
        file,
        file_size: Some(len),
        initial_offset: 0,
        map: None,
        is_stdin: true,
        seekable_regular: true,
    };
    let report = searcher.scan(&mut source.file, Some(len), 0, None, b"(standard input)", false);
    assert_eq!(report.lines, 1);
    assert!(!report.outleft_remaining);
    assert_eq!(report.after_last_match, 4, "one past the first match line");

    reposition_stdin(&mut source, report.after_last_match).unwrap();
    assert_eq!(source.file.stream_position().unwrap(), 4);
}

// =============================================================================
// Output modes
// =============================================================================

#[test]
fn e2e_list_matching_and_nonmatching_files() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_file(dir.path(), "a.txt", b"foo\n");
    let b = write_file(dir.path(), "b.txt", b"bar\n");

    let cfg = Config {
        out_mode: OutMode::ListMatching,
        ..fixed(b"foo")
    };
    let (out, code) = run_search(&cfg, &[a.clone(), b.clone()]);
    assert_eq!(String::from_utf8(out).unwrap(), format!("{}\n", a.display()));
    assert_eq!(code, 0);

    let cfg = Config {
        out_mode: OutMode::ListNonMatching,
        ..fixed(b"foo")
    };
    let (out, code) = run_search(&cfg, &[a, b.clone()]);
    assert_eq!(String::from_utf8(out).unwrap(), format!("{}\n", b.display()));
    assert_eq!(code, 0, "a listed file is the mode's success");
}

#[test]
fn e2e_count_mode_prefixes_filenames_for_multiple_inputs() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_file(dir.path(), "a.txt", b"x\nx\n");
    let b = write_file(dir.path(), "b.txt", b"y\n");

    let cfg = Config {
        out_mode: OutMode::CountOnly,
        ..fixed(b"x")
    };
    let (out, code) = run_search(&cfg, &[a.clone(), b.clone()]);
    let expected = format!("{}:2\n{}:0\n", a.display(), b.display());
    assert_eq!(String::from_utf8(out).unwrap(), expected);
    assert_eq!(code, 0);
}

#[test]
fn e2e_null_after_filename_replaces_first_separator_only() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_file(dir.path(), "a.txt", b"x\n");

    let cfg = Config {
        null_after_filename: true,
        show_line_number: true,
        filename_display: FilenameDisplay::Force,
        ..fixed(b"x")
    };
    let (out, _) = run_search(&cfg, &[a.clone()]);
    let mut expected = Vec::new();
    expected.extend_from_slice(a.display().to_string().as_bytes());
    expected.push(0);
    expected.extend_from_slice(b"1:x\n");
    assert_eq!(out, expected);
}

#[test]
fn e2e_quiet_mode_exits_zero_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_file(dir.path(), "a.txt", b"nope\n");
    let b = write_file(dir.path(), "b.txt", b"yes\n");

    let cfg = Config {
        out_mode: OutMode::Quiet,
        ..fixed(b"yes")
    };
    let (out, code) = run_search(&cfg, &[a, b]);
    assert!(out.is_empty());
    assert_eq!(code, 0);
}

// =============================================================================
// Error paths
// =============================================================================

#[test]
fn e2e_unreadable_operand_yields_status_two() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("not-there.txt");

    let (out, code) = run_search(&fixed(b"x"), &[missing.clone()]);
    assert!(out.is_empty());
    assert_eq!(code, 2);

    // Suppression hides the message but the status still reports the error.
    let cfg = Config {
        suppress_errors: true,
        ..fixed(b"x")
    };
    let (_, code) = run_search(&cfg, &[missing]);
    assert_eq!(code, 2);
}

#[test]
fn e2e_directory_under_skip_policy_is_silent() {
    let dir = tempfile::tempdir().unwrap();
    let sub = dir.path().join("sub");
    fs::create_dir(&sub).unwrap();

    let cfg = Config {
        dir_policy: DirPolicy::Skip,
        ..fixed(b"x")
    };
    let (out, code) = run_search(&cfg, &[sub]);
    assert!(out.is_empty());
    assert_eq!(code, 1, "a skipped directory is a plain no-match");
}

// =============================================================================
// The mmap window produces identical output
// =============================================================================

#[test]
fn e2e_mmap_output_matches_read_path() {
    let dir = tempfile::tempdir().unwrap();
    let mut body = Vec::new();
    for i in 0..5000 {
        body.extend_from_slice(format!("line number {i}\n").as_bytes());
    }
    body.extend_from_slice(b"trailing without newline");
    let f = write_file(dir.path(), "big.txt", &body);

    let plain = Config {
        show_line_number: true,
        ..fixed(b"number 4999")
    };
    let mapped = Config {
        use_mmap: true,
        ..plain.clone()
    };

    let (out_read, code_read) = run_search(&plain, &[f.clone()]);
    let (out_map, code_map) = run_search(&mapped, &[f]);
    assert_eq!(out_read, out_map);
    assert_eq!(code_read, code_map);
    assert_eq!(out_read, b"5000:line number 4999\n");
}
