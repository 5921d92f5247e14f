//! Whole-file API: explicit destination, in-place rewrite via sibling temp
//! file, and failure reporting.

use core_engine::{EngineError, Options, clean_file};

const SRC: &str = "%%EndPageSetup\nGS\np\nN\n0 0 M\n1 0 L\nGR\n%%Trailer\n";
const CLEANED: &str = "%%EndPageSetup\nGS\np\nN\n0 0 M\n1 0 L\nS\nGR\n%%Trailer\n";

#[test]
fn writes_to_explicit_destination() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("figure.eps");
    let output = dir.path().join("figure.clean.eps");
    std::fs::write(&input, SRC).unwrap();

    let stats = clean_file(&input, Some(&output), &Options::default()).unwrap();
    assert_eq!(stats.blocks, 1);
    assert_eq!(std::fs::read_to_string(&output).unwrap(), CLEANED);
    // Source untouched.
    assert_eq!(std::fs::read_to_string(&input).unwrap(), SRC);
}

#[test]
fn rewrites_in_place_through_sibling_temp() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("figure.eps");
    std::fs::write(&input, SRC).unwrap();

    clean_file(&input, None, &Options::default()).unwrap();
    assert_eq!(std::fs::read_to_string(&input).unwrap(), CLEANED);
    // The temp file was renamed over the original, not left behind.
    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(leftovers, vec![std::ffi::OsString::from("figure.eps")]);
}

#[test]
fn destination_equal_to_input_goes_through_temp() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("figure.eps");
    std::fs::write(&input, SRC).unwrap();

    clean_file(&input, Some(&input), &Options::default()).unwrap();
    assert_eq!(std::fs::read_to_string(&input).unwrap(), CLEANED);
}

#[test]
fn missing_input_is_a_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("absent.eps");
    let err = clean_file(&input, None, &Options::default()).unwrap_err();
    assert!(matches!(err, EngineError::Read { .. }));
    let msg = err.to_string();
    assert!(msg.contains("absent.eps"));
}
