use std::fs;

use flatbin::canonicalize_or_current;
use tempfile::tempdir;

#[test]
fn canonicalize_or_current_returns_cwd_for_dot() {
    let original = std::env::current_dir().expect("cwd");
    let tmp = tempdir().expect("tempdir");
    std::env::set_current_dir(tmp.path()).expect("chdir tmp");

    let result = canonicalize_or_current(".").expect("canonicalize").canonicalize().expect("canon");
    let expected = tmp.path().canonicalize().expect("canon tmp");
    std::env::set_current_dir(original).expect("restore cwd");
    assert_eq!(result, expected);
}

#[test]
fn canonicalize_or_current_keeps_missing_paths_absolute() {
    let tmp = tempdir().expect("tempdir");
    let nested = tmp.path().join("fixtures");
    fs::create_dir_all(&nested).expect("create nested");

    let existing = canonicalize_or_current(nested.to_str().unwrap()).expect("existing");
    assert_eq!(existing, nested.canonicalize().expect("canon nested"));

    let missing = canonicalize_or_current("no/such/fixtures").expect("missing");
    assert!(missing.is_absolute());
    assert!(missing.ends_with("no/such/fixtures"));
}
