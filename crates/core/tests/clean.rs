#![cfg(feature = "elf-extractor")]

mod support;

use flatbin_core::clean::clean;
use flatbin_core::{build_fixtures, BuildConfig};
use support::{fake_toolchain, write, write_add_addi};
use tempfile::tempdir;

#[test]
fn clean_restores_only_hand_written_sources() {
    let temp = tempdir().unwrap();
    let root = temp.path();
    write_add_addi(root);
    write(root, "fib.c", "emit(0x00100093);\n");
    write(root, "notes.txt", "keep me\n");
    let (toolchain, _) = fake_toolchain();
    build_fixtures(&BuildConfig::for_fixtures(root), &toolchain).unwrap().barrier().unwrap();
    assert!(root.join("fib.s").is_file());

    let removed = clean(root).unwrap();
    assert_eq!(removed, vec![root.join("add-addi.bin"), root.join("fib.bin"), root.join("fib.s")]);

    let mut left: Vec<String> = std::fs::read_dir(root)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    left.sort();
    assert_eq!(left, vec!["add-addi.s", "fib.c", "notes.txt"]);
}

#[test]
fn clean_removes_orphaned_images_too() {
    let temp = tempdir().unwrap();
    write(temp.path(), "old.bin", "\u{1}");
    let removed = clean(temp.path()).unwrap();
    assert_eq!(removed, vec![temp.path().join("old.bin")]);
}

#[test]
fn clean_of_missing_dir_is_a_no_op() {
    let temp = tempdir().unwrap();
    assert!(clean(&temp.path().join("nope")).unwrap().is_empty());
}
