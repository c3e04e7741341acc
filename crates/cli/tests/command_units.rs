#![cfg(unix)]

mod support;

use std::path::Path;

use flatbin::commands::{
    build_command, clean_command, locate_tool, parse_address, resolve_config, BuildOverrides,
};
use flatbin_core::{ExtractorKind, TargetState};
use support::Sandbox;

#[test]
fn parse_address_accepts_hex_and_decimal() {
    assert_eq!(parse_address("0").unwrap(), 0);
    assert_eq!(parse_address("4096").unwrap(), 4096);
    assert_eq!(parse_address("0x8000_0000").unwrap(), 0x8000_0000);
    assert_eq!(parse_address("0X1f").unwrap(), 0x1f);
    assert!(parse_address("0xzz").is_err());
    assert!(parse_address("").is_err());
}

#[test]
fn flags_override_the_config_file() {
    let sandbox = Sandbox::new();
    let overrides = BuildOverrides {
        prefix: Some("riscv32-unknown-elf-".into()),
        base_address: Some(0x8000_0000),
        extractor: Some("elf".into()),
        no_c: true,
        jobs: Some(4),
        fail_fast: true,
        ..BuildOverrides::default()
    };

    let config = resolve_config(Some(sandbox.config_str()), &overrides).unwrap();
    assert_eq!(config.fixtures_dir, sandbox.fixtures);
    assert_eq!(config.toolchain.prefix, "riscv32-unknown-elf-");
    // Explicit paths from the file still win over the prefix.
    assert_eq!(config.toolchain.gcc_path(), Path::new("/bin/sh"));
    assert_eq!(config.link.base_address, 0x8000_0000);
    assert_eq!(config.extractor, ExtractorKind::Elf);
    assert!(!config.include_c);
    assert_eq!(config.jobs, 4);
    assert!(config.fail_fast);
    assert!(!config.force);
}

#[test]
fn fixtures_flag_replaces_the_configured_directory() {
    let sandbox = Sandbox::new();
    let other = sandbox.path().join("other");
    let overrides = BuildOverrides {
        fixtures: Some(other.to_string_lossy().into_owned()),
        ..BuildOverrides::default()
    };
    let config = resolve_config(Some(sandbox.config_str()), &overrides).unwrap();
    assert_eq!(config.fixtures_dir, other);
}

#[test]
fn unreadable_config_is_reported_with_its_path() {
    let err = resolve_config(Some("/no/such/flatbin.json"), &BuildOverrides::default())
        .unwrap_err();
    assert!(format!("{err:#}").contains("/no/such/flatbin.json"), "{err:#}");
}

#[test]
fn build_command_returns_the_report_on_success() {
    let sandbox = Sandbox::new();
    sandbox.write("add-addi.s", "addi x31, x0, 6\n");
    sandbox.write("sum.c", "int main(void) { return 0; }\n");
    let overrides = BuildOverrides { jobs: Some(2), ..BuildOverrides::default() };
    let config = resolve_config(Some(sandbox.config_str()), &overrides).unwrap();

    let report = build_command(&config, false).unwrap();
    assert_eq!(report.outcomes.len(), 2);
    assert!(report.outcomes.iter().all(|o| o.state == TargetState::Extracted));

    // A second run finds everything current.
    let again = build_command(&config, false).unwrap();
    assert!(again.outcomes.iter().all(|o| o.skipped));
}

#[test]
fn build_command_errors_when_the_barrier_fails() {
    let sandbox = Sandbox::new();
    sandbox.write("broken.s", "# syntax error\n");
    let config = resolve_config(Some(sandbox.config_str()), &BuildOverrides::default()).unwrap();

    let err = build_command(&config, false).unwrap_err();
    assert!(err.to_string().contains("broken.s"), "{err}");
}

#[test]
fn clean_command_on_missing_directory_is_a_no_op() {
    let sandbox = Sandbox::new();
    let overrides = BuildOverrides {
        fixtures: Some(sandbox.path().join("gone").to_string_lossy().into_owned()),
        ..BuildOverrides::default()
    };
    let config = resolve_config(Some(sandbox.config_str()), &overrides).unwrap();
    clean_command(&config).unwrap();
}

#[test]
fn locate_tool_handles_paths_and_bare_names() {
    assert_eq!(locate_tool(Path::new("/bin/sh")).as_deref(), Some(Path::new("/bin/sh")));
    assert!(locate_tool(Path::new("/no/such/tool")).is_none());
    assert!(locate_tool(Path::new("sh")).is_some(), "sh should be on PATH");
    assert!(locate_tool(Path::new("flatbin-no-such-tool")).is_none());
}
