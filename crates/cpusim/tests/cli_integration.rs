//! Integration tests for the cpusim binary.

use anyhow as _;
use clap as _;
use cpusim_core as _;
use crossterm as _;
use tracing as _;
use tracing_subscriber as _;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

fn write_rom(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, bytes).unwrap();
    path
}

fn cpusim(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_cpusim"))
        .args(args)
        .env_remove("RUST_LOG")
        .stdin(Stdio::null())
        .output()
        .expect("failed to run cpusim")
}

#[test]
fn runs_8008_rom_to_halt() {
    let temp_dir = tempfile::tempdir().unwrap();
    // MVI A, 'h' ; OUT 12h ; MVI A, 'i' ; OUT 12h ; HLT
    let rom = write_rom(
        temp_dir.path(),
        "hi.rom",
        &[0x06, b'h', 0x65, 0x06, b'i', 0x65, 0x00],
    );

    let output = cpusim(&["8008", "--no-raw", "--rom-file", rom.to_str().unwrap()]);
    assert!(output.status.success());
    assert_eq!(output.stdout, b"hi");
}

#[test]
fn runs_4004_rom_to_halt() {
    let temp_dir = tempfile::tempdir().unwrap();
    // LDM 4 ; DCL ; FIM P0, E0h ; SRC P0 ; LDM 6 ; WR1 ; LDM 9 ; WR0 ; HLT
    let rom = write_rom(
        temp_dir.path(),
        "i.rom",
        &[0xD4, 0xFD, 0x20, 0xE0, 0x21, 0xD6, 0xE5, 0xD9, 0xE4, 0x01],
    );

    let output = cpusim(&["4004", "--no-raw", "-f", rom.to_str().unwrap()]);
    assert!(output.status.success());
    assert_eq!(output.stdout, b"i");
}

#[test]
fn fatal_cpu_error_exits_with_one() {
    let temp_dir = tempfile::tempdir().unwrap();
    let rom = write_rom(temp_dir.path(), "bad.rom", &[0xFE]);

    let output = cpusim(&["4004", "--no-raw", "-f", rom.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid opcode 0xFE"), "stderr: {stderr}");
}

#[test]
fn missing_rom_exits_with_one() {
    let temp_dir = tempfile::tempdir().unwrap();
    let missing = temp_dir.path().join("missing.rom");

    let output = cpusim(&["8008", "--no-raw", "-f", missing.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("missing.rom"));
}

#[test]
fn usage_errors_exit_with_two() {
    let output = cpusim(&["z80", "-f", "x.rom"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn disassembles_instead_of_running() {
    let temp_dir = tempfile::tempdir().unwrap();
    let rom = write_rom(temp_dir.path(), "list.rom", &[0x06, 0x41, 0x44, 0x00, 0x20, 0xFF]);

    let output = cpusim(&["8008", "-f", rom.to_str().unwrap(), "--disassemble", "3"]);
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<_> = stdout.lines().collect();
    assert_eq!(
        lines,
        vec!["0000: 06 41     MVI A, 41h", "0002: 44 00 20  JMP 2000h", "0005: FF        HLT"]
    );
}
