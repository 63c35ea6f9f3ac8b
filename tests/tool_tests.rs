#![cfg(feature = "tool")]

//! Integration tests for the `lexmap` shell binary.
//!
//! These tests run the actual binary and verify its behavior.

use std::io::Write;
use std::process::{Command, Stdio};

/// Get the path to the lexmap binary
fn lexmap_binary() -> std::path::PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps
    path.push("lexmap");
    path
}

/// Run the lexmap binary with CLI arguments
fn run_cli(args: &[&str]) -> (String, String, bool) {
    let output = Command::new(lexmap_binary())
        .args(args)
        .output()
        .expect("Failed to execute lexmap binary");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

/// Run the lexmap binary in shell mode with piped input
fn run_shell(input: &str) -> (String, String, bool) {
    let mut child = Command::new(lexmap_binary())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn lexmap binary");

    {
        let stdin = child.stdin.as_mut().expect("Failed to open stdin");
        stdin
            .write_all(input.as_bytes())
            .expect("Failed to write to stdin");
    }

    let output = child.wait_with_output().expect("Failed to read output");
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

// ============================================================================
// CLI Command Tests
// ============================================================================

#[test]
fn test_cli_set() {
    let (stdout, stderr, success) = run_cli(&["set", "mykey", "myvalue"]);
    assert!(success, "set failed: {}", stderr);
    assert!(stdout.contains("OK (set)"), "Expected OK in output: {}", stdout);
}

#[test]
fn test_cli_get_nonexistent() {
    let (stdout, _, success) = run_cli(&["get", "nonexistent"]);
    assert!(success);
    assert!(stdout.contains("(not found)"), "Expected '(not found)': {}", stdout);
}

#[test]
fn test_cli_status() {
    let (stdout, _, success) = run_cli(&["status"]);
    assert!(success);
    assert_eq!("[SortedMap]\ndefault : length=0\n", stdout);
}

#[test]
fn test_cli_invalid_probability() {
    let (_, stderr, success) = run_cli(&["-p", "1.5", "count"]);
    assert!(!success);
    assert!(stderr.contains("not in (0, 1)"), "{}", stderr);
}

#[test]
fn test_cli_help() {
    let (stdout, _, _) = run_cli(&["--help"]);

    assert!(stdout.contains("Shell for interacting with named sorted maps"));
    assert!(stdout.contains("get"));
    assert!(stdout.contains("setnx"));
    assert!(stdout.contains("scan"));
}

// ============================================================================
// Shell Tests
// ============================================================================

#[test]
fn test_shell_set_and_get() {
    let (stdout, stderr, success) = run_shell("set mykey myvalue\nget mykey\nexit\n");

    assert!(success, "Shell failed: {}", stderr);
    assert!(stdout.contains("OK (set)"), "{}", stdout);
    assert!(stdout.lines().any(|line| line == "myvalue"), "{}", stdout);
}

#[test]
fn test_shell_overwrite_and_setnx() {
    let (stdout, _, success) =
        run_shell("set k v1\nset k v2\nsetnx k v3\nsetnx other x\nget k\nexit\n");

    assert!(success);
    assert!(stdout.contains("OK (replaced)"), "{}", stdout);
    assert!(stdout.contains("OK (exists: v2)"), "{}", stdout);
    assert!(stdout.lines().any(|line| line == "v2"), "{}", stdout);
}

#[test]
fn test_shell_del() {
    let (stdout, _, success) = run_shell("set key1 value1\ndel key1\nget key1\ncount\nexit\n");

    assert!(success);
    assert!(stdout.contains("(not found)"), "{}", stdout);
    assert!(stdout.lines().any(|line| line == "0"), "{}", stdout);
}

#[test]
fn test_shell_quoted_values() {
    let (stdout, _, success) = run_shell("set key \"hello world\"\nscan\nexit\n");

    assert!(success);
    assert!(stdout.contains("key = hello world"), "{}", stdout);
}

#[test]
fn test_shell_scan() {
    let (stdout, _, success) = run_shell("set c 3\nset a 1\nset b 2\nscan\nexit\n");

    assert!(success);
    let a = stdout.find("a = 1").expect("should list a");
    let b = stdout.find("b = 2").expect("should list b");
    let c = stdout.find("c = 3").expect("should list c");
    assert!(a < b && b < c, "{}", stdout);
    assert!(stdout.contains("OK (3 items)"), "{}", stdout);
}

#[test]
fn test_shell_scan_reverse_offset_limit() {
    let (stdout, _, success) = run_shell(
        "set a 1\nset b 2\nset c 3\nset d 4\nscan c -r --offset 1 --limit 1\nexit\n",
    );

    assert!(success);
    assert!(stdout.contains("b = 2"), "{}", stdout);
    assert!(!stdout.contains("c = 3"), "{}", stdout);
    assert!(!stdout.contains("a = 1"), "{}", stdout);
    assert!(stdout.contains("OK (1 items)"), "{}", stdout);
}

#[test]
fn test_shell_quit_alias() {
    let (_, _, success) = run_shell("quit\n");
    assert!(success);
}

// ============================================================================
// Registry Tests
// ============================================================================

#[test]
fn test_shell_create_use_list() {
    let (stdout, stderr, success) = run_shell(
        "create users\nuse users\nset alice 1\nuse default\nget alice\nlist\nstatus\nexit\n",
    );

    assert!(success, "Shell failed: {}", stderr);
    assert!(stdout.contains("OK (created)"), "{}", stdout);
    assert!(stdout.contains("OK (using users)"), "{}", stdout);
    assert!(stdout.contains("(not found)"), "{}", stdout);
    assert!(stdout.contains("default (SortedMap)"), "{}", stdout);
    assert!(stdout.contains("users (SortedMap)"), "{}", stdout);
    assert!(stdout.contains("users : length=1"), "{}", stdout);
}

#[test]
fn test_shell_create_twice() {
    let (_, stderr, success) = run_shell("create users\ncreate users\nexit\n");

    assert!(success);
    assert!(stderr.contains("already exists"), "{}", stderr);
}

#[test]
fn test_shell_drop() {
    let (stdout, stderr, success) =
        run_shell("create tmp\ndrop tmp\nuse tmp\ndrop default\nexit\n");

    assert!(success);
    assert!(stdout.contains("OK (dropped)"), "{}", stdout);
    assert!(stderr.contains("not found"), "{}", stderr);
    assert!(stderr.contains("cannot drop the selected map"), "{}", stderr);
}

// ============================================================================
// Batch Operation Tests
// ============================================================================

#[test]
fn test_batch_begin_commit() {
    let (stdout, stderr, success) =
        run_shell("begin\nset k1 v1\nset k2 v2\nset k3 v3\ndel k2\ncommit\nscan\nexit\n");

    assert!(success, "Shell failed: {}", stderr);
    assert!(stdout.contains("OK (batch started)"), "{}", stdout);
    assert!(stdout.contains("OK (batched, ready to commit)"), "{}", stdout);
    assert!(stdout.contains("OK (batch committed)"), "{}", stdout);
    assert!(stdout.contains("k1 = v1"));
    assert!(!stdout.contains("k2 = v2"));
    assert!(stdout.contains("k3 = v3"));
}

#[test]
fn test_batch_rollback() {
    let (stdout, _, success) =
        run_shell("set existing before\nbegin\nset k1 v1\nrollback\nscan\nexit\n");

    assert!(success);
    assert!(stdout.contains("OK (batch rolled back)"));
    assert!(!stdout.contains("k1 = v1"));
    assert!(stdout.contains("existing = before"));
}

#[test]
fn test_batch_get_reads_from_batch() {
    let (stdout, _, success) =
        run_shell("set gone x\nbegin\nset newkey newvalue\ndel gone\nget newkey\nget gone\nexit\n");

    assert!(success);
    assert!(stdout.lines().any(|line| line == "newvalue"), "{}", stdout);
    assert!(stdout.contains("(deleted in batch)"), "{}", stdout);
}

#[test]
fn test_batch_info_shows_operations() {
    let (stdout, _, success) = run_shell("begin\nset a 1\nsetnx b 2\ndel c\ninfo\nexit\n");

    assert!(success);
    assert!(stdout.contains("Active batch (3 operations)"), "{}", stdout);
    assert!(stdout.contains("1. SET a = 1"), "{}", stdout);
    assert!(stdout.contains("2. SETNX b = 2"), "{}", stdout);
    assert!(stdout.contains("3. DEL c"), "{}", stdout);
}

#[test]
fn test_batch_errors() {
    let (_, stderr, success) = run_shell("commit\nrollback\nbegin\nbegin\nexit\n");

    assert!(success);
    assert!(stderr.contains("no active batch"), "{}", stderr);
    assert!(stderr.contains("batch already active"), "{}", stderr);
    assert!(stderr.contains("discarding uncommitted batch"), "{}", stderr);
}

#[test]
fn test_batch_empty_commit() {
    let (_, stderr, success) = run_shell("begin\ncommit\nexit\n");

    assert!(success);
    assert!(stderr.contains("transaction must not be empty"), "{}", stderr);
}

// ============================================================================
// Error Handling Tests
// ============================================================================

#[test]
fn test_unclosed_quote_error() {
    let (_, stderr, success) = run_shell("set key \"unclosed\nexit\n");

    assert!(success);
    assert!(stderr.contains("unclosed quote"), "{}", stderr);
}

#[test]
fn test_empty_key_error() {
    let (_, stderr, success) = run_shell("set \"\" value\nexit\n");

    assert!(success);
    assert!(stderr.contains("key must not be empty"), "{}", stderr);
}

#[test]
fn test_unknown_command_error() {
    let (_, stderr, success) = run_shell("notacommand\nexit\n");

    assert!(success);
    assert!(
        stderr.contains("unrecognized subcommand") || stderr.contains("error"),
        "Should error on unknown command: {}",
        stderr
    );
}

// ============================================================================
// Diagnostics
// ============================================================================

#[test]
fn test_info_and_dump() {
    let (stdout, _, success) = run_shell("set abc def\ninfo\ndump\nexit\n");

    assert!(success);
    assert!(stdout.contains("Map: default"), "{}", stdout);
    assert!(stdout.contains("Items: 1"), "{}", stdout);
    assert!(stdout.contains("Approximate size: 6 B"), "{}", stdout);
    assert!(stdout.contains("L0: "), "{}", stdout);
    assert!(stdout.contains(", total 1"), "{}", stdout);
}
