// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2025-present Datadog, Inc.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::fs;
use std::io::Read;
use std::os::unix::fs::symlink;
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tempfile::TempDir;

const FIND_ROOTS_BIN: &str = env!("CARGO_BIN_EXE_find-roots");

fn connect_with_retry(socket_path: &Path, timeout: Duration) -> UnixStream {
    let start = Instant::now();
    loop {
        match UnixStream::connect(socket_path) {
            Ok(stream) => return stream,
            Err(_) if start.elapsed() < timeout => thread::sleep(Duration::from_millis(50)),
            Err(e) => panic!("could not connect to {}: {e}", socket_path.display()),
        }
    }
}

#[test]
fn test_unknown_flag_exits_with_status_1() {
    let output = Command::new(FIND_ROOTS_BIN)
        .arg("--frobnicate")
        .output()
        .expect("Failed to run find-roots");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Usage"), "unexpected stderr: {stderr}");
    assert!(output.stdout.is_empty());
}

#[test]
fn test_help_exits_successfully() {
    let output = Command::new(FIND_ROOTS_BIN)
        .arg("--help")
        .output()
        .expect("Failed to run find-roots");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--store-dir"));
    assert!(stdout.contains("--socket-path"));
}

#[test]
fn test_unusable_socket_path_is_fatal() {
    let temp_dir = TempDir::new().unwrap();
    let blocker = temp_dir.path().join("file");
    fs::write(&blocker, "").unwrap();

    let output = Command::new(FIND_ROOTS_BIN)
        .arg("--socket-path")
        .arg(blocker.join("socket"))
        .arg("--proc-dir")
        .arg(temp_dir.path().join("no-proc"))
        .output()
        .expect("Failed to run find-roots");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Failed to setup Unix socket"),
        "unexpected stderr: {stderr}"
    );
}

#[test]
fn test_serves_roots_over_socket() {
    let temp_dir = TempDir::new().unwrap();
    let store = temp_dir.path().join("store");
    let state = temp_dir.path().join("state");
    let socket_path = temp_dir.path().join("gc.sock");
    fs::create_dir_all(store.join("abcxyz-pkg")).unwrap();
    fs::create_dir_all(state.join("gcroots")).unwrap();
    let foo = state.join("gcroots/foo");
    symlink(store.join("abcxyz-pkg"), &foo).unwrap();

    let mut child = Command::new(FIND_ROOTS_BIN)
        .arg("-s")
        .arg(&store)
        .arg("-d")
        .arg(&state)
        .arg("-l")
        .arg(&socket_path)
        .arg("--proc-dir")
        .arg(temp_dir.path().join("no-proc"))
        .stderr(Stdio::null())
        .spawn()
        .expect("Failed to spawn find-roots");

    let mut stream = connect_with_retry(&socket_path, Duration::from_secs(10));
    let mut response = String::new();
    stream.read_to_string(&mut response).unwrap();

    child.kill().ok();
    child.wait().expect("Failed to wait on child");

    assert_eq!(
        response,
        format!(
            "{}\t{}\n\n",
            store.join("abcxyz-pkg").display(),
            foo.display()
        )
    );
}
