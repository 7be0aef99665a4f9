// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2025-present Datadog, Inc.

use std::path::{Path, PathBuf};

pub const DEFAULT_STORE_DIR: &str = "/nix/store";
pub const DEFAULT_STATE_DIR: &str = "/nix/var/nix";
pub const DEFAULT_PROC_ROOT: &str = "/proc";

/// Location of the socket relative to the state directory.
const SOCKET_SUBPATH: &str = "gc-socket/socket";

/// Runtime configuration. Built once at startup and never modified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub store_dir: PathBuf,
    pub state_dir: PathBuf,
    pub socket_path: PathBuf,
    /// Mount point of the process-information filesystem.
    pub proc_root: PathBuf,
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        let state_dir = PathBuf::from(DEFAULT_STATE_DIR);
        Self {
            store_dir: PathBuf::from(DEFAULT_STORE_DIR),
            socket_path: default_socket_path(&state_dir),
            state_dir,
            proc_root: PathBuf::from(DEFAULT_PROC_ROOT),
            verbose: false,
        }
    }
}

impl Config {
    /// The directories traced on every request: user and system profiles,
    /// and the explicit GC roots.
    pub fn standard_roots(&self) -> [PathBuf; 2] {
        [
            self.state_dir.join("profiles"),
            self.state_dir.join("gcroots"),
        ]
    }
}

pub fn default_socket_path(state_dir: &Path) -> PathBuf {
    state_dir.join(SOCKET_SUBPATH)
}
