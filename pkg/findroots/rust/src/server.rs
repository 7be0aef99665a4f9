// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2025-present Datadog, Inc.

//! Unix socket service handing the traced roots to the garbage collector.
//!
//! Connections are served one at a time on the calling thread: every request
//! traces the filesystem and the process table again, then the response is
//! written and the connection closed.

use std::fs::{self, DirBuilder};
use std::io::{BufWriter, ErrorKind};
use std::os::unix::fs::DirBuilderExt;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, error, info, warn};

use crate::config::Config;
use crate::diagnostics::LogDiagnostics;
use crate::errors::Error;
use crate::protocol::write_trace;
use crate::roots::TraceResult;
use crate::runtime::get_runtime_roots;
use crate::store::StoreDir;
use crate::traverse::follow_paths_to_store;

fn setup_socket(socket_path: &Path) -> Result<UnixListener> {
    if let Some(parent) = socket_path.parent()
        && !parent.as_os_str().is_empty()
    {
        DirBuilder::new()
            .recursive(true)
            .mode(0o755)
            .create(parent)
            .context("Failed to create socket parent directory")?;
    }

    fs::remove_file(socket_path)
        .or_else(|error| {
            if error.kind() == ErrorKind::NotFound {
                Ok(())
            } else {
                Err(error)
            }
        })
        .context("failed to remove existing socket")?;

    UnixListener::bind(socket_path)
        .with_context(|| format!("Cannot bind to socket {}", socket_path.display()))
}

pub struct RootServer {
    config: Config,
    store: StoreDir,
    listener: UnixListener,
    diag: LogDiagnostics,
}

impl RootServer {
    /// Binds the socket described by `config`, replacing a stale socket file
    /// left by a previous run.
    pub fn bind(config: Config) -> Result<Self> {
        let store = StoreDir::new(&config.store_dir)?;
        let listener = setup_socket(&config.socket_path)?;
        info!("Listening on {}", config.socket_path.display());

        Ok(Self {
            diag: LogDiagnostics::new(config.verbose),
            config,
            store,
            listener,
        })
    }

    /// Serves connections until accepting one fails.
    pub fn serve_forever(&self) -> Result<()> {
        loop {
            self.serve_next()?;
        }
    }

    /// Waits for the next client and serves it.
    pub fn serve_next(&self) -> Result<()> {
        let stream = loop {
            match self.listener.accept() {
                Ok((stream, _)) => break stream,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e).context("Error accepting the connection"),
            }
        };

        self.handle_connection(stream);
        Ok(())
    }

    /// Sends a fresh trace on `stream` and closes it.
    ///
    /// Failures only affect this client: the connection is dropped without
    /// a complete response and the server moves on.
    pub fn handle_connection(&self, stream: UnixStream) {
        let trace = match self.compute_trace() {
            Ok(trace) => trace,
            Err(e) => {
                error!("Failed to collect the roots: {e}");
                return;
            }
        };
        debug!(
            "Sending {} store paths and {} dead links",
            trace.roots.len(),
            trace.dead_links.len()
        );

        let mut writer = BufWriter::new(&stream);
        if let Err(e) = write_trace(&mut writer, &trace) {
            warn!("Failed to send the roots: {e}");
        }
    }

    /// Traces the standard roots and merges in the roots of live processes.
    pub fn compute_trace(&self) -> Result<TraceResult, Error> {
        let mut trace =
            follow_paths_to_store(&self.store, self.config.standard_roots(), &self.diag);
        let runtime = get_runtime_roots(&self.store, &self.config.proc_root, &self.diag)?;
        trace.merge_runtime(runtime);

        Ok(trace)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::os::unix::fs::{FileTypeExt, symlink};
    use tempfile::TempDir;

    fn config_in(temp_dir: &TempDir) -> Config {
        let root = temp_dir.path();
        Config {
            store_dir: root.join("store"),
            state_dir: root.join("state"),
            socket_path: root.join("run/gc-socket/socket"),
            proc_root: root.join("proc"),
            verbose: false,
        }
    }

    #[test]
    fn test_bind_creates_parent_directory() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_in(&temp_dir);

        let server = RootServer::bind(config).unwrap();

        let metadata = fs::symlink_metadata(&server.config.socket_path).unwrap();
        assert!(metadata.file_type().is_socket());
    }

    #[test]
    fn test_bind_replaces_stale_socket() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_in(&temp_dir);

        let first = RootServer::bind(config.clone()).unwrap();
        drop(first);
        // The socket file outlives the listener.
        assert!(config.socket_path.exists());

        RootServer::bind(config).unwrap();
    }

    #[test]
    fn test_bind_fails_on_unusable_path() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("not-a-dir");
        fs::write(&blocker, "").unwrap();
        let config = Config {
            socket_path: blocker.join("socket"),
            ..config_in(&temp_dir)
        };

        assert!(RootServer::bind(config).is_err());
    }

    #[test]
    fn test_handle_connection_merges_runtime_roots() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_in(&temp_dir);
        let store = &config.store_dir;
        fs::create_dir_all(store.join("aaa-pkg")).unwrap();
        fs::create_dir_all(config.state_dir.join("gcroots")).unwrap();
        let gcroot = config.state_dir.join("gcroots/pkg");
        symlink(store.join("aaa-pkg"), &gcroot).unwrap();

        let pid = config.proc_root.join("1");
        fs::create_dir_all(&pid).unwrap();
        symlink(store.join("aaa-pkg/bin/prog"), pid.join("exe")).unwrap();
        fs::write(
            pid.join("environ"),
            format!("HOME=/root\0PKG={}\0", store.join("aaa-pkg").display()),
        )
        .unwrap();

        let server = RootServer::bind(config.clone()).unwrap();
        let (ours, theirs) = UnixStream::pair().unwrap();
        server.handle_connection(ours);

        let mut response = String::new();
        (&theirs).read_to_string(&mut response).unwrap();

        let expected = format!(
            "{store}/aaa-pkg\t{environ}\n\
             {store}/aaa-pkg\t{gcroot}\n\
             {store}/aaa-pkg/bin/prog\t{exe}\n\
             \n",
            store = store.display(),
            environ = pid.join("environ").display(),
            gcroot = gcroot.display(),
            exe = pid.join("exe").display(),
        );
        assert_eq!(response, expected);
    }
}
