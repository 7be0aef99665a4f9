// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2025-present Datadog, Inc.

//! Roots held by running processes, read from the process-information
//! filesystem: executables, working directories, open files, environment
//! blocks and memory mappings.

use std::collections::BTreeSet;
use std::fs::{self, DirEntry};
use std::io::{self, ErrorKind};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use crate::diagnostics::Diagnostics;
use crate::errors::Error;
use crate::roots::Roots;
use crate::scan::{scan_file_content, scan_maps_file};
use crate::store::StoreDir;

/// Kernel settings that may point into the store independently of any
/// process. Mostly relevant on NixOS.
const KERNEL_FILES: &[&str] = &[
    "sys/kernel/modprobe",
    "sys/kernel/fbsplash",
    "sys/kernel/poweroff_cmd",
];

/// Collects the store paths in use by the processes listed under
/// `proc_root`.
///
/// A missing `proc_root` yields no roots. Errors other than a process
/// vanishing or denying access abort the collection.
pub fn get_runtime_roots(
    store: &StoreDir,
    proc_root: &Path,
    diag: &dyn Diagnostics,
) -> Result<Roots, Error> {
    let mut roots = Roots::new();

    let entries = match fs::read_dir(proc_root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(roots),
        Err(source) => {
            return Err(Error::ProcFs {
                path: proc_root.to_path_buf(),
                source,
            });
        }
    };

    for entry in entries {
        let entry = entry.map_err(|source| Error::ProcFs {
            path: proc_root.to_path_buf(),
            source,
        })?;
        if !is_process_dir(&entry) {
            continue;
        }

        let process_dir = entry.path();
        diag.note(format_args!("Considering path {}", process_dir.display()));

        for candidate in open_paths(&process_dir)? {
            match fs::read_link(&candidate) {
                Ok(target) if store.is_in_store(&target) => roots.insert(target, candidate),
                Ok(_) => {}
                Err(e) => diag.note(format_args!(
                    "Error reading the symlink {}: {e}",
                    candidate.display()
                )),
            }
        }

        scan_file_content(store, &process_dir.join("environ"), &mut roots, diag);
        scan_maps_file(store, &process_dir.join("maps"), &mut roots, diag);
    }

    for file in KERNEL_FILES {
        scan_file_content(store, &proc_root.join(file), &mut roots, diag);
    }

    Ok(roots)
}

/// Only the directories whose name is a sequence of digits represent pids.
fn is_process_dir(entry: &DirEntry) -> bool {
    let name = entry.file_name();
    let name = name.as_bytes();

    !name.is_empty()
        && name.iter().all(u8::is_ascii_digit)
        && entry.file_type().is_ok_and(|file_type| file_type.is_dir())
}

/// Paths that may be symlinks into the store: the executable, the working
/// directory and every open file descriptor.
fn open_paths(process_dir: &Path) -> Result<BTreeSet<PathBuf>, Error> {
    let mut paths = BTreeSet::from([process_dir.join("exe"), process_dir.join("cwd")]);

    let fd_dir = process_dir.join("fd");
    let to_error = |source: io::Error| Error::ProcFs {
        path: fd_dir.clone(),
        source,
    };

    let entries = match fs::read_dir(&fd_dir) {
        Ok(entries) => entries,
        Err(e) if is_expected_proc_error(&e) => return Ok(paths),
        Err(e) => return Err(to_error(e)),
    };

    for entry in entries {
        match entry {
            Ok(entry) => {
                paths.insert(entry.path());
            }
            Err(e) if is_expected_proc_error(&e) => break,
            Err(e) => return Err(to_error(e)),
        }
    }

    Ok(paths)
}

/// Processes exit and hide their file descriptors from other users; neither
/// is worth failing the whole collection for.
fn is_expected_proc_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        ErrorKind::NotFound | ErrorKind::PermissionDenied
    )
}
