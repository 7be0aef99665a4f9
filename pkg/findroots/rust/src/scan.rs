// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2025-present Datadog, Inc.

//! Scanners looking for store paths inside file contents.
//!
//! Both scanners are total: the files they read live in `/proc` and can
//! disappear at any time, so a missing or unreadable file only produces a
//! diagnostic and no roots.

use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, ErrorKind, Read};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use crate::diagnostics::Diagnostics;
use crate::roots::Roots;
use crate::store::StoreDir;

const MAPS_READ_LIMIT: u64 = 4 * 1024 * 1024 * 1024; // 4GiB

/// Number of fields preceding the pathname in a `/proc/<pid>/maps` line:
/// address, perms, offset, dev, inode.
const MAPS_FIELDS_BEFORE_PATH: usize = 5;

/// Records every store path mentioned anywhere in `file`, with `file` as the
/// referrer.
pub fn scan_file_content(
    store: &StoreDir,
    file: &Path,
    roots: &mut Roots,
    diag: &dyn Diagnostics,
) {
    let content = match fs::read(file) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return,
        Err(e) => {
            diag.note(format_args!("Error reading {}: {e}", file.display()));
            return;
        }
    };

    for store_path in store.find_store_paths(&content) {
        roots.insert(store_path, file);
    }
}

/// Records the store paths mapped in memory according to a
/// `/proc/<pid>/maps` listing.
pub fn scan_maps_file(
    store: &StoreDir,
    maps_file: &Path,
    roots: &mut Roots,
    diag: &dyn Diagnostics,
) {
    let file = match File::open(maps_file) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return,
        Err(e) => {
            diag.note(format_args!("Error opening {}: {e}", maps_file.display()));
            return;
        }
    };

    let reader = BufReader::new(file.take(MAPS_READ_LIMIT));
    for line in reader.split(b'\n') {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                // Keep what was read so far, the process most likely exited.
                diag.note(format_args!("Error reading {}: {e}", maps_file.display()));
                break;
            }
        };

        if let Some(path) = parse_maps_line(&line)
            && store.is_in_store(path)
        {
            roots.insert(path, maps_file);
        }
    }
}

/// Extracts the pathname of a maps line.
///
/// Returns `None` for anonymous mappings, pseudo-paths such as `[heap]`, and
/// lines that do not have exactly five fields followed by an absolute path.
pub fn parse_maps_line(line: &[u8]) -> Option<&Path> {
    let mut fields = line
        .split(|b| b.is_ascii_whitespace())
        .filter(|field| !field.is_empty());

    for _ in 0..MAPS_FIELDS_BEFORE_PATH {
        fields.next()?;
    }

    let path = fields.next()?;
    if !path.starts_with(b"/") || fields.next().is_some() {
        return None;
    }

    Some(Path::new(OsStr::from_bytes(path)))
}
