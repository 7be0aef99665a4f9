// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2025-present Datadog, Inc.

//! Recognition of store paths, both as filesystem paths and as substrings of
//! arbitrary file content.

use std::ffi::OsStr;
use std::fmt::Write;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use regex::bytes::Regex;

use crate::errors::Error;

/// Characters allowed in a store object name after the leading alphanumeric
/// run.
const NAME_PATTERN: &str = r"[0-9a-zA-Z]+[0-9a-zA-Z+\-._?=]*";

/// Returns true if `path` lies under `store_dir`.
///
/// The comparison is done on path components, so `/nix/store2/x` is not in
/// `/nix/store`.
pub fn is_in_store(store_dir: &Path, path: &Path) -> bool {
    path.starts_with(store_dir)
}

#[derive(Debug, Clone)]
pub struct StoreDir {
    dir: PathBuf,
    pattern: Regex,
}

impl StoreDir {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, Error> {
        // Collecting the components drops trailing slashes and `.` segments,
        // which would otherwise end up in the pattern.
        let dir: PathBuf = dir.as_ref().components().collect();
        let pattern = format!("{}/{NAME_PATTERN}", escape_bytes(dir.as_os_str()));
        let pattern = Regex::new(&pattern).map_err(|source| Error::InvalidStoreDir {
            store_dir: dir.clone(),
            source,
        })?;

        Ok(Self { dir, pattern })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn is_in_store(&self, path: &Path) -> bool {
        is_in_store(&self.dir, path)
    }

    /// Path of the store entry that would carry the same name as `file_name`.
    pub fn candidate_for(&self, file_name: &OsStr) -> PathBuf {
        self.dir.join(file_name)
    }

    /// Iterates over every substring of `content` that looks like a store
    /// path. Content does not need to be valid UTF-8.
    pub fn find_store_paths<'a>(&'a self, content: &'a [u8]) -> impl Iterator<Item = &'a Path> {
        self.pattern
            .find_iter(content)
            .map(|m| Path::new(OsStr::from_bytes(m.as_bytes())))
    }
}

/// Escapes a raw path for inclusion in a byte regex. ASCII goes through
/// `regex::escape`, anything else is matched byte for byte.
fn escape_bytes(raw: &OsStr) -> String {
    let mut escaped = String::new();
    for &byte in raw.as_bytes() {
        if byte.is_ascii() {
            escaped.push_str(&regex::escape(char::from(byte).encode_utf8(&mut [0; 4])));
        } else {
            let _ = write!(escaped, r"(?-u:\x{byte:02X})");
        }
    }
    escaped
}
