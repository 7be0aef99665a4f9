// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2025-present Datadog, Inc.

//! Line format sent to the garbage collector:
//!
//! ```text
//! <store path>\t<referrer>\n     one line per (root, referrer)
//! \n                             section separator
//! <dead link>\n                  one line per dead link, until EOF
//! ```
//!
//! Paths are written as raw bytes. TAB and NEWLINE are the only bytes that
//! would break the framing, so they never reach the wire unescaped.

use std::borrow::Cow;
use std::ffi::OsStr;
use std::io::{self, BufRead, Write};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use log::warn;

use crate::roots::TraceResult;

const FIELD_SEPARATOR: u8 = b'\t';
const LINE_SEPARATOR: u8 = b'\n';
const REPLACEMENT: u8 = b'?';

fn has_separator(bytes: &[u8]) -> bool {
    bytes
        .iter()
        .any(|&b| b == FIELD_SEPARATOR || b == LINE_SEPARATOR)
}

/// Replaces framing bytes in a root line field. Store object names never
/// contain them, so the object a path designates survives the replacement.
fn escape_field(path: &Path) -> Cow<'_, [u8]> {
    let bytes = path.as_os_str().as_bytes();
    if !has_separator(bytes) {
        return Cow::Borrowed(bytes);
    }

    warn!("Escaping framing bytes in {:?}", path.display());
    Cow::Owned(
        bytes
            .iter()
            .map(|&b| match b {
                FIELD_SEPARATOR | LINE_SEPARATOR => REPLACEMENT,
                b => b,
            })
            .collect(),
    )
}

/// Serializes `trace` to `writer`.
///
/// Dead links containing framing bytes are dropped, since they are
/// candidates for deletion which must never be guessed at.
pub fn write_trace<W: Write>(writer: &mut W, trace: &TraceResult) -> io::Result<()> {
    for (store_path, referrer) in trace.roots.pairs() {
        writer.write_all(&escape_field(store_path))?;
        writer.write_all(&[FIELD_SEPARATOR])?;
        writer.write_all(&escape_field(referrer))?;
        writer.write_all(&[LINE_SEPARATOR])?;
    }

    writer.write_all(&[LINE_SEPARATOR])?;

    for dead_link in &trace.dead_links {
        let bytes = dead_link.as_os_str().as_bytes();
        if has_separator(bytes) {
            warn!("Dropping malformed dead link {:?}", dead_link.display());
            continue;
        }

        writer.write_all(bytes)?;
        writer.write_all(&[LINE_SEPARATOR])?;
    }

    writer.flush()
}

/// Parses a response produced by [`write_trace`].
pub fn read_trace<R: BufRead>(reader: R) -> io::Result<TraceResult> {
    let mut trace = TraceResult::default();
    let mut in_roots = true;

    for line in reader.split(LINE_SEPARATOR) {
        let line = line?;

        if in_roots {
            if line.is_empty() {
                in_roots = false;
                continue;
            }

            let Some(tab) = line.iter().position(|&b| b == FIELD_SEPARATOR) else {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!(
                        "root line without a referrer: {}",
                        String::from_utf8_lossy(&line)
                    ),
                ));
            };
            let (store_path, referrer) = line.split_at(tab);
            trace
                .roots
                .insert(to_path(store_path), to_path(referrer.get(1..).unwrap_or_default()));
        } else if !line.is_empty() {
            trace.dead_links.insert(to_path(&line));
        }
    }

    if in_roots {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "response ended before the dead links section",
        ));
    }

    Ok(trace)
}

fn to_path(bytes: &[u8]) -> PathBuf {
    PathBuf::from(OsStr::from_bytes(bytes))
}
