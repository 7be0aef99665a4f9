// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2025-present Datadog, Inc.

//! Filesystem side of the root discovery.
//!
//! Starting from a set of roots, the traversal:
//! - walks directories, without any depth limit,
//! - follows symbolic links, at most [`MAX_SYMLINK_HOPS`] times in a row,
//! - looks at the name of regular files: when encountering `/foo/bar/abcdef`
//!   it checks whether `<store>/abcdef` exists.
//!
//! Links that cannot be resolved are collected as dead links so that the
//! caller can decide whether to clean them up.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use normalize_path::NormalizePath;
use walkdir::WalkDir;

use crate::diagnostics::Diagnostics;
use crate::roots::{Roots, TraceResult};
use crate::store::StoreDir;

/// Number of symlinks followed in a row before giving up on a chain.
pub const MAX_SYMLINK_HOPS: u32 = 2;

#[derive(Debug)]
struct Pending {
    path: PathBuf,
    hops_left: u32,
    /// First link of the symlink chain that led to `path`, if any.
    origin: Option<PathBuf>,
}

/// Traces `roots` with the default symlink budget.
pub fn follow_paths_to_store<I, P>(store: &StoreDir, roots: I, diag: &dyn Diagnostics) -> TraceResult
where
    I: IntoIterator<Item = P>,
    P: Into<PathBuf>,
{
    follow_paths_with_budget(store, roots, MAX_SYMLINK_HOPS, diag)
}

pub fn follow_paths_with_budget<I, P>(
    store: &StoreDir,
    roots: I,
    max_hops: u32,
    diag: &dyn Diagnostics,
) -> TraceResult
where
    I: IntoIterator<Item = P>,
    P: Into<PathBuf>,
{
    let mut result = TraceResult::default();
    let mut pending: Vec<Pending> = roots
        .into_iter()
        .map(|path| Pending {
            path: path.into(),
            hops_left: max_hops,
            origin: None,
        })
        .collect();

    while let Some(item) = pending.pop() {
        diag.note(format_args!("Considering file {}", item.path.display()));

        let file_type = match fs::symlink_metadata(&item.path) {
            Ok(metadata) => metadata.file_type(),
            Err(e) => {
                diag.note(format_args!(
                    "Error accessing the file {}: {e}",
                    item.path.display()
                ));
                continue;
            }
        };

        if file_type.is_dir() {
            visit_directory(store, &item, &mut pending, &mut result, diag);
        } else if file_type.is_symlink() {
            follow_symlink(store, item, &mut pending, &mut result, diag);
        } else if file_type.is_file() {
            check_file_name(store, &item.path, &mut result.roots, diag);
        }
    }

    result
}

fn visit_directory(
    store: &StoreDir,
    dir: &Pending,
    pending: &mut Vec<Pending>,
    result: &mut TraceResult,
    diag: &dyn Diagnostics,
) {
    let walker = WalkDir::new(&dir.path)
        .min_depth(1)
        .follow_links(false)
        .follow_root_links(false);

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                diag.note(format_args!(
                    "Error walking the directory {}: {e}",
                    dir.path.display()
                ));
                continue;
            }
        };
        diag.note(format_args!("Considering file {}", entry.path().display()));

        let file_type = entry.file_type();
        if file_type.is_symlink() {
            // Every link met in the walk starts a chain of its own.
            let link = Pending {
                path: entry.into_path(),
                hops_left: dir.hops_left,
                origin: None,
            };
            follow_symlink(store, link, pending, result, diag);
        } else if file_type.is_file() {
            check_file_name(store, entry.path(), &mut result.roots, diag);
        }
    }
}

fn follow_symlink(
    store: &StoreDir,
    link: Pending,
    pending: &mut Vec<Pending>,
    result: &mut TraceResult,
    diag: &dyn Diagnostics,
) {
    if link.hops_left == 0 {
        diag.note(format_args!(
            "Not following {}: too many levels of symbolic links",
            link.path.display()
        ));
        return;
    }

    let target = match fs::read_link(&link.path) {
        Ok(target) => target,
        Err(e) => {
            diag.note(format_args!(
                "Error reading the symlink {}: {e}",
                link.path.display()
            ));
            return;
        }
    };
    let resolved = resolve_link_target(&link.path, &target)
        .and_then(|resolved| fs::symlink_metadata(&resolved).map(|_| resolved));
    let origin = link.origin.unwrap_or(link.path);

    let target = match resolved {
        Ok(target) => target,
        Err(e) => {
            diag.note(format_args!(
                "Error accessing the file {}: {e}",
                target.display()
            ));
            diag.note(format_args!(
                "(When resolving the symlink {})",
                origin.display()
            ));
            result.dead_links.insert(origin);
            return;
        }
    };

    if store.is_in_store(&target) {
        result.roots.insert(target, origin);
        return;
    }

    pending.push(Pending {
        path: target,
        hops_left: link.hops_left - 1,
        origin: Some(origin),
    });
}

/// Regular files whose name matches a store entry are treated as references
/// to that entry. This catches copies of store objects laid out as roots.
fn check_file_name(store: &StoreDir, file: &Path, roots: &mut Roots, diag: &dyn Diagnostics) {
    let Some(name) = file.file_name() else {
        return;
    };

    let candidate = store.candidate_for(name);
    match candidate.try_exists() {
        Ok(true) => roots.insert(candidate, file),
        Ok(false) => {}
        Err(e) => diag.note(format_args!(
            "Error accessing the file {}: {e}",
            candidate.display()
        )),
    }
}

/// Resolves a link target relative to the directory holding the link.
///
/// Everything up to the last `..` component goes through the kernel, since
/// `..` after a symlinked directory leads wherever that directory really
/// lives. The remainder only needs its `.` components removed. The final
/// component is never resolved, so a link into the store is still seen as
/// one.
fn resolve_link_target(link: &Path, target: &Path) -> io::Result<PathBuf> {
    let base = link.parent().unwrap_or_else(|| Path::new("/"));
    let joined = base.join(target);

    let components: Vec<Component<'_>> = joined.components().collect();
    let Some(last_parent) = components
        .iter()
        .rposition(|component| matches!(component, Component::ParentDir))
    else {
        return Ok(joined.normalize());
    };

    let (prefix, rest) = components.split_at(last_parent + 1);
    let prefix = fs::canonicalize(prefix.iter().collect::<PathBuf>())?;
    Ok(prefix.join(rest.iter().collect::<PathBuf>()).normalize())
}
