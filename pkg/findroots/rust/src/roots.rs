// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2025-present Datadog, Inc.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Maps a store path to the set of paths that keep it alive.
///
/// Both levels are ordered so that responses are emitted in ascending path
/// order without an extra sort.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Roots(BTreeMap<PathBuf, BTreeSet<PathBuf>>);

impl Roots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, store_path: impl Into<PathBuf>, referrer: impl Into<PathBuf>) {
        self.0
            .entry(store_path.into())
            .or_default()
            .insert(referrer.into());
    }

    pub fn contains(&self, store_path: &Path, referrer: &Path) -> bool {
        self.0
            .get(store_path)
            .is_some_and(|referrers| referrers.contains(referrer))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of store paths.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Every `(store path, referrer)` pair, in ascending order.
    pub fn pairs(&self) -> impl Iterator<Item = (&Path, &Path)> {
        self.0.iter().flat_map(|(store_path, referrers)| {
            referrers
                .iter()
                .map(move |referrer| (store_path.as_path(), referrer.as_path()))
        })
    }

    /// Adds every referrer of `other`, unioning the sets of store paths known
    /// to both.
    pub fn extend(&mut self, other: Roots) {
        for (store_path, referrers) in other.0 {
            self.0.entry(store_path).or_default().extend(referrers);
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TraceResult {
    pub roots: Roots,
    pub dead_links: BTreeSet<PathBuf>,
}

impl TraceResult {
    /// Folds the roots found in live processes into a filesystem trace.
    ///
    /// A store path reached both ways keeps the referrers from both.
    pub fn merge_runtime(&mut self, runtime: Roots) {
        self.roots.extend(runtime);
    }
}
