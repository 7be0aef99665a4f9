// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2025-present Datadog, Inc.

//! Per-path diagnostics emitted while tracing roots.
//!
//! The traversal and the scanners never write to the global logger on their
//! own. They receive a `&dyn Diagnostics` and report through it, which keeps
//! them testable without capturing stderr.

use std::cell::RefCell;
use std::fmt;

use log::debug;

pub trait Diagnostics {
    /// Records a verbose-level message about a single path.
    fn note(&self, args: fmt::Arguments<'_>);
}

/// Forwards notes to the `log` facade when verbose output was requested.
#[derive(Debug, Clone, Copy)]
pub struct LogDiagnostics {
    verbose: bool,
}

impl LogDiagnostics {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl Diagnostics for LogDiagnostics {
    fn note(&self, args: fmt::Arguments<'_>) {
        if self.verbose {
            debug!("{args}");
        }
    }
}

/// Keeps every note in memory.
#[derive(Debug, Default)]
pub struct RecordedDiagnostics {
    notes: RefCell<Vec<String>>,
}

impl RecordedDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notes(&self) -> Vec<String> {
        self.notes.borrow().clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.notes.borrow().iter().any(|note| note.contains(needle))
    }
}

impl Diagnostics for RecordedDiagnostics {
    fn note(&self, args: fmt::Arguments<'_>) {
        self.notes.borrow_mut().push(args.to_string());
    }
}
