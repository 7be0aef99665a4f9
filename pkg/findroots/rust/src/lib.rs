// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2025-present Datadog, Inc.

// Correctness
#![deny(clippy::indexing_slicing)]
#![deny(clippy::string_slice)]
#![deny(clippy::cast_possible_wrap)]
#![deny(clippy::undocumented_unsafe_blocks)]
// Panicking code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::unimplemented)]
#![deny(clippy::todo)]
// Debug code that shouldn't be in production
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]

pub mod cli;
pub mod config;
pub mod diagnostics;
mod errors;
pub mod protocol;
pub mod roots;
pub mod runtime;
pub mod scan;
pub mod server;
pub mod store;
pub mod traverse;

// Re-export the public API
pub use config::Config;
pub use diagnostics::{Diagnostics, LogDiagnostics, RecordedDiagnostics};
pub use errors::Error;
pub use roots::{Roots, TraceResult};
pub use runtime::get_runtime_roots;
pub use server::RootServer;
pub use store::{StoreDir, is_in_store};
pub use traverse::{MAX_SYMLINK_HOPS, follow_paths_to_store};
