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

use std::env;

use anyhow::{Context, Result};
use find_roots::cli::Args;
use find_roots::{Config, RootServer};
use log::{Level, info};

fn main() -> Result<()> {
    let config = Config::from(Args::parse_or_exit(env::args_os()));

    // Quiet mode only reports what makes the process exit.
    let log_level = if config.verbose {
        Level::Debug
    } else {
        Level::Error
    };
    simple_logger::init_with_level(log_level)?;
    info!("Store directory: {}", config.store_dir.display());
    info!("State directory: {}", config.state_dir.display());

    let server = RootServer::bind(config).context("Failed to setup Unix socket")?;
    server.serve_forever()
}
