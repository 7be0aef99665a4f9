// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2025-present Datadog, Inc.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid store directory {}: {source}", .store_dir.display())]
    InvalidStoreDir {
        store_dir: PathBuf,
        #[source]
        source: regex::Error,
    },

    #[error("could not enumerate {}: {source}", .path.display())]
    ProcFs {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
