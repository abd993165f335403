// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine error types.

use std::path::PathBuf;
use thiserror::Error;

/// Failures preparing, writing, or finalizing a frame's output file.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("output file {0} exists but is not writable")]
    Unwritable(PathBuf),

    #[error("cannot create {path}: {source}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}
