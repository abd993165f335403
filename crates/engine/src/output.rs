// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-frame output files.
//!
//! Files are opened, written, and closed per span; the controller keeps no
//! handle cache.

use crate::error::OutputError;
use rfarm_core::Frame;
use std::fs::{self, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Pick and prepare the frame's output file.
///
/// With a base name the file is `<base>.<number>`; otherwise a per-process
/// name under the system temp directory. Creates the file when missing and
/// rejects files that exist but cannot be written. A nonzero-length existing
/// file is rendered from scratch; resuming from already-written pixels is
/// not implemented.
pub fn prepare(frame: &mut Frame, base: Option<&str>) -> Result<(), OutputError> {
    let path = match base {
        Some(base) => PathBuf::from(format!("{base}.{}", frame.number)),
        None => {
            std::env::temp_dir().join(format!("rfarm{}.{}", std::process::id(), frame.number))
        }
    };
    match fs::metadata(&path) {
        Ok(meta) => {
            if meta.permissions().readonly() {
                return Err(OutputError::Unwritable(path));
            }
            if meta.len() > 0 {
                tracing::info!(
                    path = %path.display(),
                    bytes = meta.len(),
                    "output file already has pixels; rendering from scratch"
                );
            }
        }
        Err(_) => {
            fs::File::create(&path).map_err(|source| OutputError::Create {
                path: path.clone(),
                source,
            })?;
        }
    }
    frame.filename = Some(path);
    Ok(())
}

/// Write an RGB span at a pixel offset.
pub fn write_span(path: &Path, offset: u32, rgb: &[u8]) -> Result<(), OutputError> {
    let io_err = |source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut file = OpenOptions::new().write(true).open(path).map_err(io_err)?;
    file.seek(SeekFrom::Start(u64::from(offset) * 3))
        .map_err(io_err)?;
    file.write_all(rgb).map_err(io_err)?;
    Ok(())
}

/// Write-protect a finished frame's file.
pub fn protect(path: &Path) -> Result<(), OutputError> {
    let io_err = |source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    };
    let meta = fs::metadata(path).map_err(io_err)?;
    let mut perms = meta.permissions();
    perms.set_readonly(true);
    fs::set_permissions(path, perms).map_err(io_err)
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
