// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup rc-file: registration commands executed before the loop starts.

use std::path::PathBuf;

/// File name searched in the current and home directories.
const RC_NAME: &str = ".rfarmrc";
/// System-wide fallback.
const SYSTEM_RC: &str = "/usr/local/etc/rfarmrc";

/// First rc file found: current directory, then home, then the system path.
pub fn find() -> Option<PathBuf> {
    let cwd = PathBuf::from(RC_NAME);
    if cwd.exists() {
        return Some(cwd);
    }
    if let Some(home) = dirs::home_dir() {
        let path = home.join(RC_NAME);
        if path.exists() {
            return Some(path);
        }
    }
    let system = PathBuf::from(SYSTEM_RC);
    if system.exists() {
        return Some(system);
    }
    None
}
