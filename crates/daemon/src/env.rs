// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;

use tfg_adapters::{GithubCredentials, DEFAULT_GITHUB_API};

use crate::lifecycle::LifecycleError;

/// Resolve state directory: TFG_STATE_DIR > XDG_STATE_HOME/tfg > ~/.local/state/tfg
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("TFG_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("tfg"));
    }
    let home = std::env::var("HOME").map_err(|_| LifecycleError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/tfg"))
}

/// Basic-auth credentials for the GitHub API and clone URLs.
///
/// Missing variables yield empty strings, which disables authentication.
pub fn github_credentials() -> GithubCredentials {
    GithubCredentials {
        user: std::env::var("TFG_GITHUB_USER").unwrap_or_default(),
        token: std::env::var("TFG_GITHUB_TOKEN").unwrap_or_default(),
    }
}

/// GitHub API base URL override (GitHub Enterprise, tests)
pub fn github_api() -> String {
    std::env::var("TFG_GITHUB_API")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_GITHUB_API.to_string())
}
