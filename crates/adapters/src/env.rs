// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the adapters crate.

fn program(var: &str, default: &str) -> String {
    std::env::var(var)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// git binary (default: `git` on PATH).
pub fn git_program() -> String {
    program("TFG_GIT_BIN", "git")
}

/// terraform binary (default: `terraform` on PATH).
pub fn terraform_program() -> String {
    program("TFG_TERRAFORM_BIN", "terraform")
}
