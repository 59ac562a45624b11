// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Repository metadata providers

mod github;
mod registry;

pub use github::{GithubClient, GithubCredentials, DEFAULT_GITHUB_API};
pub use registry::{ProviderRegistry, RegistryError};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeRepositoryClient;

use async_trait::async_trait;
use tfg_core::Repository;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum VcsError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl VcsError {
    pub fn is_retryable(&self) -> bool {
        match self {
            VcsError::Transport(_) => true,
            VcsError::Status { status, .. } => *status == 429 || *status >= 500,
            VcsError::InvalidResponse(_) | VcsError::Registry(_) => false,
        }
    }
}

/// Resolves repository metadata (clone URLs) from a VCS provider.
#[async_trait]
pub trait RepositoryClient: Send + Sync + 'static {
    async fn get_repository(&self, owner: &str, name: &str) -> Result<Repository, VcsError>;
}
