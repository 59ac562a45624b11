// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! GitHub REST repository client

use super::{RepositoryClient, VcsError};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tfg_core::Repository;

pub const DEFAULT_GITHUB_API: &str = "https://api.github.com";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const REDACTED: &str = "<redacted>";

/// Basic-auth credentials used both for the API and embedded in clone URLs.
#[derive(Clone, Default)]
pub struct GithubCredentials {
    pub user: String,
    pub token: String,
}

impl std::fmt::Debug for GithubCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubCredentials")
            .field("user", &self.user)
            .field("token", &REDACTED)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct RepoResponse {
    clone_url: String,
}

#[derive(Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    api_base: String,
    credentials: GithubCredentials,
}

impl GithubClient {
    pub fn new(api_base: impl Into<String>, credentials: GithubCredentials) -> Result<Self, VcsError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("tfgd/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| VcsError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            credentials,
        })
    }

    fn has_credentials(&self) -> bool {
        !self.credentials.user.is_empty() && !self.credentials.token.is_empty()
    }
}

#[async_trait]
impl RepositoryClient for GithubClient {
    async fn get_repository(&self, owner: &str, name: &str) -> Result<Repository, VcsError> {
        let url = format!("{}/repos/{}/{}", self.api_base, owner, name);
        let mut request = self
            .http
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json");
        if self.has_credentials() {
            request = request.basic_auth(&self.credentials.user, Some(&self.credentials.token));
        }

        let response = request
            .send()
            .await
            .map_err(|e| VcsError::Transport(e.without_url().to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| VcsError::Transport(e.without_url().to_string()))?;
        if !status.is_success() {
            return Err(VcsError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: RepoResponse =
            serde_json::from_str(&body).map_err(|e| VcsError::InvalidResponse(e.to_string()))?;
        let (url, sanitized_url) = credentialed_urls(&parsed.clone_url, &self.credentials)?;
        tracing::debug!(owner, name, url = %sanitized_url, "resolved repository");

        Ok(Repository {
            owner: owner.to_string(),
            name: name.to_string(),
            url,
            sanitized_url,
        })
    }
}

/// Embed credentials into an https clone URL.
///
/// Returns the credentialed URL and its sanitized form. Without
/// credentials both are the plain URL. User and token are percent-encoded,
/// so reserved characters in a token never change the host.
pub(crate) fn credentialed_urls(
    clone_url: &str,
    credentials: &GithubCredentials,
) -> Result<(String, String), VcsError> {
    let invalid =
        || VcsError::InvalidResponse(format!("clone_url is not an https url: {}", clone_url));
    let mut url = reqwest::Url::parse(clone_url).map_err(|_| invalid())?;
    if url.scheme() != "https" || !url.has_host() {
        return Err(invalid());
    }
    // Drop any userinfo the provider already put there
    url.set_username("").map_err(|_| invalid())?;
    url.set_password(None).map_err(|_| invalid())?;
    let plain = url.to_string();
    if credentials.user.is_empty() || credentials.token.is_empty() {
        return Ok((plain.clone(), plain));
    }

    url.set_username(&credentials.user).map_err(|_| invalid())?;
    url.set_password(Some(&credentials.token)).map_err(|_| invalid())?;
    let host_and_path = plain.strip_prefix("https://").ok_or_else(invalid)?;
    let sanitized = format!("https://{}:{}@{}", url.username(), REDACTED, host_and_path);
    Ok((url.into(), sanitized))
}

#[cfg(test)]
#[path = "github_tests.rs"]
mod tests;
