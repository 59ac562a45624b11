// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::vcs::FakeRepositoryClient;

#[test]
fn register_then_get() {
    let mut registry = ProviderRegistry::new();
    registry
        .register("github", Arc::new(FakeRepositoryClient::new()))
        .unwrap();
    assert!(registry.get("github").is_ok());
    assert_eq!(registry.names(), vec!["github"]);
}

#[test]
fn duplicate_registration_is_an_error() {
    let mut registry = ProviderRegistry::new();
    registry
        .register("github", Arc::new(FakeRepositoryClient::new()))
        .unwrap();
    let err = registry
        .register("github", Arc::new(FakeRepositoryClient::new()))
        .unwrap_err();
    assert_eq!(err, RegistryError::Duplicate("github".to_string()));
}

#[test]
fn unknown_provider_is_not_found() {
    let registry = ProviderRegistry::new();
    let err = registry.get("gitlab").err().unwrap();
    assert_eq!(err, RegistryError::NotFound("gitlab".to_string()));
}

#[tokio::test]
async fn registered_client_resolves() {
    let mut registry = ProviderRegistry::new();
    registry
        .register("github", Arc::new(FakeRepositoryClient::new()))
        .unwrap();
    let repo = registry
        .get("github")
        .unwrap()
        .get_repository("acme", "infra")
        .await
        .unwrap();
    assert_eq!(repo.owner, "acme");
    assert_eq!(repo.name, "infra");
}
