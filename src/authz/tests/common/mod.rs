//! Shared fixtures for integration tests

#![allow(dead_code)]

use permit_authz::{InMemoryStore, PermitConfig, PermitEngine};
use std::sync::Arc;

/// Install a `tracing` subscriber once per test binary; honours `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Engine over an empty in-memory store
pub fn engine() -> PermitEngine {
    init_tracing();
    PermitEngine::new(Arc::new(InMemoryStore::new()))
}

/// Engine over an empty in-memory store with a custom configuration
pub fn engine_with(config: PermitConfig) -> PermitEngine {
    init_tracing();
    PermitEngine::with_config(config, Arc::new(InMemoryStore::new()))
        .expect("valid test configuration")
}

/// `user` (profile.view, profile.update) <- `moderator` (content.moderate)
pub async fn moderation_roles(engine: &PermitEngine) {
    engine
        .role()
        .slug("user")
        .permissions(["profile.view", "profile.update"])
        .create()
        .await
        .expect("user role");
    engine
        .role()
        .slug("moderator")
        .inherits("user")
        .permission("content.moderate")
        .create()
        .await
        .expect("moderator role");
}
