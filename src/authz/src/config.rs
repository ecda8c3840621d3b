//! Engine configuration
//!
//! Recognised options and their environment overrides:
//!
//! | Option | Env | Default |
//! |--------|-----|---------|
//! | `super_admin_role` | `PERMIT_SUPER_ADMIN_ROLE` | `super-admin` |
//! | `role_hierarchy` | `PERMIT_ROLE_HIERARCHY` | `true` |
//! | `cache.enabled` | `PERMIT_CACHE_ENABLED` | `true` |
//! | `cache.ttl` (seconds) | `PERMIT_CACHE_TTL` | `3600` |
//! | `cache.prefix` | `PERMIT_CACHE_PREFIX` | `permit:` |
//! | `cache.capacity` | `PERMIT_CACHE_CAPACITY` | `10000` |

use crate::error::{AuthzError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Permission cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Memoize per-user authorization data
    pub enabled: bool,

    /// Time-to-live in seconds
    pub ttl: u64,

    /// Key prefix for cache entries
    pub prefix: String,

    /// Maximum number of cached users
    pub capacity: usize,
}

impl CacheConfig {
    /// TTL as a [`Duration`]
    pub fn ttl_duration(&self) -> Duration {
        Duration::from_secs(self.ttl)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: 3600,
            prefix: "permit:".to_string(),
            capacity: 10_000,
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermitConfig {
    /// Role whose holders bypass every check
    pub super_admin_role: String,

    /// Include ancestor roles' permissions in effective permission sets
    pub role_hierarchy: bool,

    /// Permission cache settings
    pub cache: CacheConfig,
}

impl Default for PermitConfig {
    fn default() -> Self {
        Self {
            super_admin_role: "super-admin".to_string(),
            role_hierarchy: true,
            cache: CacheConfig::default(),
        }
    }
}

impl PermitConfig {
    /// Defaults overridden by `PERMIT_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by values from `lookup`
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(role) = lookup("PERMIT_SUPER_ADMIN_ROLE") {
            config.super_admin_role = role;
        }
        if let Some(hierarchy) = parse_var(&lookup, "PERMIT_ROLE_HIERARCHY")? {
            config.role_hierarchy = hierarchy;
        }
        if let Some(enabled) = parse_var(&lookup, "PERMIT_CACHE_ENABLED")? {
            config.cache.enabled = enabled;
        }
        if let Some(ttl) = parse_var(&lookup, "PERMIT_CACHE_TTL")? {
            config.cache.ttl = ttl;
        }
        if let Some(prefix) = lookup("PERMIT_CACHE_PREFIX") {
            config.cache.prefix = prefix;
        }
        if let Some(capacity) = parse_var(&lookup, "PERMIT_CACHE_CAPACITY")? {
            config.cache.capacity = capacity;
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON configuration document; absent fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration is usable
    pub fn validate(&self) -> Result<()> {
        if self.super_admin_role.trim().is_empty() {
            return Err(AuthzError::Configuration(
                "super_admin_role cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| AuthzError::Configuration(format!("invalid value for {}: '{}'", key, raw))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = PermitConfig::default();
        assert_eq!(config.super_admin_role, "super-admin");
        assert!(config.role_hierarchy);
        assert!(config.cache.enabled);
        assert_eq!(config.cache.ttl_duration(), Duration::from_secs(3600));
        assert_eq!(config.cache.prefix, "permit:");
    }

    #[test]
    fn test_lookup_overrides() {
        let config = PermitConfig::from_lookup(lookup_from(&[
            ("PERMIT_SUPER_ADMIN_ROLE", "root"),
            ("PERMIT_ROLE_HIERARCHY", "false"),
            ("PERMIT_CACHE_TTL", "60"),
        ]))
        .unwrap();

        assert_eq!(config.super_admin_role, "root");
        assert!(!config.role_hierarchy);
        assert_eq!(config.cache.ttl, 60);
        assert!(config.cache.enabled);
    }

    #[test]
    fn test_invalid_env_value() {
        let err = PermitConfig::from_lookup(lookup_from(&[("PERMIT_CACHE_ENABLED", "maybe")]))
            .unwrap_err();
        assert!(matches!(err, AuthzError::Configuration(_)));
    }

    #[test]
    fn test_json_partial_document() {
        let config = PermitConfig::from_json(r#"{"cache": {"enabled": false}}"#).unwrap();
        assert!(!config.cache.enabled);
        assert_eq!(config.cache.ttl, 3600);
        assert_eq!(config.super_admin_role, "super-admin");

        assert!(PermitConfig::from_json(r#"{"super_admin_role": " "}"#).is_err());
    }
}
