//! Per-user permission cache with TTL and generation-based invalidation

use dashmap::DashMap;
use permit_core::{Permission, Role, UserId};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::config::CacheConfig;

/// Everything the decision procedure needs to know about one user.
///
/// Loaded from the store in a bounded number of round trips and memoized by
/// [`PermissionCache`].
#[derive(Debug, Clone, Default)]
pub struct UserSnapshot {
    /// Slugs of the roles assigned directly to the user
    pub direct_roles: Vec<String>,

    /// Direct roles plus, when hierarchy is enabled, their ancestors
    pub roles: Vec<Role>,

    /// Union of the effective permissions of `roles`, deduplicated by slug
    pub role_permissions: Vec<Permission>,

    /// Direct grants
    pub grants: Vec<Permission>,

    /// Direct denies
    pub denies: Vec<Permission>,
}

impl UserSnapshot {
    pub fn has_role(&self, slug: &str) -> bool {
        self.roles.iter().any(|r| r.slug == slug)
    }

    pub fn is_denied(&self, ability: &str) -> bool {
        self.denies.iter().any(|p| p.slug == ability)
    }

    pub fn is_granted(&self, ability: &str) -> bool {
        self.grants.iter().any(|p| p.slug == ability)
    }

    pub fn role_allows(&self, ability: &str) -> bool {
        self.role_permissions.iter().any(|p| p.slug == ability)
    }

    /// Role permissions plus grants, minus denies, sorted by slug.
    ///
    /// Denies are removed last so they win over every other source.
    pub fn permissions(&self) -> Vec<Permission> {
        let mut merged: BTreeMap<&str, &Permission> = BTreeMap::new();
        for permission in self.role_permissions.iter().chain(&self.grants) {
            merged.entry(permission.slug.as_str()).or_insert(permission);
        }

        let denied: HashSet<&str> = self.denies.iter().map(|p| p.slug.as_str()).collect();
        merged
            .into_iter()
            .filter(|(slug, _)| !denied.contains(slug))
            .map(|(_, permission)| permission.clone())
            .collect()
    }
}

#[derive(Clone)]
struct CachedEntry {
    snapshot: Arc<UserSnapshot>,
    generation: u64,
    cached_at: Instant,
}

impl CachedEntry {
    fn is_stale(&self, generation: u64, config: &CacheConfig) -> bool {
        self.generation != generation || self.cached_at.elapsed() > config.ttl_duration()
    }
}

/// Memoized per-user authorization data.
///
/// Every invalidation bumps a generation counter before clearing the map.
/// Readers record the generation before loading from the store and the
/// entry is tagged with it, so a snapshot computed before an invalidation
/// is never served after it, even if its insert races with the clear.
pub struct PermissionCache {
    entries: DashMap<String, CachedEntry>,
    generation: AtomicU64,
    config: CacheConfig,
    stats: DashMap<&'static str, usize>,
}

impl PermissionCache {
    /// Create a new cache
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            generation: AtomicU64::new(0),
            config,
            stats: DashMap::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Current generation; pass it back to [`put`](Self::put)
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Get a fresh snapshot for a user
    pub fn get(&self, user: &UserId) -> Option<Arc<UserSnapshot>> {
        if !self.config.enabled {
            return None;
        }

        let key = self.key(user);
        let generation = self.generation();

        if let Some(entry) = self.entries.get(&key) {
            if entry.is_stale(generation, &self.config) {
                drop(entry);
                self.entries
                    .remove_if(&key, |_, e| e.is_stale(generation, &self.config));
                self.increment_stat("expirations");
                self.increment_stat("misses");
                return None;
            }

            self.increment_stat("hits");
            return Some(entry.snapshot.clone());
        }

        self.increment_stat("misses");
        None
    }

    /// Store a snapshot computed under `generation`.
    ///
    /// Ignored if an invalidation happened since `generation` was read.
    pub fn put(&self, user: &UserId, generation: u64, snapshot: Arc<UserSnapshot>) {
        if !self.config.enabled || generation != self.generation() {
            return;
        }

        let key = self.key(user);
        if !self.entries.contains_key(&key) && self.entries.len() >= self.config.capacity {
            self.evict();
        }

        self.entries.insert(
            key,
            CachedEntry {
                snapshot,
                generation,
                cached_at: Instant::now(),
            },
        );
    }

    /// Drop every entry
    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.entries.clear();
        self.increment_stat("invalidations");
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.get_stat("hits"),
            misses: self.get_stat("misses"),
            expirations: self.get_stat("expirations"),
            invalidations: self.get_stat("invalidations"),
            entries: self.entries.len(),
            max_entries: self.config.capacity,
        }
    }

    fn key(&self, user: &UserId) -> String {
        format!("{}user:{}", self.config.prefix, user)
    }

    /// Remove stale entries, then up to 10% of the rest if still full
    fn evict(&self) {
        let generation = self.generation();
        self.entries
            .retain(|_, entry| !entry.is_stale(generation, &self.config));

        if self.entries.len() < self.config.capacity {
            return;
        }

        let to_remove = (self.config.capacity / 10).max(1);
        let mut removed = 0;
        self.entries.retain(|_, _| {
            if removed < to_remove {
                removed += 1;
                false
            } else {
                true
            }
        });
    }

    fn increment_stat(&self, key: &'static str) {
        self.stats
            .entry(key)
            .and_modify(|count| *count += 1)
            .or_insert(1);
    }

    fn get_stat(&self, key: &'static str) -> usize {
        self.stats.get(key).map(|v| *v).unwrap_or(0)
    }
}

/// Cache statistics
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub expirations: usize,
    pub invalidations: usize,
    pub entries: usize,
    pub max_entries: usize,
}

impl CacheStats {
    /// Calculate cache hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use permit_core::PermissionId;

    fn permission(slug: &str) -> Permission {
        Permission {
            id: PermissionId::new(),
            slug: slug.to_string(),
            name: slug.to_string(),
            description: None,
            group: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn snapshot() -> Arc<UserSnapshot> {
        Arc::new(UserSnapshot {
            role_permissions: vec![permission("posts.view")],
            ..Default::default()
        })
    }

    #[test]
    fn test_cache_put_get() {
        let cache = PermissionCache::new(CacheConfig::default());
        let alice = UserId::new("alice");

        assert!(cache.get(&alice).is_none());

        cache.put(&alice, cache.generation(), snapshot());
        let cached = cache.get(&alice).unwrap();
        assert!(cached.role_allows("posts.view"));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
    }

    #[test]
    fn test_put_after_invalidation_is_ignored() {
        let cache = PermissionCache::new(CacheConfig::default());
        let alice = UserId::new("alice");

        let generation = cache.generation();
        cache.invalidate();
        cache.put(&alice, generation, snapshot());

        assert!(cache.get(&alice).is_none());
        assert_eq!(cache.stats().entries, 0);
    }

    #[test]
    fn test_invalidate_clears_entries() {
        let cache = PermissionCache::new(CacheConfig::default());
        let alice = UserId::new("alice");

        cache.put(&alice, cache.generation(), snapshot());
        cache.invalidate();
        cache.invalidate();

        assert!(cache.get(&alice).is_none());
        assert_eq!(cache.stats().invalidations, 2);
    }

    #[test]
    fn test_disabled_cache_never_stores() {
        let cache = PermissionCache::new(CacheConfig {
            enabled: false,
            ..Default::default()
        });
        let alice = UserId::new("alice");

        cache.put(&alice, cache.generation(), snapshot());
        assert!(cache.get(&alice).is_none());
        assert_eq!(cache.stats().entries, 0);
    }

    #[test]
    fn test_zero_ttl_expires() {
        let cache = PermissionCache::new(CacheConfig {
            ttl: 0,
            ..Default::default()
        });
        let alice = UserId::new("alice");

        cache.put(&alice, cache.generation(), snapshot());
        std::thread::sleep(std::time::Duration::from_millis(5));

        assert!(cache.get(&alice).is_none());
        assert_eq!(cache.stats().expirations, 1);
    }

    #[test]
    fn test_capacity_eviction() {
        let cache = PermissionCache::new(CacheConfig {
            capacity: 10,
            ..Default::default()
        });

        for i in 0..25u64 {
            cache.put(&UserId::from(i), cache.generation(), snapshot());
        }

        assert!(cache.stats().entries <= 10);
    }

    #[test]
    fn test_replacing_entry_at_capacity_keeps_others() {
        let cache = PermissionCache::new(CacheConfig {
            capacity: 3,
            ..Default::default()
        });
        let users: Vec<UserId> = (0..3u64).map(UserId::from).collect();
        for user in &users {
            cache.put(user, cache.generation(), snapshot());
        }

        cache.put(&users[0], cache.generation(), snapshot());

        assert_eq!(cache.stats().entries, 3);
        for user in &users {
            assert!(cache.get(user).is_some());
        }
    }

    #[test]
    fn test_snapshot_permissions_deny_wins() {
        let snapshot = UserSnapshot {
            role_permissions: vec![permission("a"), permission("b")],
            grants: vec![permission("c"), permission("b")],
            denies: vec![permission("b")],
            ..Default::default()
        };

        let slugs: Vec<String> = snapshot.permissions().into_iter().map(|p| p.slug).collect();
        assert_eq!(slugs, vec!["a", "c"]);
    }
}
