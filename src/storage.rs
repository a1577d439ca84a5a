//! Registry storage for the container
//!
//! Holds the alias, binding, instance and tag tables. Uses DashMap for
//! lock-free concurrent access. None of these methods call back into user
//! code, so no map guard is ever held across a hook or factory.

use crate::binding::Binding;
use crate::injectable::{value_addr, Value};
use ahash::RandomState;
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use std::sync::atomic::{AtomicU64, Ordering};

/// Shard count for an expected number of services.
///
/// Default DashMap uses num_cpus * 4 shards which is overkill for
/// typical containers with <50 services.
#[inline]
fn shard_amount(capacity: usize) -> usize {
    if capacity <= 16 {
        8
    } else if capacity <= 64 {
        16
    } else {
        32
    }
}

#[inline]
pub(crate) fn new_map<K, V>(capacity: usize) -> DashMap<K, V, RandomState>
where
    K: Eq + std::hash::Hash,
{
    DashMap::with_capacity_and_hasher_and_shard_amount(
        capacity,
        RandomState::new(),
        shard_amount(capacity),
    )
}

/// A cached service instance and the order it was stored in
#[derive(Clone)]
pub(crate) struct CachedInstance {
    pub value: Value,
    pub sequence: u64,
}

/// Alias, binding, instance and tag tables of one container.
pub(crate) struct Registry {
    /// Canonical name -> binding record
    binds: DashMap<String, Binding, RandomState>,
    /// Canonical name -> cached instance
    instances: DashMap<String, CachedInstance, RandomState>,
    /// Instance address -> canonical name it is cached under
    owners: DashMap<usize, String, RandomState>,
    /// Alias -> canonical name
    aliases: DashMap<String, String, RandomState>,
    /// Canonical name -> aliases pointing at it
    aliases_reverse: DashMap<String, Vec<String>, RandomState>,
    /// Tag -> ordered member names
    tags: DashMap<String, Vec<String>, RandomState>,
    /// Names that completed at least one build, kept across unbind
    resolved: DashSet<String, RandomState>,
    /// Monotonic counter stamping instance insertion order
    sequence: AtomicU64,
}

impl Registry {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            binds: new_map(capacity),
            instances: new_map(capacity),
            owners: new_map(capacity),
            aliases: new_map(0),
            aliases_reverse: new_map(0),
            tags: new_map(0),
            resolved: DashSet::with_capacity_and_hasher(capacity, RandomState::new()),
            sequence: AtomicU64::new(0),
        }
    }

    // =========================================================================
    // Aliases
    // =========================================================================

    /// Map an alias to its canonical service name (identity for non-aliases)
    #[inline]
    pub fn alias_to_service(&self, name: &str) -> String {
        self.aliases
            .get(name)
            .map(|target| target.value().clone())
            .unwrap_or_else(|| name.to_string())
    }

    #[inline]
    pub fn is_alias(&self, name: &str) -> bool {
        self.aliases.contains_key(name)
    }

    /// Point `alias` at `service`, detaching it from a previous target.
    ///
    /// Returns the previous target if the alias was re-pointed.
    pub fn set_alias(&self, alias: &str, service: &str) -> Option<String> {
        let previous = self.aliases.insert(alias.to_string(), service.to_string());

        if let Some(old) = previous.as_deref() {
            if let Some(mut list) = self.aliases_reverse.get_mut(old) {
                list.retain(|a| a != alias);
            }
        }

        let mut list = self.aliases_reverse.entry(service.to_string()).or_default();
        if !list.iter().any(|a| a == alias) {
            list.push(alias.to_string());
        }

        previous.filter(|old| old != service)
    }

    /// Remove every alias pointing at `service`
    pub fn remove_aliases_of(&self, service: &str) -> Vec<String> {
        let removed = self
            .aliases_reverse
            .remove(service)
            .map(|(_, list)| list)
            .unwrap_or_default();

        for alias in &removed {
            self.aliases.remove(alias);
        }

        removed
    }

    // =========================================================================
    // Bindings
    // =========================================================================

    /// Insert a binding unless one already exists under `name`
    pub fn try_insert_bind(&self, name: &str, binding: Binding) -> Result<(), Binding> {
        match self.binds.entry(name.to_string()) {
            Entry::Occupied(existing) => Err(existing.get().clone()),
            Entry::Vacant(slot) => {
                slot.insert(binding);
                Ok(())
            }
        }
    }

    #[inline]
    pub fn get_bind(&self, service: &str) -> Option<Binding> {
        self.binds.get(service).map(|b| b.value().clone())
    }

    #[inline]
    pub fn has_bind(&self, service: &str) -> bool {
        self.binds.contains_key(service)
    }

    #[inline]
    pub fn remove_bind(&self, service: &str) -> Option<Binding> {
        self.binds.remove(service).map(|(_, b)| b)
    }

    /// Number of bindings
    #[inline]
    pub fn bind_count(&self) -> usize {
        self.binds.len()
    }

    // =========================================================================
    // Instances
    // =========================================================================

    #[inline]
    pub fn has_instance(&self, service: &str) -> bool {
        self.instances.contains_key(service)
    }

    #[inline]
    pub fn get_instance(&self, service: &str) -> Option<Value> {
        self.instances.get(service).map(|c| c.value.clone())
    }

    /// Service name an instance is already cached under
    #[inline]
    pub fn instance_owner(&self, value: &Value) -> Option<String> {
        self.owners.get(&value_addr(value)).map(|s| s.value().clone())
    }

    /// Cache a new instance, stamping it with the next insertion sequence
    pub fn insert_instance(&self, service: &str, value: Value) -> u64 {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let addr = value_addr(&value);
        if let Some(old) = self
            .instances
            .insert(service.to_string(), CachedInstance { value, sequence })
        {
            self.forget_owner(service, &old.value);
        }
        self.owners.insert(addr, service.to_string());
        sequence
    }

    /// Swap the cached value of `service` in place, keeping its sequence
    pub fn replace_instance(&self, service: &str, value: Value) -> bool {
        let old = match self.instances.get_mut(service) {
            Some(mut cached) => std::mem::replace(&mut cached.value, value.clone()),
            None => return false,
        };
        self.forget_owner(service, &old);
        self.owners.insert(value_addr(&value), service.to_string());
        true
    }

    /// Remove and return the cached instance of `service`
    pub fn take_instance(&self, service: &str) -> Option<Value> {
        let (_, cached) = self.instances.remove(service)?;
        self.forget_owner(service, &cached.value);
        Some(cached.value)
    }

    fn forget_owner(&self, service: &str, value: &Value) {
        self.owners
            .remove_if(&value_addr(value), |_, owner| owner == service);
    }

    /// Cached service names, most recently stored first
    pub fn release_order(&self) -> Vec<String> {
        let mut entries: Vec<(u64, String)> = self
            .instances
            .iter()
            .map(|e| (e.value().sequence, e.key().clone()))
            .collect();
        entries.sort_by(|a, b| b.0.cmp(&a.0));
        entries.into_iter().map(|(_, name)| name).collect()
    }

    /// Number of cached instances
    #[inline]
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    // =========================================================================
    // Resolved markers
    // =========================================================================

    #[inline]
    pub fn mark_resolved(&self, service: &str) {
        if !self.resolved.contains(service) {
            self.resolved.insert(service.to_string());
        }
    }

    #[inline]
    pub fn was_resolved(&self, service: &str) -> bool {
        self.resolved.contains(service)
    }

    // =========================================================================
    // Tags
    // =========================================================================

    pub fn push_tag(&self, tag: &str, services: &[&str]) {
        let mut members = self.tags.entry(tag.to_string()).or_default();
        members.extend(services.iter().map(|s| s.to_string()));
    }

    #[inline]
    pub fn tag_members(&self, tag: &str) -> Option<Vec<String>> {
        self.tags.get(tag).map(|m| m.value().clone())
    }

    /// Drop `service` and its aliases from every tag
    pub fn remove_from_tags(&self, service: &str, aliases: &[String]) {
        for mut members in self.tags.iter_mut() {
            members.retain(|m| m != service && !aliases.contains(m));
        }
    }

    // =========================================================================
    // Reset
    // =========================================================================

    /// Empty every table, returning the bindings that were dropped
    pub fn clear(&self) -> Vec<Binding> {
        let bindings: Vec<Binding> = self.binds.iter().map(|b| b.value().clone()).collect();
        self.binds.clear();
        self.instances.clear();
        self.owners.clear();
        self.aliases.clear();
        self.aliases_reverse.clear();
        self.tags.clear();
        self.resolved.clear();
        self.sequence.store(0, Ordering::Relaxed);
        bindings
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("binds", &self.binds.len())
            .field("instances", &self.instances.len())
            .field("aliases", &self.aliases.len())
            .field("tags", &self.tags.len())
            .finish()
    }
}
