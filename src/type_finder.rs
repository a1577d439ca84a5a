//! Name to type lookup
//!
//! Used when a binding's concrete is a type named by string, and when an
//! unbound name is made. Types registered with `register_type` are checked
//! first, then finders in ascending priority. Hits are cached per name
//! until the container is flushed.

use crate::factory::TypeDescriptor;
use crate::hooks::lock;
use crate::storage::new_map;
use ahash::RandomState;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

#[cfg(feature = "logging")]
use tracing::trace;

/// Finder mapping a textual type name to a descriptor
pub type TypeFinder = Arc<dyn Fn(&str) -> Option<TypeDescriptor> + Send + Sync>;

struct RankedFinder {
    priority: i32,
    order: u64,
    finder: TypeFinder,
}

pub(crate) struct TypeNameResolver {
    registered: DashMap<String, TypeDescriptor, RandomState>,
    finders: Mutex<Vec<RankedFinder>>,
    next_order: AtomicU64,
    cache: DashMap<String, TypeDescriptor, RandomState>,
}

impl TypeNameResolver {
    pub fn new() -> Self {
        Self {
            registered: new_map(0),
            finders: Mutex::new(Vec::new()),
            next_order: AtomicU64::new(0),
            cache: new_map(0),
        }
    }

    /// Make `descriptor` findable under its service name
    pub fn register(&self, descriptor: TypeDescriptor) {
        self.cache.remove(descriptor.service());
        self.registered
            .insert(descriptor.service().to_string(), descriptor);
    }

    /// Add a finder; lower priorities run first, equal priorities in
    /// registration order
    pub fn add_finder(&self, finder: TypeFinder, priority: i32) {
        let order = self.next_order.fetch_add(1, Ordering::Relaxed);
        let mut finders = lock(&self.finders);
        finders.push(RankedFinder {
            priority,
            order,
            finder,
        });
        finders.sort_by_key(|f| (f.priority, f.order));
    }

    pub fn find(&self, name: &str) -> Option<TypeDescriptor> {
        if name.is_empty() {
            return None;
        }
        if let Some(descriptor) = self.registered.get(name) {
            return Some(descriptor.value().clone());
        }
        if let Some(descriptor) = self.cache.get(name) {
            return Some(descriptor.value().clone());
        }

        let finders: Vec<TypeFinder> = lock(&self.finders)
            .iter()
            .map(|f| Arc::clone(&f.finder))
            .collect();

        let found = finders.iter().find_map(|finder| finder(name))?;

        #[cfg(feature = "logging")]
        trace!(
            target: "service_container",
            name = name,
            type_name = found.type_name(),
            "Type located by finder"
        );

        self.cache.insert(name.to_string(), found.clone());
        Some(found)
    }

    /// Look `name` up without recording a finder hit in the cache
    pub fn peek(&self, name: &str) -> Option<TypeDescriptor> {
        if name.is_empty() {
            return None;
        }
        if let Some(descriptor) = self.registered.get(name) {
            return Some(descriptor.value().clone());
        }
        if let Some(descriptor) = self.cache.get(name) {
            return Some(descriptor.value().clone());
        }

        let finders: Vec<TypeFinder> = lock(&self.finders)
            .iter()
            .map(|f| Arc::clone(&f.finder))
            .collect();
        finders.iter().find_map(|finder| finder(name))
    }

    pub fn clear(&self) {
        self.registered.clear();
        lock(&self.finders).clear();
        self.cache.clear();
    }
}
