//! Resolution hooks, decorators and rebound watchers
//!
//! Hooks are stored as `Arc` closures and snapshotted before they run, so a
//! hook is free to register further hooks or resolve other services.

use crate::binding::Binding;
use crate::container::Container;
use crate::injectable::Value;
use crate::storage::new_map;
use ahash::RandomState;
use dashmap::DashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[cfg(feature = "logging")]
use tracing::trace;

/// Hook run while a service resolves; returning `Some` replaces the value.
pub type ResolvingFn = dyn Fn(&Binding, &Value) -> Option<Value> + Send + Sync;

/// Hook run when a cached instance is released.
pub type ReleaseFn = dyn Fn(&Binding, &Value) + Send + Sync;

/// Watcher told about the new value of a rebuilt service.
pub type ReboundFn = dyn Fn(Value) + Send + Sync;

/// Decorator applied to a freshly built instance.
pub type ExtenderFn = dyn Fn(Value, &Container) -> Value + Send + Sync;

#[inline]
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Ordered list of hooks of one kind
pub(crate) struct HookList<F: ?Sized> {
    hooks: Mutex<Vec<Arc<F>>>,
}

impl<F: ?Sized> HookList<F> {
    pub fn new() -> Self {
        Self {
            hooks: Mutex::new(Vec::new()),
        }
    }

    #[inline]
    pub fn push(&self, hook: Arc<F>) {
        lock(&self.hooks).push(hook);
    }

    /// Copy of the current hooks, safe to run without holding the lock
    #[inline]
    pub fn snapshot(&self) -> Vec<Arc<F>> {
        lock(&self.hooks).clone()
    }

    #[inline]
    pub fn clear(&self) {
        lock(&self.hooks).clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        lock(&self.hooks).len()
    }
}

/// Run resolving hooks in order, threading replacements through
pub(crate) fn apply_resolving(hooks: &HookList<ResolvingFn>, binding: &Binding, value: Value) -> Value {
    hooks
        .snapshot()
        .iter()
        .fold(value, |current, hook| hook(binding, &current).unwrap_or(current))
}

/// Hooks that belong to a single binding
pub(crate) struct LocalHooks {
    pub release: HookList<ReleaseFn>,
    pub resolving: HookList<ResolvingFn>,
    pub after_resolving: HookList<ResolvingFn>,
}

impl LocalHooks {
    pub fn new() -> Self {
        Self {
            release: HookList::new(),
            resolving: HookList::new(),
            after_resolving: HookList::new(),
        }
    }
}

/// Container-wide hooks, per-service decorator chains and rebound watchers
pub(crate) struct HookPipeline {
    pub release: HookList<ReleaseFn>,
    pub resolving: HookList<ResolvingFn>,
    pub after_resolving: HookList<ResolvingFn>,
    global_extenders: HookList<ExtenderFn>,
    extenders: DashMap<String, Vec<Arc<ExtenderFn>>, RandomState>,
    rebound: DashMap<String, Vec<Arc<ReboundFn>>, RandomState>,
}

impl HookPipeline {
    pub fn new() -> Self {
        Self {
            release: HookList::new(),
            resolving: HookList::new(),
            after_resolving: HookList::new(),
            global_extenders: HookList::new(),
            extenders: new_map(0),
            rebound: new_map(0),
        }
    }

    // =========================================================================
    // Decoration
    // =========================================================================

    pub fn push_extender(&self, service: &str, extender: Arc<ExtenderFn>) {
        self.extenders
            .entry(service.to_string())
            .or_default()
            .push(extender);
    }

    pub fn push_global_extender(&self, extender: Arc<ExtenderFn>) {
        self.global_extenders.push(extender);
    }

    pub fn clear_extenders(&self, service: &str) -> usize {
        self.extenders
            .remove(service)
            .map(|(_, chain)| chain.len())
            .unwrap_or(0)
    }

    /// Number of decorators registered for `service`
    pub fn extender_count(&self, service: &str) -> usize {
        self.extenders.get(service).map(|c| c.len()).unwrap_or(0)
    }

    /// Apply the decorator chain of `service`, then the global decorators
    pub fn apply_extenders(&self, service: &str, value: Value, container: &Container) -> Value {
        let chain: Vec<Arc<ExtenderFn>> = self
            .extenders
            .get(service)
            .map(|c| c.value().clone())
            .unwrap_or_default();

        #[cfg(feature = "logging")]
        if !chain.is_empty() {
            trace!(
                target: "service_container",
                service = service,
                decorators = chain.len(),
                "Applying decorator chain"
            );
        }

        let value = chain
            .iter()
            .fold(value, |current, extender| extender(current, container));

        self.global_extenders
            .snapshot()
            .iter()
            .fold(value, |current, extender| extender(current, container))
    }

    // =========================================================================
    // Rebound watchers
    // =========================================================================

    pub fn push_rebound(&self, service: &str, watcher: Arc<ReboundFn>) {
        self.rebound
            .entry(service.to_string())
            .or_default()
            .push(watcher);
    }

    pub fn rebound_watchers(&self, service: &str) -> Vec<Arc<ReboundFn>> {
        self.rebound
            .get(service)
            .map(|w| w.value().clone())
            .unwrap_or_default()
    }

    // =========================================================================
    // Reset
    // =========================================================================

    pub fn clear(&self) {
        self.release.clear();
        self.resolving.clear();
        self.after_resolving.clear();
        self.global_extenders.clear();
        self.extenders.clear();
        self.rebound.clear();
    }
}
