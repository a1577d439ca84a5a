//! Binding records
//!
//! A [`Binding`] is a cheap handle to the record `bind` created. Through it
//! callers attach contextual needs, aliases, tags and per-binding hooks.
//! Every mutation fails once the binding was unbound.

use crate::container::{Container, Inner};
use crate::error::{ContainerError, Result};
use crate::factory::Concrete;
use crate::hooks::{lock, LocalHooks};
use crate::injectable::{service_name_of, value, Injectable, Value};
use crate::storage::new_map;
use ahash::RandomState;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

#[cfg(feature = "logging")]
use tracing::debug;

/// What a contextual need resolves to
#[derive(Clone)]
pub(crate) enum Given {
    /// A fixed value
    Value(Value),
    /// Called on every build
    Factory(Arc<dyn Fn() -> Value + Send + Sync>),
    /// Made from the container on every build
    Service(String),
}

pub(crate) struct BindingRecord {
    name: String,
    concrete: Concrete,
    is_static: bool,
    needs: DashMap<String, Given, RandomState>,
    tags: Mutex<Vec<String>>,
    aliases: Mutex<Vec<String>>,
    hooks: LocalHooks,
    resolved: AtomicBool,
    unbound: AtomicBool,
    container: Weak<Inner>,
}

/// Handle to a registered binding.
///
/// Clones share the same record; two handles compare equal when they point
/// at the same record.
///
/// # Examples
///
/// ```rust
/// use service_container::{Concrete, Container};
///
/// let container = Container::new();
/// let binding = container
///     .singleton("greeting", Concrete::factory(|_, _| Ok(String::from("hello"))))
///     .unwrap();
///
/// binding.alias("hello").unwrap();
/// assert_eq!(binding.aliases(), vec!["hello".to_string()]);
/// ```
#[derive(Clone)]
pub struct Binding {
    record: Arc<BindingRecord>,
}

impl Binding {
    pub(crate) fn new(name: &str, concrete: Concrete, is_static: bool, container: Weak<Inner>) -> Self {
        Self {
            record: Arc::new(BindingRecord {
                name: name.to_string(),
                concrete,
                is_static,
                needs: new_map(0),
                tags: Mutex::new(Vec::new()),
                aliases: Mutex::new(Vec::new()),
                hooks: LocalHooks::new(),
                resolved: AtomicBool::new(false),
                unbound: AtomicBool::new(false),
                container,
            }),
        }
    }

    /// A record not registered in any container, used for unbound type builds
    pub(crate) fn detached(name: &str, concrete: Concrete, is_static: bool) -> Self {
        Self::new(name, concrete, is_static, Weak::new())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Canonical service name
    #[inline]
    pub fn name(&self) -> &str {
        &self.record.name
    }

    #[inline]
    pub fn concrete(&self) -> &Concrete {
        &self.record.concrete
    }

    /// True for singleton bindings
    #[inline]
    pub fn is_static(&self) -> bool {
        self.record.is_static
    }

    /// True once the binding produced a value
    #[inline]
    pub fn is_resolved(&self) -> bool {
        self.record.resolved.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_unbound(&self) -> bool {
        self.record.unbound.load(Ordering::Acquire)
    }

    /// Tags this binding was added to through [`Binding::tag`] or `Container::tag`
    pub fn tags(&self) -> Vec<String> {
        lock(&self.record.tags).clone()
    }

    /// Aliases currently pointing at this binding
    pub fn aliases(&self) -> Vec<String> {
        lock(&self.record.aliases).clone()
    }

    /// True if a contextual need is registered for `need`
    pub fn has_need(&self, need: &str) -> bool {
        self.record.needs.contains_key(need)
    }

    // =========================================================================
    // Contextual needs
    // =========================================================================

    /// Start a contextual override.
    ///
    /// `need` is either `$param` for a parameter name or the service name of
    /// a parameter type.
    ///
    /// ```rust
    /// use service_container::{Concrete, Container};
    ///
    /// let container = Container::new();
    /// let binding = container
    ///     .bind("mailer", Concrete::factory(|_, _| Ok(())), false)
    ///     .unwrap();
    /// binding.needs("$port").given_value(2525u16).unwrap();
    /// assert!(binding.has_need("$port"));
    /// ```
    pub fn needs(&self, need: &str) -> GivenBuilder {
        GivenBuilder {
            binding: self.clone(),
            need: need.to_string(),
        }
    }

    /// Contextual override keyed by the service name of `T`
    pub fn needs_type<T: ?Sized + 'static>(&self) -> GivenBuilder {
        self.needs(&service_name_of::<T>())
    }

    fn add_need(&self, need: String, given: Given) -> Result<Self> {
        self.ensure_live()?;
        if need.is_empty() {
            return Err(ContainerError::ArgumentNull("needs"));
        }

        #[cfg(feature = "logging")]
        debug!(
            target: "service_container",
            service = self.name(),
            need = %need,
            "Registering contextual need"
        );

        self.record.needs.insert(need, given);
        Ok(self.clone())
    }

    pub(crate) fn given_for(&self, need: &str) -> Option<Given> {
        self.record.needs.get(need).map(|g| g.value().clone())
    }

    // =========================================================================
    // Registration through the owning container
    // =========================================================================

    /// Alias this binding as `alias`
    pub fn alias(&self, alias: &str) -> Result<Self> {
        self.ensure_live()?;
        self.container()?.alias(alias, self.name())?;
        Ok(self.clone())
    }

    /// Add this binding to `tag`
    pub fn tag(&self, tag: &str) -> Result<Self> {
        self.ensure_live()?;
        self.container()?.tag(tag, &[self.name()])?;
        Ok(self.clone())
    }

    /// Remove this binding from its container
    pub fn unbind(&self) -> Result<()> {
        match self.record.container.upgrade() {
            Some(inner) => Container::from_inner(inner).unbind(self.name()),
            None => {
                self.mark_unbound();
                Ok(())
            }
        }
    }

    // =========================================================================
    // Local hooks
    // =========================================================================

    /// Called when this binding's cached instance is released
    pub fn on_release<F>(&self, hook: F) -> Result<Self>
    where
        F: Fn(&Binding, &Value) + Send + Sync + 'static,
    {
        self.ensure_live()?;
        self.record.hooks.release.push(Arc::new(hook));
        Ok(self.clone())
    }

    /// Called after every build, before the global resolving hooks.
    /// Returning `Some` replaces the value.
    pub fn on_resolving<F>(&self, hook: F) -> Result<Self>
    where
        F: Fn(&Binding, &Value) -> Option<Value> + Send + Sync + 'static,
    {
        self.ensure_live()?;
        self.record.hooks.resolving.push(Arc::new(hook));
        Ok(self.clone())
    }

    /// Called after all resolving hooks ran
    pub fn on_after_resolving<F>(&self, hook: F) -> Result<Self>
    where
        F: Fn(&Binding, &Value) -> Option<Value> + Send + Sync + 'static,
    {
        self.ensure_live()?;
        self.record.hooks.after_resolving.push(Arc::new(hook));
        Ok(self.clone())
    }

    // =========================================================================
    // Internal state
    // =========================================================================

    #[inline]
    pub(crate) fn hooks(&self) -> &LocalHooks {
        &self.record.hooks
    }

    pub(crate) fn mark_resolved(&self) {
        self.record.resolved.store(true, Ordering::Release);
    }

    pub(crate) fn mark_unbound(&self) {
        self.record.unbound.store(true, Ordering::Release);
    }

    pub(crate) fn record_alias(&self, alias: &str) {
        let mut aliases = lock(&self.record.aliases);
        if !aliases.iter().any(|a| a == alias) {
            aliases.push(alias.to_string());
        }
    }

    pub(crate) fn forget_alias(&self, alias: &str) {
        lock(&self.record.aliases).retain(|a| a != alias);
    }

    pub(crate) fn record_tag(&self, tag: &str) {
        let mut tags = lock(&self.record.tags);
        if !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }

    fn ensure_live(&self) -> Result<()> {
        if self.is_unbound() {
            return Err(ContainerError::logic(format!(
                "Service [{}] was unbound, its binding can not be modified",
                self.name()
            )));
        }
        if let Some(inner) = self.record.container.upgrade() {
            if Container::from_inner(inner).is_flushing() {
                return Err(ContainerError::flushing());
            }
        }
        Ok(())
    }

    fn container(&self) -> Result<Container> {
        self.record
            .container
            .upgrade()
            .map(Container::from_inner)
            .ok_or_else(|| {
                ContainerError::logic(format!(
                    "Service [{}] is not attached to a live container",
                    self.name()
                ))
            })
    }
}

impl PartialEq for Binding {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.record, &other.record)
    }
}

impl Eq for Binding {}

impl std::fmt::Debug for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("name", &self.record.name)
            .field("concrete", &self.record.concrete)
            .field("is_static", &self.record.is_static)
            .field("needs", &self.record.needs.len())
            .field("unbound", &self.is_unbound())
            .finish()
    }
}

/// Second half of `binding.needs(..).given*(..)`
#[must_use = "a need is only registered once `given`, `given_fn` or `given_value` is called"]
pub struct GivenBuilder {
    binding: Binding,
    need: String,
}

impl GivenBuilder {
    /// Make `service` from the container whenever the need is resolved
    pub fn given(self, service: &str) -> Result<Binding> {
        if service.is_empty() {
            return Err(ContainerError::ArgumentNull("service"));
        }
        self.binding
            .add_need(self.need, Given::Service(service.to_string()))
    }

    /// Call `factory` whenever the need is resolved
    pub fn given_fn<T, F>(self, factory: F) -> Result<Binding>
    where
        T: Injectable,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.binding
            .add_need(self.need, Given::Factory(Arc::new(move || value(factory()))))
    }

    /// Share `instance` whenever the need is resolved
    pub fn given_value<T: Injectable>(self, instance: T) -> Result<Binding> {
        self.binding.add_need(self.need, Given::Value(value(instance)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_needs_are_recorded() {
        let binding = Binding::detached("foo", Concrete::named("foo"), false);
        binding.needs("$boo").given_fn(|| String::from("300")).unwrap();
        binding.needs("$bar").given("bar").unwrap();
        binding.needs_type::<u32>().given_value(7u32).unwrap();

        assert!(matches!(binding.given_for("$boo"), Some(Given::Factory(_))));
        assert!(matches!(binding.given_for("$bar"), Some(Given::Service(ref s)) if s == "bar"));
        assert!(matches!(binding.given_for("u32"), Some(Given::Value(_))));
        assert!(binding.given_for("$missing").is_none());
    }

    #[test]
    fn test_empty_need_rejected() {
        let binding = Binding::detached("foo", Concrete::named("foo"), false);
        assert!(matches!(
            binding.needs("").given_value(1u8),
            Err(ContainerError::ArgumentNull("needs"))
        ));
        assert!(matches!(
            binding.needs("$x").given(""),
            Err(ContainerError::ArgumentNull("service"))
        ));
    }

    #[test]
    fn test_unbound_binding_rejects_mutation() {
        let binding = Binding::detached("foo", Concrete::named("foo"), true);
        binding.unbind().unwrap();
        assert!(binding.is_unbound());
        assert!(binding.on_release(|_, _| {}).unwrap_err().is_logic());
        assert!(binding.needs("$x").given_value(1u8).unwrap_err().is_logic());
    }

    #[test]
    fn test_detached_binding_has_no_container() {
        let binding = Binding::detached("foo", Concrete::named("foo"), false);
        assert!(binding.alias("bar").unwrap_err().is_logic());
    }

    #[test]
    fn test_identity_equality() {
        let a = Binding::detached("foo", Concrete::named("foo"), false);
        let b = a.clone();
        let c = Binding::detached("foo", Concrete::named("foo"), false);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
