//! The runtime service container
//!
//! A [`Container`] binds service names to construction strategies, resolves
//! object graphs on demand and notifies watchers when a resolved service is
//! rebuilt. Handles are cheap to clone and share one registry.

use crate::binding::Binding;
use crate::build_stack::BuildGuard;
use crate::error::{ContainerError, Result};
use crate::factory::{Concrete, Constructible, TypeDescriptor};
use crate::hooks::{apply_resolving, ExtenderFn, HookPipeline};
use crate::injectable::{service_name_of, value, Injectable, Value};
use crate::method::{Callable, MethodTable};
use crate::params::{check_user_params, Argument, ParamsResolver};
use crate::storage::Registry;
use crate::type_finder::TypeNameResolver;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::{debug, trace};

static NEXT_CONTAINER_ID: AtomicU64 = AtomicU64::new(1);

/// Characters that may not appear in a bound service name
const RESERVED_CHARS: [char; 3] = ['$', '@', ':'];

/// Container settings.
///
/// ```rust
/// use service_container::{Container, ContainerConfig};
///
/// let container = Container::with_config(
///     ContainerConfig::default()
///         .with_capacity(64)
///         .with_max_user_params(16),
/// );
/// assert!(container.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct ContainerConfig {
    /// Expected number of services, used to size the registries
    pub capacity: usize,
    /// Most positional plus named arguments a single call may pass
    pub max_user_params: usize,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            capacity: 0,
            max_user_params: 255,
        }
    }
}

impl ContainerConfig {
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_max_user_params(mut self, max: usize) -> Self {
        self.max_user_params = max;
        self
    }
}

pub(crate) struct Inner {
    id: u64,
    config: ContainerConfig,
    registry: Registry,
    hooks: HookPipeline,
    types: TypeNameResolver,
    methods: MethodTable,
    flushing: AtomicBool,
}

/// Runtime service container.
///
/// # Examples
///
/// ```rust
/// use service_container::{Concrete, Container};
///
/// let container = Container::new();
/// container
///     .singleton("config.url", Concrete::factory(|_, _| Ok(String::from("postgres://localhost"))))
///     .unwrap();
///
/// let url = container.make_as::<String>("config.url").unwrap();
/// assert_eq!(*url, "postgres://localhost");
/// ```
#[derive(Clone)]
pub struct Container {
    inner: Arc<Inner>,
}

impl Container {
    /// Create an empty container.
    #[inline]
    pub fn new() -> Self {
        Self::with_config(ContainerConfig::default())
    }

    /// Create a container sized for about `capacity` services.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_config(ContainerConfig::default().with_capacity(capacity))
    }

    pub fn with_config(config: ContainerConfig) -> Self {
        let id = NEXT_CONTAINER_ID.fetch_add(1, Ordering::Relaxed);

        #[cfg(feature = "logging")]
        debug!(
            target: "service_container",
            container = id,
            capacity = config.capacity,
            max_user_params = config.max_user_params,
            "Creating service container"
        );

        Self {
            inner: Arc::new(Inner {
                id,
                registry: Registry::with_capacity(config.capacity),
                config,
                hooks: HookPipeline::new(),
                types: TypeNameResolver::new(),
                methods: MethodTable::new(),
                flushing: AtomicBool::new(false),
            }),
        }
    }

    #[inline]
    pub(crate) fn from_inner(inner: Arc<Inner>) -> Self {
        Self { inner }
    }

    #[inline]
    pub(crate) fn is_flushing(&self) -> bool {
        self.inner.flushing.load(Ordering::Acquire)
    }

    #[inline]
    fn guard_flushing(&self) -> Result<()> {
        if self.is_flushing() {
            return Err(ContainerError::flushing());
        }
        Ok(())
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Bind `name` to `concrete`.
    ///
    /// Fails with a Logic error when the name is empty or contains `$`, `@`
    /// or `:`, or when it is already bound, instanced or used as an alias.
    /// Binding a name that was resolved before notifies its rebound watchers.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use service_container::{Concrete, Container};
    /// use std::sync::Arc;
    ///
    /// let container = Container::new();
    /// container.bind("ids", Concrete::factory(|_, _| Ok(vec![1u32, 2, 3])), false).unwrap();
    ///
    /// let a = container.make("ids").unwrap();
    /// let b = container.make("ids").unwrap();
    /// assert!(!Arc::ptr_eq(&a, &b));
    /// ```
    pub fn bind(
        &self,
        name: &str,
        concrete: impl Into<Concrete>,
        is_static: bool,
    ) -> Result<Binding> {
        self.guard_flushing()?;
        validate_service_name(name)?;

        let registry = &self.inner.registry;
        if registry.is_alias(name) {
            return Err(ContainerError::logic(format!(
                "Service [{name}] is already used as an alias"
            )));
        }
        if registry.has_instance(name) {
            return Err(ContainerError::logic(format!(
                "Instance [{name}] already exists, it can not be bound"
            )));
        }

        let concrete = concrete.into();

        #[cfg(feature = "logging")]
        debug!(
            target: "service_container",
            service = name,
            concrete = ?concrete,
            lifetime = if is_static { "singleton" } else { "transient" },
            "Binding service"
        );

        let binding = Binding::new(name, concrete, is_static, Arc::downgrade(&self.inner));
        registry
            .try_insert_bind(name, binding.clone())
            .map_err(|_| ContainerError::logic(format!("Bind [{name}] already exists")))?;

        if registry.was_resolved(name) {
            if let Err(err) = self.trigger_rebound(name, None) {
                // a failed rebuild leaves nothing registered
                registry.remove_bind(name);
                registry.take_instance(name);
                binding.mark_unbound();
                return Err(err);
            }
        }

        Ok(binding)
    }

    /// Bind a service that is built once and cached until released
    #[inline]
    pub fn singleton(&self, name: &str, concrete: impl Into<Concrete>) -> Result<Binding> {
        self.bind(name, concrete, true)
    }

    /// Bind unless `name` is already bound.
    ///
    /// Returns `false` and the existing binding when it is.
    pub fn bind_if(
        &self,
        name: &str,
        concrete: impl Into<Concrete>,
        is_static: bool,
    ) -> Result<(bool, Binding)> {
        if let Some(existing) = self.get_bind(name) {
            return Ok((false, existing));
        }
        self.bind(name, concrete, is_static).map(|b| (true, b))
    }

    #[inline]
    pub fn singleton_if(
        &self,
        name: &str,
        concrete: impl Into<Concrete>,
    ) -> Result<(bool, Binding)> {
        self.bind_if(name, concrete, true)
    }

    /// Store an already built instance under `name`.
    ///
    /// The value runs through the decorators and resolving hooks of `name`
    /// first. A previous instance is released; watchers are notified when
    /// the name was resolved before. The same value can not be stored under
    /// two different names.
    ///
    /// ```rust
    /// use service_container::{value, Container};
    ///
    /// let container = Container::new();
    /// container.instance("app.name", value(String::from("demo"))).unwrap();
    /// assert!(container.has_instance("app.name"));
    /// ```
    pub fn instance(&self, name: &str, instance: Value) -> Result<Value> {
        self.guard_flushing()?;
        if name.is_empty() {
            return Err(ContainerError::ArgumentNull("service"));
        }

        let registry = &self.inner.registry;
        let service = registry.alias_to_service(name);

        let binding = match registry.get_bind(&service) {
            Some(binding) if !binding.is_static() => {
                return Err(ContainerError::logic(format!(
                    "Service [{service}] is not a singleton binding, an instance can not be stored"
                )));
            }
            Some(binding) => binding,
            None => Binding::detached(&service, Concrete::named(service.as_str()), true),
        };

        let instance = self.inner.hooks.apply_extenders(&service, instance, self);
        let instance = apply_resolving(&binding.hooks().resolving, &binding, instance);
        let instance = apply_resolving(&self.inner.hooks.resolving, &binding, instance);

        if let Some(owner) = registry.instance_owner(&instance) {
            if owner != service {
                return Err(ContainerError::logic(format!(
                    "The instance has been bound to service [{owner}]"
                )));
            }
        }

        let previously_resolved = self.is_resolved(&service);
        self.release(&service);
        let sequence = registry.insert_instance(&service, instance.clone());

        #[cfg(feature = "logging")]
        debug!(
            target: "service_container",
            service = %service,
            sequence = sequence,
            "Storing service instance"
        );
        #[cfg(not(feature = "logging"))]
        let _ = sequence;

        if previously_resolved {
            self.trigger_rebound(&service, Some(instance.clone()))?;
        }

        Ok(instance)
    }

    /// Make `alias` resolve to `service`.
    ///
    /// Re-aliasing an existing alias moves it to the new target.
    pub fn alias(&self, alias: &str, service: &str) -> Result<()> {
        self.guard_flushing()?;
        if alias.is_empty() {
            return Err(ContainerError::ArgumentNull("alias"));
        }
        if service.is_empty() {
            return Err(ContainerError::ArgumentNull("service"));
        }
        if alias == service {
            return Err(ContainerError::logic(format!(
                "Alias is same as service name: [{alias}]"
            )));
        }

        let registry = &self.inner.registry;
        if registry.has_bind(alias) || registry.has_instance(alias) {
            return Err(ContainerError::logic(format!(
                "Alias [{alias}] is already a bound or instanced service"
            )));
        }

        let service = registry.alias_to_service(service);
        if service == alias {
            return Err(ContainerError::logic(format!(
                "Alias [{alias}] would point at itself"
            )));
        }
        if !registry.has_bind(&service) && !registry.has_instance(&service) {
            return Err(ContainerError::logic(format!(
                "Service [{service}] must be bound or instanced before it can be aliased"
            )));
        }

        if let Some(previous) = registry.set_alias(alias, &service) {
            if let Some(old) = registry.get_bind(&previous) {
                old.forget_alias(alias);
            }
        }
        if let Some(binding) = registry.get_bind(&service) {
            binding.record_alias(alias);
        }

        #[cfg(feature = "logging")]
        debug!(
            target: "service_container",
            alias = alias,
            service = %service,
            "Registering alias"
        );

        Ok(())
    }

    /// True if `name` is an alias
    #[inline]
    pub fn is_alias(&self, name: &str) -> bool {
        self.inner.registry.is_alias(name)
    }

    /// Add `services` to `tag`; repeated calls accumulate
    pub fn tag(&self, tag: &str, services: &[&str]) -> Result<()> {
        self.guard_flushing()?;
        if tag.is_empty() {
            return Err(ContainerError::ArgumentNull("tag"));
        }

        self.inner.registry.push_tag(tag, services);
        for service in services {
            if let Some(binding) = self.get_bind(service) {
                binding.record_tag(tag);
            }
        }

        #[cfg(feature = "logging")]
        debug!(
            target: "service_container",
            tag = tag,
            services = ?services,
            "Tagging services"
        );

        Ok(())
    }

    /// Make every member of `tag`, in tagging order.
    ///
    /// ```rust
    /// use service_container::{Concrete, Container};
    ///
    /// let container = Container::new();
    /// container.bind("a", Concrete::factory(|_, _| Ok('a')), false).unwrap();
    /// container.bind("b", Concrete::factory(|_, _| Ok('b')), false).unwrap();
    /// container.tag("letters", &["a", "b"]).unwrap();
    ///
    /// let letters: Vec<char> = container
    ///     .tagged("letters")
    ///     .unwrap()
    ///     .iter()
    ///     .map(|v| *v.downcast_ref::<char>().unwrap())
    ///     .collect();
    /// assert_eq!(letters, vec!['a', 'b']);
    /// assert!(container.tagged("missing").is_err());
    /// ```
    pub fn tagged(&self, tag: &str) -> Result<Vec<Value>> {
        let members = self
            .inner
            .registry
            .tag_members(tag)
            .ok_or_else(|| ContainerError::logic(format!("Tag [{tag}] does not exist")))?;

        members.iter().map(|service| self.make(service)).collect()
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// Resolve `name` without arguments
    #[inline]
    pub fn make(&self, name: &str) -> Result<Value> {
        self.make_with(name, &[])
    }

    /// Resolve `name`, passing `args` to its factory or constructor.
    ///
    /// A cached instance is returned as is; `args` are ignored then.
    pub fn make_with(&self, name: &str, args: &[Argument]) -> Result<Value> {
        if name.is_empty() {
            return Err(ContainerError::unresolvable("Service name can not be empty"));
        }
        check_user_params(args, self.inner.config.max_user_params)?;

        let service = self.inner.registry.alias_to_service(name);
        if let Some(cached) = self.inner.registry.get_instance(&service) {
            #[cfg(feature = "logging")]
            trace!(
                target: "service_container",
                service = %service,
                location = "instance",
                "Service resolved from cache"
            );
            return Ok(cached);
        }

        self.resolve(&service, args)
    }

    /// Resolve `name` and downcast it to `T`
    pub fn make_as<T: Injectable>(&self, name: &str) -> Result<Arc<T>> {
        self.make(name)?.downcast::<T>().map_err(|_| {
            ContainerError::unresolvable(format!(
                "Service [{name}] is not a {}",
                std::any::type_name::<T>()
            ))
        })
    }

    /// Resolve `T` under its own service name.
    ///
    /// ```rust
    /// use service_container::{value, Container, Injectable};
    ///
    /// #[derive(Debug, PartialEq)]
    /// struct Port(u16);
    ///
    /// let container = Container::new();
    /// container.instance(&Port::service_name(), value(Port(8080))).unwrap();
    /// assert_eq!(*container.get::<Port>().unwrap(), Port(8080));
    /// ```
    #[inline]
    pub fn get<T: Injectable>(&self) -> Result<Arc<T>> {
        self.make_as::<T>(&T::service_name())
    }

    /// A reusable closure that makes `name` on every call
    pub fn factory(&self, name: &str) -> impl Fn() -> Result<Value> + Send + Sync + 'static {
        let container = self.clone();
        let name = name.to_string();
        move || container.make(&name)
    }

    /// Run `callable` with its parameters resolved from `args` and the container
    pub fn call(&self, callable: &Callable, args: &[Argument]) -> Result<Value> {
        check_user_params(args, self.inner.config.max_user_params)?;

        let owner = callable.owner().and_then(|service| self.get_bind(service));
        let resolver = ParamsResolver::new(self, owner.as_ref(), callable.name());
        let resolved = resolver.resolve(callable.parameters(), args)?;

        #[cfg(feature = "logging")]
        trace!(
            target: "service_container",
            callable = callable.name(),
            parameters = resolved.len(),
            "Calling with injected parameters"
        );

        callable
            .invoke(resolved)
            .map_err(|err| ContainerError::from_user(callable.name(), err))
    }

    /// Register `callable` under `name` for [`Container::invoke`]
    pub fn bind_method(&self, name: &str, callable: Callable) -> Result<()> {
        self.guard_flushing()?;
        if name.is_empty() {
            return Err(ContainerError::ArgumentNull("method"));
        }
        self.inner
            .methods
            .insert(name, callable)
            .map_err(|_| ContainerError::logic(format!("Method [{name}] is already bound")))?;

        #[cfg(feature = "logging")]
        debug!(target: "service_container", method = name, "Binding method");

        Ok(())
    }

    /// Call the method registered as `name`
    pub fn invoke(&self, name: &str, args: &[Argument]) -> Result<Value> {
        let callable = self
            .inner
            .methods
            .get(name)
            .ok_or_else(|| ContainerError::unresolvable(format!("Method [{name}] is not found")))?;
        self.call(&callable, args)
    }

    /// Remove the method registered as `name`
    pub fn unbind_method(&self, name: &str) -> bool {
        self.inner.methods.remove(name)
    }

    fn resolve(&self, service: &str, args: &[Argument]) -> Result<Value> {
        let registry = &self.inner.registry;
        let binding = match registry.get_bind(service) {
            Some(binding) => binding,
            None => {
                let descriptor = self
                    .inner
                    .types
                    .find(service)
                    .ok_or_else(|| ContainerError::not_found(service))?;
                Binding::detached(service, Concrete::Type(descriptor), false)
            }
        };

        #[cfg(feature = "logging")]
        trace!(
            target: "service_container",
            service = service,
            concrete = ?binding.concrete(),
            "Building service"
        );

        let built = {
            let _guard = BuildGuard::push(self.inner.id, service)?;
            self.build(&binding, args)?
        };

        let hooks = &self.inner.hooks;
        let built = hooks.apply_extenders(service, built, self);
        let built = apply_resolving(&binding.hooks().resolving, &binding, built);
        let built = apply_resolving(&hooks.resolving, &binding, built);
        let built = apply_resolving(&binding.hooks().after_resolving, &binding, built);
        let built = apply_resolving(&hooks.after_resolving, &binding, built);

        let previously_resolved = registry.was_resolved(service);
        registry.mark_resolved(service);
        binding.mark_resolved();

        if binding.is_static() {
            registry.insert_instance(service, built.clone());
            if previously_resolved {
                self.trigger_rebound(service, Some(built.clone()))?;
            }
        }

        Ok(built)
    }

    fn build(&self, binding: &Binding, args: &[Argument]) -> Result<Value> {
        match binding.concrete() {
            Concrete::Factory(factory) => factory(self, args)
                .map_err(|err| ContainerError::from_user(binding.name(), err)),
            Concrete::Type(descriptor) => self.construct(binding, descriptor, args),
            Concrete::Named(type_name) => {
                let descriptor = self.inner.types.find(type_name).ok_or_else(|| {
                    ContainerError::unresolvable(format!(
                        "Type [{type_name}] of service [{}] can not be found",
                        binding.name()
                    ))
                })?;
                self.construct(binding, &descriptor, args)
            }
        }
    }

    /// Try constructors from the most parameters down until one resolves
    fn construct(
        &self,
        binding: &Binding,
        descriptor: &TypeDescriptor,
        args: &[Argument],
    ) -> Result<Value> {
        if descriptor.is_abstract() {
            return Err(ContainerError::unresolvable(format!(
                "Target [{}] of service [{}] is not instantiable",
                descriptor.type_name(),
                binding.name()
            )));
        }

        let resolver = ParamsResolver::new(self, Some(binding), binding.name());
        let mut last_error = None;

        for constructor in descriptor.constructors_by_arity() {
            match resolver.resolve(constructor.parameters(), args) {
                Ok(resolved) => {
                    return constructor
                        .invoke(resolved)
                        .map_err(|err| ContainerError::from_user(binding.name(), err));
                }
                Err(err) if err.is_unresolvable() => last_error = Some(err),
                Err(err) => return Err(err),
            }
        }

        Err(last_error.unwrap_or_else(|| ContainerError::not_found(binding.name())))
    }

    /// Tell the watchers of `service` about a new value.
    ///
    /// Without a value the service is made first. A static binding with
    /// nothing cached notifies from its own caching step instead; watchers
    /// of a non-static binding each get a fresh instance.
    fn trigger_rebound(&self, service: &str, instance: Option<Value>) -> Result<()> {
        let watchers = self.inner.hooks.rebound_watchers(service);
        if watchers.is_empty() {
            return Ok(());
        }

        let is_static = self
            .inner
            .registry
            .get_bind(service)
            .map(|b| b.is_static())
            .unwrap_or(true);

        let mut current = match instance {
            Some(v) => v,
            None if is_static && !self.inner.registry.has_instance(service) => {
                self.make(service)?;
                return Ok(());
            }
            None => self.make(service)?,
        };

        #[cfg(feature = "logging")]
        debug!(
            target: "service_container",
            service = service,
            watchers = watchers.len(),
            "Notifying rebound watchers"
        );

        for (index, watcher) in watchers.iter().enumerate() {
            watcher(current.clone());
            if index + 1 < watchers.len() && !is_static {
                current = self.make(service)?;
            }
        }

        Ok(())
    }

    // =========================================================================
    // Decoration
    // =========================================================================

    /// Append a decorator to the chain of `name`.
    ///
    /// Allowed before `name` is bound. A cached instance is decorated right
    /// away and watchers receive the decorated value.
    ///
    /// ```rust
    /// use service_container::{value, Concrete, Container};
    ///
    /// let container = Container::new();
    /// container.singleton("foo", Concrete::factory(|_, _| Ok(String::from("foo")))).unwrap();
    /// container
    ///     .extend("foo", |v, _| {
    ///         let s = v.downcast_ref::<String>().cloned().unwrap_or_default();
    ///         value(s + "bar")
    ///     })
    ///     .unwrap();
    ///
    /// assert_eq!(*container.make_as::<String>("foo").unwrap(), "foobar");
    /// ```
    pub fn extend<F>(&self, name: &str, decorator: F) -> Result<()>
    where
        F: Fn(Value, &Container) -> Value + Send + Sync + 'static,
    {
        self.guard_flushing()?;
        if name.is_empty() {
            return Err(ContainerError::ArgumentNull("service"));
        }

        let service = self.inner.registry.alias_to_service(name);
        let decorator: Arc<ExtenderFn> = Arc::new(decorator);
        self.inner
            .hooks
            .push_extender(&service, Arc::clone(&decorator));

        #[cfg(feature = "logging")]
        debug!(
            target: "service_container",
            service = %service,
            chain = self.inner.hooks.extender_count(&service),
            "Registering decorator"
        );

        if let Some(current) = self.inner.registry.get_instance(&service) {
            let decorated = decorator(current, self);
            self.inner
                .registry
                .replace_instance(&service, decorated.clone());
            self.trigger_rebound(&service, Some(decorated))?;
        } else if self.is_resolved(&service) {
            self.trigger_rebound(&service, None)?;
        }

        Ok(())
    }

    /// Typed decorator; values of other types pass through untouched
    pub fn extend_as<T, F>(&self, name: &str, decorator: F) -> Result<()>
    where
        T: Injectable,
        F: Fn(Arc<T>, &Container) -> T + Send + Sync + 'static,
    {
        self.extend(name, move |instance, container| {
            match instance.downcast::<T>() {
                Ok(typed) => value(decorator(typed, container)),
                Err(original) => original,
            }
        })
    }

    /// Decorator applied to every service built after registration
    pub fn extend_all<F>(&self, decorator: F) -> Result<()>
    where
        F: Fn(Value, &Container) -> Value + Send + Sync + 'static,
    {
        self.guard_flushing()?;
        self.inner.hooks.push_global_extender(Arc::new(decorator));
        Ok(())
    }

    /// Drop the decorator chain of `name`; cached values keep their decoration.
    /// Returns how many decorators were removed.
    pub fn clear_extenders(&self, name: &str) -> usize {
        let service = self.inner.registry.alias_to_service(name);
        self.inner.hooks.clear_extenders(&service)
    }

    // =========================================================================
    // Hooks
    // =========================================================================

    /// Hook run after every build, after the binding's own resolving hooks
    pub fn on_resolving<F>(&self, hook: F) -> Result<()>
    where
        F: Fn(&Binding, &Value) -> Option<Value> + Send + Sync + 'static,
    {
        self.guard_flushing()?;
        self.inner.hooks.resolving.push(Arc::new(hook));
        Ok(())
    }

    /// Hook run once all resolving hooks are done
    pub fn on_after_resolving<F>(&self, hook: F) -> Result<()>
    where
        F: Fn(&Binding, &Value) -> Option<Value> + Send + Sync + 'static,
    {
        self.guard_flushing()?;
        self.inner.hooks.after_resolving.push(Arc::new(hook));
        Ok(())
    }

    /// Hook run whenever a cached instance is released
    pub fn on_release<F>(&self, hook: F) -> Result<()>
    where
        F: Fn(&Binding, &Value) + Send + Sync + 'static,
    {
        self.guard_flushing()?;
        self.inner.hooks.release.push(Arc::new(hook));
        Ok(())
    }

    /// Watch `name` for rebuilds.
    ///
    /// Never fired on the first build; fired when a resolved name is bound
    /// again, re-instanced, extended or rebuilt after a release.
    pub fn on_rebound<F>(&self, name: &str, watcher: F) -> Result<()>
    where
        F: Fn(Value) + Send + Sync + 'static,
    {
        self.guard_flushing()?;
        let service = self.inner.registry.alias_to_service(name);
        if !self.inner.registry.has_bind(&service) && !self.inner.registry.has_instance(&service) {
            return Err(ContainerError::logic(format!(
                "Service [{service}] is not bound or instanced, can not watch it"
            )));
        }
        self.inner.hooks.push_rebound(&service, Arc::new(watcher));
        Ok(())
    }

    // =========================================================================
    // Teardown
    // =========================================================================

    /// Remove `name` (or the service it aliases), its aliases, tag
    /// memberships and decorators, releasing any cached instance.
    pub fn unbind(&self, name: &str) -> Result<()> {
        self.guard_flushing()?;
        if name.is_empty() {
            return Ok(());
        }

        let registry = &self.inner.registry;
        let service = registry.alias_to_service(name);

        let released = self.release(&service);
        let binding = registry.remove_bind(&service);
        if binding.is_none() && !released {
            return Ok(());
        }

        let aliases = registry.remove_aliases_of(&service);
        registry.remove_from_tags(&service, &aliases);
        self.inner.hooks.clear_extenders(&service);

        if let Some(binding) = binding {
            binding.mark_unbound();

            #[cfg(feature = "logging")]
            debug!(
                target: "service_container",
                service = %service,
                aliases = aliases.len(),
                "Unbinding service"
            );
        }

        Ok(())
    }

    /// Drop the cached instance of `name`, running release hooks.
    ///
    /// Returns `false` when nothing was cached.
    pub fn release(&self, name: &str) -> bool {
        if name.is_empty() {
            return false;
        }

        let registry = &self.inner.registry;
        let service = registry.alias_to_service(name);
        let Some(instance) = registry.take_instance(&service) else {
            return false;
        };

        let binding = registry
            .get_bind(&service)
            .unwrap_or_else(|| Binding::detached(&service, Concrete::named(service.as_str()), true));

        for hook in binding.hooks().release.snapshot() {
            hook(&binding, &instance);
        }
        for hook in self.inner.hooks.release.snapshot() {
            hook(&binding, &instance);
        }

        #[cfg(feature = "logging")]
        debug!(
            target: "service_container",
            service = %service,
            "Released service instance"
        );

        true
    }

    /// Release every instance, most recently cached first, then reset the
    /// container to empty.
    ///
    /// Registrations attempted from release hooks fail with a Logic error.
    pub fn flush(&self) -> Result<()> {
        if self
            .inner
            .flushing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ContainerError::flushing());
        }
        let _reset = FlushingReset(&self.inner.flushing);

        let order = self.inner.registry.release_order();

        #[cfg(feature = "logging")]
        debug!(
            target: "service_container",
            instances = order.len(),
            bindings = self.inner.registry.bind_count(),
            "Flushing container"
        );

        for service in &order {
            self.release(service);
        }

        for binding in self.inner.registry.clear() {
            binding.mark_unbound();
        }
        self.inner.hooks.clear();
        self.inner.types.clear();
        self.inner.methods.clear();

        Ok(())
    }

    // =========================================================================
    // Types
    // =========================================================================

    /// Add a fallback lookup from names to types; lower priorities run first
    pub fn on_find_type<F>(&self, finder: F, priority: i32) -> Result<()>
    where
        F: Fn(&str) -> Option<TypeDescriptor> + Send + Sync + 'static,
    {
        self.guard_flushing()?;
        self.inner.types.add_finder(Arc::new(finder), priority);
        Ok(())
    }

    /// Make `T` buildable under its service name without binding it.
    ///
    /// ```rust
    /// use service_container::{Constructible, Constructor, Container};
    ///
    /// struct Clock;
    ///
    /// impl Constructible for Clock {
    ///     fn constructors() -> Vec<Constructor> {
    ///         vec![Constructor::new(vec![], |_| Ok(Clock))]
    ///     }
    /// }
    ///
    /// let container = Container::new();
    /// container.register_type::<Clock>().unwrap();
    /// assert!(container.get::<Clock>().is_ok());
    /// ```
    pub fn register_type<T: Constructible>(&self) -> Result<()> {
        self.guard_flushing()?;
        let descriptor = T::descriptor();

        #[cfg(feature = "logging")]
        debug!(
            target: "service_container",
            service = descriptor.service(),
            constructors = descriptor.constructors().len(),
            "Registering type"
        );

        self.inner.types.register(descriptor);
        Ok(())
    }

    /// Service name the container uses for `T`
    #[inline]
    pub fn type_to_service<T: ?Sized + 'static>(&self) -> String {
        service_name_of::<T>()
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Binding of `name`, following aliases
    #[inline]
    pub fn get_bind(&self, name: &str) -> Option<Binding> {
        let service = self.inner.registry.alias_to_service(name);
        self.inner.registry.get_bind(&service)
    }

    #[inline]
    pub fn has_bind(&self, name: &str) -> bool {
        self.get_bind(name).is_some()
    }

    #[inline]
    pub fn has_instance(&self, name: &str) -> bool {
        let service = self.inner.registry.alias_to_service(name);
        self.inner.registry.has_instance(&service)
    }

    /// True if `name` is bound as a singleton
    #[inline]
    pub fn is_static(&self, name: &str) -> bool {
        self.get_bind(name).is_some_and(|b| b.is_static())
    }

    /// True if `name` was built before or has a cached instance
    pub fn is_resolved(&self, name: &str) -> bool {
        let service = self.inner.registry.alias_to_service(name);
        self.inner.registry.was_resolved(&service) || self.inner.registry.has_instance(&service)
    }

    /// True if `make(name)` has something to work with
    pub fn can_make(&self, name: &str) -> bool {
        let service = self.inner.registry.alias_to_service(name);
        self.inner.registry.has_bind(&service)
            || self.inner.registry.has_instance(&service)
            || self.inner.types.peek(&service).is_some()
    }

    /// Number of bindings
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.registry.bind_count()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0 && self.inner.registry.instance_count() == 0
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("id", &self.inner.id)
            .field("registry", &self.inner.registry)
            .field("methods", &self.inner.methods.len())
            .field("flushing", &self.is_flushing())
            .finish()
    }
}

/// Clears the flushing flag even if a release hook panics
struct FlushingReset<'a>(&'a AtomicBool);

impl Drop for FlushingReset<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn validate_service_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(ContainerError::logic("Service name can not be empty"));
    }
    if name.contains(RESERVED_CHARS) {
        return Err(ContainerError::logic(format!(
            "Service name [{name}] contains reserved characters, $ @ and : are not allowed"
        )));
    }
    Ok(())
}
