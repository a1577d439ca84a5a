//! Callables with injected parameters and the named method table

use crate::error::BoxError;
use crate::injectable::{Injectable, Value};
use crate::params::{Arguments, Parameter};
use crate::storage::new_map;
use ahash::RandomState;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

type InvokeFn = Arc<dyn Fn(Arguments) -> Result<Value, BoxError> + Send + Sync>;

/// A function whose parameters the container fills, run by `Container::call`
/// or registered under a name with `Container::bind_method`.
///
/// When an owner service is set, that binding's contextual needs apply to
/// the callable's parameters.
///
/// ```rust
/// use service_container::{Argument, Callable, Container, Parameter};
///
/// let container = Container::new();
/// let double = Callable::new("double", vec![Parameter::parsed::<i64>("n")], |args| {
///     Ok(args.value::<i64>(0)? * 2)
/// });
///
/// let out = container.call(&double, &[Argument::value(String::from("21"))]).unwrap();
/// assert_eq!(*out.downcast_ref::<i64>().unwrap(), 42);
/// ```
#[derive(Clone)]
pub struct Callable {
    name: String,
    params: Arc<[Parameter]>,
    owner: Option<String>,
    invoke: InvokeFn,
}

impl Callable {
    pub fn new<T, F>(name: impl Into<String>, params: Vec<Parameter>, invoke: F) -> Self
    where
        T: Injectable,
        F: Fn(Arguments) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            params: params.into(),
            owner: None,
            invoke: Arc::new(move |args| invoke(args).map(|v| Arc::new(v) as Value)),
        }
    }

    /// Resolve parameters with the contextual needs of `service`
    pub fn with_owner(mut self, service: impl Into<String>) -> Self {
        self.owner = Some(service.into());
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn parameters(&self) -> &[Parameter] {
        &self.params
    }

    #[inline]
    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    #[inline]
    pub(crate) fn invoke(&self, args: Arguments) -> Result<Value, BoxError> {
        (self.invoke)(args)
    }
}

impl std::fmt::Debug for Callable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callable")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("owner", &self.owner)
            .finish()
    }
}

/// Methods registered by name
pub(crate) struct MethodTable {
    methods: DashMap<String, Callable, RandomState>,
}

impl MethodTable {
    pub fn new() -> Self {
        Self {
            methods: new_map(0),
        }
    }

    /// Register `callable` under `name`, returning it back if the name is taken
    pub fn insert(&self, name: &str, callable: Callable) -> Result<(), Callable> {
        match self.methods.entry(name.to_string()) {
            Entry::Occupied(_) => Err(callable),
            Entry::Vacant(slot) => {
                slot.insert(callable);
                Ok(())
            }
        }
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<Callable> {
        self.methods.get(name).map(|c| c.value().clone())
    }

    #[inline]
    pub fn remove(&self, name: &str) -> bool {
        self.methods.remove(name).is_some()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn clear(&self) {
        self.methods.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(name: &str) -> Callable {
        Callable::new(name, vec![], |_| Ok(()))
    }

    #[test]
    fn test_method_table_rejects_duplicates() {
        let table = MethodTable::new();
        assert!(table.insert("greet", noop("greet")).is_ok());
        let rejected = table.insert("greet", noop("other")).unwrap_err();
        assert_eq!(rejected.name(), "other");
        assert_eq!(table.len(), 1);

        assert!(table.remove("greet"));
        assert!(!table.remove("greet"));
        assert!(table.get("greet").is_none());
    }

    #[test]
    fn test_owner() {
        let callable = noop("greet").with_owner("mailer");
        assert_eq!(callable.owner(), Some("mailer"));
        assert!(noop("greet").owner().is_none());
    }
}
