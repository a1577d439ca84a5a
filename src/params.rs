//! Parameter declarations, user arguments and parameter resolution
//!
//! Constructors, methods and callables declare their parameters as a list of
//! [`Parameter`]s. At build time the container fills each one in order from:
//!
//! 1. the binding's contextual needs (`$name` first, then the type's service name)
//! 2. named [`ParamsCollection`]s passed by the caller, latest first
//! 3. the first compatible positional argument, consumed on use
//! 4. the container itself, when the parameter is a service it can make
//! 5. the declared default
//! 6. `None`, when the parameter is nullable

use crate::binding::{Binding, Given};
use crate::container::Container;
use crate::error::{ContainerError, Result};
use crate::injectable::{service_name_of, value, value_type_id, Injectable, Value};
use ahash::AHashMap;
use std::any::TypeId;
use std::str::FromStr;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::trace;

/// Named argument values, matched against parameter names.
#[derive(Clone, Default)]
pub struct ParamsCollection {
    entries: AHashMap<String, Value>,
}

impl ParamsCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry, builder style.
    ///
    /// ```rust
    /// use service_container::ParamsCollection;
    ///
    /// let params = ParamsCollection::new().with("port", 8080u16);
    /// assert_eq!(params.len(), 1);
    /// ```
    pub fn with<T: Injectable>(mut self, name: impl Into<String>, instance: T) -> Self {
        self.insert(name, value(instance));
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, instance: Value) -> Option<Value> {
        self.entries.insert(name.into(), instance)
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.entries.remove(name)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for ParamsCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}

/// A user supplied argument to `make_with`, `call` or `invoke`
#[derive(Clone)]
pub enum Argument {
    /// Matched by type against the next parameter that accepts it
    Positional(Value),
    /// Matched by parameter name
    Named(ParamsCollection),
}

impl Argument {
    /// Positional argument holding `instance`
    #[inline]
    pub fn value<T: Injectable>(instance: T) -> Self {
        Self::Positional(value(instance))
    }

    #[inline]
    pub fn named(params: ParamsCollection) -> Self {
        Self::Named(params)
    }

    /// Number of user parameters this argument carries
    #[inline]
    pub(crate) fn weight(&self) -> usize {
        match self {
            Self::Positional(_) => 1,
            Self::Named(params) => params.len(),
        }
    }
}

impl From<ParamsCollection> for Argument {
    fn from(params: ParamsCollection) -> Self {
        Self::Named(params)
    }
}

impl std::fmt::Debug for Argument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Positional(_) => f.write_str("Positional(..)"),
            Self::Named(params) => f.debug_tuple("Named").field(params).finish(),
        }
    }
}

/// What a parameter expects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
    /// A service the container can make when nothing else supplies it
    Service,
    /// A plain value; never made by the container
    Value,
}

type CoerceFn = fn(&Value) -> Option<Value>;
type DefaultFn = Arc<dyn Fn() -> Value + Send + Sync>;

/// A declared constructor or method parameter.
#[derive(Clone)]
pub struct Parameter {
    name: &'static str,
    kind: ParameterKind,
    type_id: TypeId,
    type_name: &'static str,
    service: String,
    nullable: bool,
    coerce: Option<CoerceFn>,
    default: Option<DefaultFn>,
}

impl Parameter {
    fn declare<T: Injectable>(name: &'static str, kind: ParameterKind) -> Self {
        Self {
            name,
            kind,
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            service: service_name_of::<T>(),
            nullable: false,
            coerce: None,
            default: None,
        }
    }

    /// A required service of type `T`, extracted with [`Arguments::service`]
    pub fn service<T: Injectable>(name: &'static str) -> Self {
        Self::declare::<T>(name, ParameterKind::Service)
    }

    /// A service of type `T` that may be absent, extracted with [`Arguments::optional`]
    pub fn optional_service<T: Injectable>(name: &'static str) -> Self {
        Self::service::<T>(name).nullable()
    }

    /// A primitive value that also accepts strings, parsed with `FromStr`.
    ///
    /// ```rust
    /// use service_container::Parameter;
    ///
    /// let port = Parameter::parsed::<u16>("port");
    /// assert_eq!(port.name(), "port");
    /// ```
    pub fn parsed<T: Injectable + FromStr>(name: &'static str) -> Self {
        Self {
            coerce: Some(parse_value::<T>),
            ..Self::declare::<T>(name, ParameterKind::Value)
        }
    }

    /// A plain value of type `T`, extracted with [`Arguments::value`]
    pub fn value<T: Injectable>(name: &'static str) -> Self {
        Self::declare::<T>(name, ParameterKind::Value)
    }

    /// Allow the parameter to resolve to nothing
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Value used when nothing else supplies the parameter
    pub fn with_default<T, F>(mut self, default: F) -> Self
    where
        T: Injectable,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.default = Some(Arc::new(move || value(default())));
        self
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn kind(&self) -> ParameterKind {
        self.kind
    }

    /// Service name of the parameter type
    #[inline]
    pub fn service_name(&self) -> &str {
        &self.service
    }

    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    #[inline]
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    #[inline]
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// `candidate` as a value of this parameter's type, coercing when allowed
    pub(crate) fn accept(&self, candidate: &Value) -> Option<Value> {
        if value_type_id(candidate) == self.type_id {
            return Some(candidate.clone());
        }
        self.coerce.and_then(|coerce| coerce(candidate))
    }
}

impl std::fmt::Debug for Parameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parameter")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("type", &self.type_name)
            .field("nullable", &self.nullable)
            .field("has_default", &self.default.is_some())
            .finish()
    }
}

fn parse_value<T: Injectable + FromStr>(candidate: &Value) -> Option<Value> {
    let text = candidate
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| candidate.downcast_ref::<&'static str>().copied())?;
    text.trim().parse::<T>().ok().map(value)
}

/// Resolved parameter values handed to a constructor or method.
pub struct Arguments {
    owner: String,
    names: Vec<&'static str>,
    values: Vec<Option<Value>>,
}

impl Arguments {
    pub(crate) fn new(owner: &str, names: Vec<&'static str>, values: Vec<Option<Value>>) -> Self {
        Self {
            owner: owner.to_string(),
            names,
            values,
        }
    }

    fn slot(&self, index: usize) -> Result<Option<&Value>> {
        self.values.get(index).map(Option::as_ref).ok_or_else(|| {
            ContainerError::out_of_range(
                "index",
                format!("{} has {} parameters, asked for #{index}", self.owner, self.values.len()),
            )
        })
    }

    fn mismatch<T>(&self, index: usize) -> ContainerError {
        ContainerError::unresolvable(format!(
            "Parameter [{}] of [{}] is not a {}",
            self.names[index],
            self.owner,
            std::any::type_name::<T>()
        ))
    }

    /// Required service at `index`
    pub fn service<T: Injectable>(&self, index: usize) -> Result<Arc<T>> {
        self.optional::<T>(index)?.ok_or_else(|| {
            ContainerError::unresolvable(format!(
                "Parameter [{}] of [{}] is null",
                self.names[index], self.owner
            ))
        })
    }

    /// Service at `index`, `None` when a nullable parameter was not supplied
    pub fn optional<T: Injectable>(&self, index: usize) -> Result<Option<Arc<T>>> {
        match self.slot(index)? {
            None => Ok(None),
            Some(v) => v
                .clone()
                .downcast::<T>()
                .map(Some)
                .map_err(|_| self.mismatch::<T>(index)),
        }
    }

    /// Plain value at `index`, cloned out of the container's shared copy
    pub fn value<T: Injectable + Clone>(&self, index: usize) -> Result<T> {
        let v = self.slot(index)?.ok_or_else(|| {
            ContainerError::unresolvable(format!(
                "Parameter [{}] of [{}] is null",
                self.names[index], self.owner
            ))
        })?;
        v.downcast_ref::<T>()
            .cloned()
            .ok_or_else(|| self.mismatch::<T>(index))
    }

    /// Raw value at `index`
    #[inline]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index).and_then(Option::as_ref)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl std::fmt::Debug for Arguments {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arguments")
            .field("owner", &self.owner)
            .field("names", &self.names)
            .finish()
    }
}

/// Total user parameters, positional plus named entries.
pub(crate) fn count_user_params(args: &[Argument]) -> usize {
    args.iter().map(Argument::weight).sum()
}

/// Fails when the caller passed more user parameters than allowed
pub(crate) fn check_user_params(args: &[Argument], max: usize) -> Result<()> {
    let count = count_user_params(args);
    if count > max {
        return Err(ContainerError::logic(format!(
            "Too many parameters, must be less than or equal to {max}, got {count}"
        )));
    }
    Ok(())
}

/// Fills declared parameters for one build.
pub(crate) struct ParamsResolver<'a> {
    container: &'a Container,
    binding: Option<&'a Binding>,
    owner: &'a str,
}

impl<'a> ParamsResolver<'a> {
    pub fn new(container: &'a Container, binding: Option<&'a Binding>, owner: &'a str) -> Self {
        Self {
            container,
            binding,
            owner,
        }
    }

    pub fn resolve(&self, params: &[Parameter], args: &[Argument]) -> Result<Arguments> {
        let mut positional: Vec<Option<Value>> = args
            .iter()
            .filter_map(|arg| match arg {
                Argument::Positional(v) => Some(Some(v.clone())),
                Argument::Named(_) => None,
            })
            .collect();
        let named: Vec<&ParamsCollection> = args
            .iter()
            .rev()
            .filter_map(|arg| match arg {
                Argument::Named(params) => Some(params),
                Argument::Positional(_) => None,
            })
            .collect();

        let mut values = Vec::with_capacity(params.len());
        for param in params {
            values.push(self.resolve_one(param, &named, &mut positional)?);
        }

        Ok(Arguments::new(
            self.owner,
            params.iter().map(Parameter::name).collect(),
            values,
        ))
    }

    fn resolve_one(
        &self,
        param: &Parameter,
        named: &[&ParamsCollection],
        positional: &mut [Option<Value>],
    ) -> Result<Option<Value>> {
        if let Some(v) = self.from_needs(param)? {
            return Ok(Some(v));
        }

        for params in named {
            if let Some(candidate) = params.get(param.name) {
                return param
                    .accept(candidate)
                    .map(Some)
                    .ok_or_else(|| self.uncoercible(param));
            }
        }

        for slot in positional.iter_mut() {
            let accepted = slot.as_ref().and_then(|candidate| param.accept(candidate));
            if accepted.is_some() {
                *slot = None;
                return Ok(accepted);
            }
        }

        let fallback = param.default.is_some() || param.nullable;

        if param.kind == ParameterKind::Service && self.container.can_make(&param.service) {
            #[cfg(feature = "logging")]
            trace!(
                target: "service_container",
                owner = self.owner,
                parameter = param.name,
                service = %param.service,
                "Making parameter from container"
            );

            match self.container.make(&param.service) {
                Ok(made) => {
                    return param
                        .accept(&made)
                        .map(Some)
                        .ok_or_else(|| self.uncoercible(param));
                }
                Err(err) if err.is_unresolvable() && fallback => {}
                Err(err) => return Err(err),
            }
        }

        if let Some(default) = &param.default {
            return Ok(Some(default()));
        }
        if param.nullable {
            return Ok(None);
        }

        Err(ContainerError::unresolvable(format!(
            "Unresolvable dependency, resolving [{}] ({}) for [{}]",
            param.name, param.type_name, self.owner
        )))
    }

    /// Contextual need for `$name`, then for the parameter type's service name
    fn from_needs(&self, param: &Parameter) -> Result<Option<Value>> {
        let Some(binding) = self.binding else {
            return Ok(None);
        };

        let given = binding
            .given_for(&format!("${}", param.name))
            .or_else(|| binding.given_for(&param.service));

        let candidate = match given {
            None => return Ok(None),
            Some(Given::Value(v)) => v,
            Some(Given::Factory(factory)) => factory(),
            Some(Given::Service(service)) => self.container.make(&service)?,
        };

        param
            .accept(&candidate)
            .map(Some)
            .ok_or_else(|| self.uncoercible(param))
    }

    fn uncoercible(&self, param: &Parameter) -> ContainerError {
        ContainerError::unresolvable(format!(
            "Parameter [{}] of [{}] can not be converted to {}",
            param.name, self.owner, param.type_name
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parsed_accepts_strings() {
        let param = Parameter::parsed::<i32>("boo");
        let from_string = param.accept(&value(String::from("300"))).unwrap();
        assert_eq!(*from_string.downcast_ref::<i32>().unwrap(), 300);

        let from_str = param.accept(&value("42")).unwrap();
        assert_eq!(*from_str.downcast_ref::<i32>().unwrap(), 42);

        assert!(param.accept(&value(String::from("abc"))).is_none());
        assert!(param.accept(&value(1.5f64)).is_none());
    }

    #[test]
    fn test_value_param_is_strict() {
        let param = Parameter::value::<String>("name");
        assert!(param.accept(&value(String::from("x"))).is_some());
        assert!(param.accept(&value(3u8)).is_none());
    }

    #[test]
    fn test_arguments_extraction() {
        let args = Arguments::new(
            "owner",
            vec!["a", "b", "c"],
            vec![Some(value(String::from("x"))), None, Some(value(7u32))],
        );

        assert_eq!(*args.service::<String>(0).unwrap(), "x");
        assert!(args.optional::<String>(1).unwrap().is_none());
        assert!(args.service::<String>(1).unwrap_err().is_unresolvable());
        assert_eq!(args.value::<u32>(2).unwrap(), 7);
        assert!(args.value::<u64>(2).unwrap_err().is_unresolvable());
        assert!(matches!(
            args.value::<u32>(9),
            Err(ContainerError::ArgumentOutOfRange { .. })
        ));
    }

    #[test]
    fn test_count_user_params() {
        let args = vec![
            Argument::value(1u8),
            Argument::named(ParamsCollection::new().with("a", 1u8).with("b", 2u8)),
        ];
        assert_eq!(count_user_params(&args), 3);
        assert!(check_user_params(&args, 3).is_ok());
        assert!(check_user_params(&args, 2).unwrap_err().is_logic());
    }

    #[test]
    fn test_positional_consumed_in_order() {
        let container = Container::new();
        let resolver = ParamsResolver::new(&container, None, "test");
        let params = vec![Parameter::value::<u8>("x"), Parameter::value::<u8>("y")];
        let args = vec![Argument::value(1u8), Argument::value(2u8)];

        let resolved = resolver.resolve(&params, &args).unwrap();
        assert_eq!(resolved.value::<u8>(0).unwrap(), 1);
        assert_eq!(resolved.value::<u8>(1).unwrap(), 2);
    }

    #[test]
    fn test_named_latest_first_then_default_then_nullable() {
        let container = Container::new();
        let resolver = ParamsResolver::new(&container, None, "test");
        let params = vec![
            Parameter::value::<u8>("x"),
            Parameter::value::<u8>("y").with_default(|| 9u8),
            Parameter::optional_service::<String>("z"),
        ];
        let args = vec![
            Argument::named(ParamsCollection::new().with("x", 1u8)),
            Argument::named(ParamsCollection::new().with("x", 2u8)),
        ];

        let resolved = resolver.resolve(&params, &args).unwrap();
        assert_eq!(resolved.value::<u8>(0).unwrap(), 2);
        assert_eq!(resolved.value::<u8>(1).unwrap(), 9);
        assert!(resolved.optional::<String>(2).unwrap().is_none());
    }

    #[test]
    fn test_missing_required_is_unresolvable() {
        let container = Container::new();
        let resolver = ParamsResolver::new(&container, None, "owner");
        let err = resolver
            .resolve(&[Parameter::value::<u8>("x")], &[])
            .unwrap_err();
        assert!(err.is_unresolvable());
        assert!(err.to_string().contains("[x]"));
        assert!(err.to_string().contains("[owner]"));
    }
}
