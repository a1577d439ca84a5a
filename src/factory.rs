//! Construction strategies
//!
//! A binding's [`Concrete`] says how its service is produced:
//!
//! - `Factory` - a callback invoked with the container and the caller's arguments
//! - `Type` - a [`TypeDescriptor`] whose constructors are filled by parameter injection
//! - `Named` - a type named by string, located through the type finders at build time

use crate::container::Container;
use crate::error::BoxError;
use crate::injectable::{service_name_of, Injectable, Value};
use crate::params::{Argument, Arguments, Parameter};
use std::any::TypeId;
use std::sync::Arc;

/// Type-erased factory callback
pub type FactoryFn =
    Arc<dyn Fn(&Container, &[Argument]) -> Result<Value, BoxError> + Send + Sync>;

type BuildFn = Arc<dyn Fn(Arguments) -> Result<Value, BoxError> + Send + Sync>;

/// One way to construct a type: its parameters and the function that
/// assembles an instance from their resolved values.
#[derive(Clone)]
pub struct Constructor {
    params: Arc<[Parameter]>,
    build: BuildFn,
}

impl Constructor {
    /// # Examples
    ///
    /// ```rust
    /// use service_container::{Constructor, Parameter};
    ///
    /// struct Greeter { name: String }
    ///
    /// let ctor = Constructor::new(vec![Parameter::value::<String>("name")], |args| {
    ///     Ok(Greeter { name: args.value(0)? })
    /// });
    /// assert_eq!(ctor.parameters().len(), 1);
    /// ```
    pub fn new<T, F>(params: Vec<Parameter>, build: F) -> Self
    where
        T: Injectable,
        F: Fn(Arguments) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        Self {
            params: params.into(),
            build: Arc::new(move |args| build(args).map(|v| Arc::new(v) as Value)),
        }
    }

    #[inline]
    pub fn parameters(&self) -> &[Parameter] {
        &self.params
    }

    #[inline]
    pub(crate) fn invoke(&self, args: Arguments) -> Result<Value, BoxError> {
        (self.build)(args)
    }
}

impl std::fmt::Debug for Constructor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.params.iter().map(Parameter::name)).finish()
    }
}

/// Runtime description of a constructible type.
///
/// A descriptor without constructors is abstract: it names a service but
/// can never be built.
#[derive(Clone)]
pub struct TypeDescriptor {
    service: String,
    type_id: TypeId,
    type_name: &'static str,
    constructors: Arc<[Constructor]>,
}

impl TypeDescriptor {
    /// Descriptor of a [`Constructible`] type
    #[inline]
    pub fn of<T: Constructible>() -> Self {
        T::descriptor()
    }

    pub fn new<T: Injectable>(constructors: Vec<Constructor>) -> Self {
        Self {
            service: service_name_of::<T>(),
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            constructors: constructors.into(),
        }
    }

    /// Descriptor for a type that can be named but not built, such as a trait object
    pub fn abstract_type<T: ?Sized + 'static>() -> Self {
        Self {
            service: service_name_of::<T>(),
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            constructors: Arc::from(Vec::new()),
        }
    }

    #[inline]
    pub fn service(&self) -> &str {
        &self.service
    }

    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    #[inline]
    pub fn constructors(&self) -> &[Constructor] {
        &self.constructors
    }

    #[inline]
    pub fn is_abstract(&self) -> bool {
        self.constructors.is_empty()
    }

    /// Constructors ordered most parameters first, ties in declaration order
    pub(crate) fn constructors_by_arity(&self) -> Vec<&Constructor> {
        let mut ordered: Vec<&Constructor> = self.constructors.iter().collect();
        ordered.sort_by(|a, b| b.params.len().cmp(&a.params.len()));
        ordered
    }
}

impl std::fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("service", &self.service)
            .field("constructors", &self.constructors)
            .finish()
    }
}

/// Types the container can build by parameter injection.
///
/// Usually derived with `#[derive(Inject)]`; implement it by hand for
/// multiple constructors or custom assembly.
///
/// ```rust
/// use service_container::{Constructible, Constructor, Parameter};
/// use std::sync::Arc;
///
/// struct Config { port: u16 }
/// struct Server { config: Arc<Config> }
///
/// impl Constructible for Server {
///     fn constructors() -> Vec<Constructor> {
///         vec![Constructor::new(vec![Parameter::service::<Config>("config")], |args| {
///             Ok(Server { config: args.service(0)? })
///         })]
///     }
/// }
/// ```
pub trait Constructible: Injectable + Sized {
    fn constructors() -> Vec<Constructor>;

    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::new::<Self>(Self::constructors())
    }
}

/// How a binding produces its service
#[derive(Clone)]
pub enum Concrete {
    Factory(FactoryFn),
    Type(TypeDescriptor),
    Named(String),
}

impl Concrete {
    /// Factory returning a typed instance
    ///
    /// ```rust
    /// use service_container::{Concrete, Container};
    ///
    /// let container = Container::new();
    /// container
    ///     .bind("answer", Concrete::factory(|_, _| Ok(42u32)), false)
    ///     .unwrap();
    /// assert_eq!(*container.make_as::<u32>("answer").unwrap(), 42);
    /// ```
    pub fn factory<T, F>(factory: F) -> Self
    where
        T: Injectable,
        F: Fn(&Container, &[Argument]) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        Self::Factory(Arc::new(move |container: &Container, args: &[Argument]| {
            factory(container, args).map(|v| Arc::new(v) as Value)
        }))
    }

    /// Factory returning an already type-erased value
    pub fn value_factory<F>(factory: F) -> Self
    where
        F: Fn(&Container, &[Argument]) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        Self::Factory(Arc::new(factory))
    }

    /// Build `T` through its constructors
    #[inline]
    pub fn of<T: Constructible>() -> Self {
        Self::Type(T::descriptor())
    }

    /// A type located by name through the container's type finders
    pub fn named(type_name: impl Into<String>) -> Self {
        Self::Named(type_name.into())
    }
}

impl From<TypeDescriptor> for Concrete {
    fn from(descriptor: TypeDescriptor) -> Self {
        Self::Type(descriptor)
    }
}

impl std::fmt::Debug for Concrete {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Factory(_) => f.write_str("Factory"),
            Self::Type(descriptor) => write!(f, "Type({})", descriptor.type_name),
            Self::Named(name) => write!(f, "Named({name})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Arguments;

    struct Pair;

    impl Constructible for Pair {
        fn constructors() -> Vec<Constructor> {
            vec![
                Constructor::new(vec![Parameter::value::<u8>("a")], |_| Ok(Pair)),
                Constructor::new(
                    vec![Parameter::value::<u8>("a"), Parameter::value::<u8>("b")],
                    |_| Ok(Pair),
                ),
                Constructor::new(vec![], |_| Ok(Pair)),
            ]
        }
    }

    #[test]
    fn test_constructors_by_arity() {
        let descriptor = TypeDescriptor::of::<Pair>();
        let arity: Vec<usize> = descriptor
            .constructors_by_arity()
            .iter()
            .map(|c| c.parameters().len())
            .collect();
        assert_eq!(arity, vec![2, 1, 0]);
        assert!(!descriptor.is_abstract());
        assert!(descriptor.service().ends_with(".Pair"));
    }

    #[test]
    fn test_abstract_type() {
        let descriptor = TypeDescriptor::abstract_type::<dyn std::fmt::Debug + Send + Sync>();
        assert!(descriptor.is_abstract());
        assert!(descriptor.constructors_by_arity().is_empty());
    }

    #[test]
    fn test_constructor_invoke() {
        let ctor = Constructor::new(vec![Parameter::value::<u32>("n")], |args| {
            Ok(args.value::<u32>(0)? * 2)
        });
        let args = Arguments::new("test", vec!["n"], vec![Some(crate::injectable::value(21u32))]);
        let out = ctor.invoke(args).unwrap();
        assert_eq!(*out.downcast_ref::<u32>().unwrap(), 42);
    }
}
