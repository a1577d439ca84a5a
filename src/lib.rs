//! # Service Container - Runtime Service Container for Rust
//!
//! A thread-safe service container keyed by service name. Bindings say how a
//! service is produced, the container builds it on demand, caches it when the
//! binding is static, and tells interested parties when a resolved service is
//! replaced.
//!
//! ## Features
//!
//! - 🔑 **Named services** - Bind factories, types or type names under string keys
//! - 🏭 **Static and transient** - Cache once or build fresh on every make
//! - 🪡 **Parameter injection** - Constructors declare parameters the container fills
//! - 🎯 **Contextual needs** - Give one binding a different implementation of a dependency
//! - 🏷️ **Aliases and tags** - Several names for one service, groups of services
//! - 🎨 **Decorators** - Extenders wrap instances, including already cached ones
//! - 🔔 **Rebound watchers** - Notified when a resolved service is replaced
//! - 🧹 **Ordered release** - Singletons released newest first on flush
//! - 📊 **Observable** - Optional tracing integration with JSON or pretty output
//!
//! ## Quick Start
//!
//! ```rust
//! use service_container::{Concrete, Constructible, Constructor, Container, Parameter};
//! use std::sync::Arc;
//!
//! struct Database {
//!     url: String,
//! }
//!
//! struct UserService {
//!     db: Arc<Database>,
//! }
//!
//! impl Constructible for UserService {
//!     fn constructors() -> Vec<Constructor> {
//!         vec![Constructor::new(vec![Parameter::service::<Database>("db")], |args| {
//!             Ok(UserService { db: args.service(0)? })
//!         })]
//!     }
//! }
//!
//! let container = Container::new();
//! let db_service = container.type_to_service::<Database>();
//!
//! container
//!     .singleton(&db_service, Concrete::factory(|_, _| {
//!         Ok(Database { url: "postgres://localhost".into() })
//!     }))
//!     .unwrap();
//! container.singleton("users", Concrete::of::<UserService>()).unwrap();
//!
//! let users = container.make_as::<UserService>("users").unwrap();
//! assert_eq!(users.db.url, "postgres://localhost");
//!
//! // static bindings hand out the same instance
//! let again = container.make_as::<UserService>("users").unwrap();
//! assert!(Arc::ptr_eq(&users, &again));
//! ```
//!
//! ## Contextual Needs
//!
//! ```rust
//! use service_container::{Concrete, Constructible, Constructor, Container, Parameter};
//! use std::sync::Arc;
//!
//! struct Report {
//!     title: String,
//! }
//!
//! impl Constructible for Report {
//!     fn constructors() -> Vec<Constructor> {
//!         vec![Constructor::new(vec![Parameter::value::<String>("title")], |args| {
//!             Ok(Report { title: args.value(0)? })
//!         })]
//!     }
//! }
//!
//! let container = Container::new();
//! container
//!     .bind("report", Concrete::of::<Report>(), false)
//!     .unwrap()
//!     .needs("$title")
//!     .given_value(String::from("Quarterly"))
//!     .unwrap();
//!
//! let report = container.make_as::<Report>("report").unwrap();
//! assert_eq!(report.title, "Quarterly");
//! ```
//!
//! ## Rebound Watchers
//!
//! ```rust
//! use service_container::{value, Container};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let container = Container::new();
//! container.instance("config", value(1u32)).unwrap();
//! container.make("config").unwrap();
//!
//! let seen = Arc::new(AtomicUsize::new(0));
//! let watcher = Arc::clone(&seen);
//! container
//!     .on_rebound("config", move |_| {
//!         watcher.fetch_add(1, Ordering::SeqCst);
//!     })
//!     .unwrap();
//!
//! container.instance("config", value(2u32)).unwrap();
//! assert_eq!(seen.load(Ordering::SeqCst), 1);
//! ```
//!
//! ## Performance
//!
//! - **Sharded maps**: `DashMap` registries, no global lock on the make path
//! - **AHash**: Faster hashing for service-name keys
//! - **Shared instances**: Returns `Arc` handles, instances are never cloned

mod binding;
mod build_stack;
mod container;
mod error;
pub mod facade;
mod factory;
mod hooks;
mod injectable;
#[cfg(feature = "logging")]
pub mod logging;
mod method;
mod params;
mod storage;
mod type_finder;

pub use binding::{Binding, GivenBuilder};
pub use container::{Container, ContainerConfig};
pub use error::{BoxError, ContainerError, Result};
pub use facade::{global, set_global, try_global};
pub use factory::{Concrete, Constructible, Constructor, FactoryFn, TypeDescriptor};
pub use hooks::{ExtenderFn, ReboundFn, ReleaseFn, ResolvingFn};
pub use injectable::{service_name_of, value, Injectable, Value};
pub use method::Callable;
pub use params::{Argument, Arguments, Parameter, ParameterKind, ParamsCollection};
pub use type_finder::TypeFinder;

#[cfg(feature = "derive")]
pub use service_container_derive::Inject;

// Re-export tracing macros for convenience when logging feature is enabled
#[cfg(feature = "logging")]
pub use tracing::{debug, error, info, trace, warn};

// Re-export for convenience
pub use std::sync::Arc;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        value, Argument, Binding, Callable, Concrete, Constructible, Constructor, Container,
        ContainerError, Injectable, Parameter, ParamsCollection, Result, Value,
    };
    #[cfg(feature = "derive")]
    pub use crate::Inject;
    pub use std::sync::Arc;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Database {
        url: String,
    }

    #[test]
    fn test_singleton_registration() {
        let container = Container::new();
        container
            .singleton(
                "db",
                Concrete::factory(|_, _| Ok(Database { url: "test".into() })),
            )
            .unwrap();

        let db = container.make_as::<Database>("db").unwrap();
        assert_eq!(db.url, "test");
    }

    #[test]
    fn test_multiple_make_same_instance() {
        let container = Container::new();
        container
            .singleton(
                "db",
                Concrete::factory(|_, _| Ok(Database { url: "test".into() })),
            )
            .unwrap();

        let db1 = container.make("db").unwrap();
        let db2 = container.make("db").unwrap();

        assert!(Arc::ptr_eq(&db1, &db2));
    }

    #[test]
    fn test_transient_creates_new_instance() {
        static COUNTER: AtomicU32 = AtomicU32::new(0);

        struct Counter(u32);

        let container = Container::new();
        container
            .bind(
                "counter",
                Concrete::factory(|_, _| Ok(Counter(COUNTER.fetch_add(1, Ordering::SeqCst)))),
                false,
            )
            .unwrap();

        let c1 = container.make_as::<Counter>("counter").unwrap();
        let c2 = container.make_as::<Counter>("counter").unwrap();

        assert_ne!(c1.0, c2.0);
    }

    #[test]
    fn test_static_is_lazy() {
        static CREATED: AtomicU32 = AtomicU32::new(0);

        struct LazyService;

        let container = Container::new();
        container
            .singleton(
                "lazy",
                Concrete::factory(|_, _| {
                    CREATED.fetch_add(1, Ordering::SeqCst);
                    Ok(LazyService)
                }),
            )
            .unwrap();

        assert_eq!(CREATED.load(Ordering::SeqCst), 0);

        container.make("lazy").unwrap();
        assert_eq!(CREATED.load(Ordering::SeqCst), 1);

        container.make("lazy").unwrap();
        assert_eq!(CREATED.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_not_found_error() {
        let container = Container::new();
        let err = container.make("nothing.here").unwrap_err();
        assert!(err.is_unresolvable());
    }

    #[test]
    fn test_get_by_type() {
        struct Settings(u8);

        let container = Container::new();
        let service = container.type_to_service::<Settings>();
        container.instance(&service, value(Settings(7))).unwrap();

        assert_eq!(container.get::<Settings>().unwrap().0, 7);
    }

    #[test]
    fn test_prelude_imports() {
        use crate::prelude::*;

        let container = Container::new();
        let binding: Binding = container
            .bind("n", Concrete::factory(|_, _| Ok(1u8)), false)
            .unwrap();
        assert_eq!(binding.name(), "n");
    }
}
