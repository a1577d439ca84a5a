//! Constructor injection through `#[derive(Inject)]`

#![cfg(feature = "derive")]

use service_container::{Argument, Concrete, Container, Inject, Injectable, ParamsCollection};
use std::sync::Arc;

struct Database {
    url: String,
}

struct Cache;

#[derive(Inject)]
struct UserService {
    db: Arc<Database>,
    cache: Option<Arc<Cache>>,
    #[inject(name = "max_users", default = 100)]
    limit: u32,
    #[inject(default)]
    label: String,
}

#[derive(Inject)]
struct Marker;

fn container_with_db() -> Container {
    let container = Container::new();
    container
        .singleton(
            &Database::service_name(),
            Concrete::factory(|_, _| {
                Ok(Database {
                    url: "postgres://localhost".into(),
                })
            }),
        )
        .unwrap();
    container
}

#[test]
fn test_fields_are_injected() {
    let container = container_with_db();
    container
        .bind("users", Concrete::of::<UserService>(), false)
        .unwrap();

    let users = container.make_as::<UserService>("users").unwrap();
    assert_eq!(users.db.url, "postgres://localhost");
    assert!(users.cache.is_none());
    assert_eq!(users.limit, 100);
    assert_eq!(users.label, "");
}

#[test]
fn test_optional_service_is_filled_when_bound() {
    let container = container_with_db();
    container
        .singleton(&Cache::service_name(), Concrete::factory(|_, _| Ok(Cache)))
        .unwrap();
    container
        .bind("users", Concrete::of::<UserService>(), false)
        .unwrap();

    let users = container.make_as::<UserService>("users").unwrap();
    assert!(users.cache.is_some());
}

#[test]
fn test_renamed_parameter_needs_win_over_named_arguments() {
    let container = container_with_db();
    container
        .bind("users", Concrete::of::<UserService>(), false)
        .unwrap()
        .needs("$max_users")
        .given_value(7u32)
        .unwrap();

    let users = container.make_as::<UserService>("users").unwrap();
    assert_eq!(users.limit, 7);

    let named = ParamsCollection::new()
        .with("max_users", 9u32)
        .with("label", String::from("admins"));
    let users = container
        .make_with("users", &[Argument::named(named)])
        .unwrap()
        .downcast::<UserService>()
        .ok()
        .unwrap();
    // the contextual need still wins over the named argument
    assert_eq!(users.limit, 7);
    assert_eq!(users.label, "admins");
}

#[test]
fn test_primitive_accepts_string_argument() {
    let container = container_with_db();
    container
        .bind("users", Concrete::of::<UserService>(), false)
        .unwrap();

    let users = container
        .make_with("users", &[Argument::value(String::from("42"))])
        .unwrap()
        .downcast::<UserService>()
        .ok()
        .unwrap();
    assert_eq!(users.limit, 42);
}

#[test]
fn test_missing_required_service_is_unresolvable() {
    let container = Container::new();
    container
        .bind("users", Concrete::of::<UserService>(), false)
        .unwrap();

    let err = container.make("users").unwrap_err();
    assert!(err.is_unresolvable());
}

#[test]
fn test_unit_struct() {
    let container = Container::new();
    container.register_type::<Marker>().unwrap();

    let first = container.get::<Marker>().unwrap();
    let second = container.get::<Marker>().unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
}
