//! Example demonstrating the #[derive(Inject)] macro
//!
//! Run with:
//!   cargo run --example derive --features derive

use service_container::{Argument, Concrete, Container, Inject, Injectable};
use std::sync::Arc;

// Dependencies
struct Database {
    url: String,
}

struct Cache {
    size: usize,
}

#[allow(dead_code)]
struct Logger {
    level: String,
}

// Service with injected dependencies
#[derive(Inject)]
struct UserService {
    db: Arc<Database>,
    cache: Arc<Cache>,
    logger: Option<Arc<Logger>>,
    #[inject(default)]
    request_count: u64,
    #[inject(name = "region", default = String::from("eu-west"))]
    region: String,
}

impl UserService {
    fn describe(&self) -> String {
        let logger_status = if self.logger.is_some() {
            "with logging"
        } else {
            "without logging"
        };
        format!(
            "UserService connected to {} with cache size {} ({}, region: {}, requests: {})",
            self.db.url, self.cache.size, logger_status, self.region, self.request_count
        )
    }
}

// Nested injection example
#[derive(Inject)]
struct ApiController {
    users: Arc<UserService>,
    #[inject(default = 8080)]
    port: u16,
}

fn main() {
    println!("=== Service Container Derive Macro Demo ===\n");

    let container = Container::new();
    container
        .singleton(
            &Database::service_name(),
            Concrete::factory(|_, _| {
                Ok(Database {
                    url: "postgres://localhost:5432/myapp".into(),
                })
            }),
        )
        .unwrap();
    container
        .singleton(
            &Cache::service_name(),
            Concrete::factory(|_, _| Ok(Cache { size: 1024 })),
        )
        .unwrap();
    // Note: Logger is NOT registered, so it will be None

    container
        .bind("users", Concrete::of::<UserService>(), false)
        .unwrap();

    println!("Creating UserService from container...");
    let users = container.make_as::<UserService>("users").unwrap();
    println!("  {}", users.describe());
    println!();

    // Register a logger and give the service a different region
    container
        .singleton(
            &Logger::service_name(),
            Concrete::factory(|_, _| {
                Ok(Logger {
                    level: "DEBUG".into(),
                })
            }),
        )
        .unwrap();
    container
        .get_bind("users")
        .unwrap()
        .needs("$region")
        .given_value(String::from("us-east"))
        .unwrap();

    println!("Creating UserService with Logger...");
    let users = container.make_as::<UserService>("users").unwrap();
    println!("  {}", users.describe());
    println!();

    // ApiController pulls UserService in by its type's service name
    container
        .singleton(&UserService::service_name(), Concrete::of::<UserService>())
        .unwrap();
    container.register_type::<ApiController>().unwrap();
    let api = container
        .make_with(
            &ApiController::service_name(),
            &[Argument::value(String::from("9090"))],
        )
        .unwrap();
    if let Some(api) = api.downcast_ref::<ApiController>() {
        println!("ApiController on port {}:", api.port);
        println!("  {}", api.users.describe());
    }

    println!("\n=== Demo Complete ===");
    println!("\nThe #[derive(Inject)] macro implemented `Constructible` so that:");
    println!("  - Arc<T> fields are made from the container");
    println!("  - Option<Arc<T>> fields are None when T can not be made");
    println!("  - primitive fields accept strings and fall back to their defaults");
}
