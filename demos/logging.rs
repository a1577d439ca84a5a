//! Example demonstrating logging capabilities
//!
//! Run with JSON logging (production):
//! ```bash
//! cargo run --example logging --features logging-json
//! ```
//!
//! Run with pretty logging (development):
//! ```bash
//! cargo run --example logging --features logging-pretty
//! ```

use service_container::{value, Concrete, Container};

#[allow(dead_code)]
struct Database {
    url: String,
}

#[allow(dead_code)]
struct RequestContext {
    request_id: String,
}

fn main() {
    // Initialize logging - uses JSON if logging-json feature enabled,
    // pretty if logging-pretty enabled
    #[cfg(feature = "logging")]
    {
        service_container::logging::init();
    }

    println!("=== Service Container Logging Demo ===\n");

    // logs: "Creating service container"
    let container = Container::new();

    // logs: "Binding service"
    container
        .singleton(
            "db",
            Concrete::factory(|_, _| {
                Ok(Database {
                    url: "postgres://localhost/mydb".into(),
                })
            }),
        )
        .unwrap();
    container
        .bind(
            "request",
            Concrete::factory(|_, _| {
                println!("  [App] Request context being created...");
                Ok(RequestContext {
                    request_id: "req-12345".into(),
                })
            }),
            false,
        )
        .unwrap();

    // logs: "Registering alias", "Tagging services"
    container.alias("database", "db").unwrap();
    container.tag("infrastructure", &["db"]).unwrap();

    // logs: "Building service", then "Service resolved from cache" on the second make
    let _db = container.make("database").unwrap();
    let _db = container.make("db").unwrap();
    let _ctx = container.make("request").unwrap();

    // Unknown services surface as errors
    let missing = container.make("mailer");
    assert!(missing.is_err());

    container
        .on_rebound("db", |_| println!("  [App] Database was replaced"))
        .unwrap();

    // logs: "Released service instance", "Storing service instance",
    // "Notifying rebound watchers"
    container
        .instance(
            "db",
            value(Database {
                url: "postgres://replica/mydb".into(),
            }),
        )
        .unwrap();

    // logs: "Flushing container"
    container.flush().unwrap();

    println!("\n=== Demo Complete ===");
    println!("Check the log output above to see structured logging in action!");
    println!("\nTip: Use --features logging-json for production (JSON output)");
    println!("     Use --features logging-pretty for development (colorful output)");
}
