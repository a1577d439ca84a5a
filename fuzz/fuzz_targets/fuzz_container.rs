#![no_main]

//! Fuzz target for container operations
//!
//! Drives random sequences of registry mutations and resolutions over a
//! small pool of names so that aliases, rebinds and releases collide.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use service_container::{value, Argument, Concrete, Container, Value};
use std::sync::Arc;

const NAMES: [&str; 6] = ["a", "b", "c", "d", "a.b", "$"];

#[derive(Clone, Debug, Arbitrary)]
struct Payload {
    id: u32,
    text: String,
}

#[derive(Debug, Arbitrary)]
enum ContainerOp {
    Bind { name: u8, is_static: bool },
    Instance { name: u8, payload: Payload },
    Alias { alias: u8, service: u8 },
    Tag { tag: u8, services: Vec<u8> },
    Tagged { tag: u8 },
    Make { name: u8 },
    MakeWith { name: u8, positional: Vec<String> },
    Extend { name: u8 },
    OnRebound { name: u8 },
    Release { name: u8 },
    Unbind { name: u8 },
    Flush,
    Queries { name: u8 },
}

fn name(index: u8) -> &'static str {
    NAMES[index as usize % NAMES.len()]
}

fn tag(index: u8) -> &'static str {
    ["tag.x", "tag.y"][index as usize % 2]
}

fn payload() -> Concrete {
    Concrete::factory(|_, args| {
        Ok(Payload {
            id: args.len() as u32,
            text: String::from("built"),
        })
    })
}

fuzz_target!(|ops: Vec<ContainerOp>| {
    let container = Container::new();

    for op in ops {
        match op {
            ContainerOp::Bind { name: n, is_static } => {
                let _ = container.bind(name(n), payload(), is_static);
            }
            ContainerOp::Instance { name: n, payload } => {
                if let Ok(stored) = container.instance(name(n), value(payload)) {
                    // the cached value is what the next make returns
                    if let Ok(made) = container.make(name(n)) {
                        assert!(Arc::ptr_eq(&stored, &made));
                    }
                }
            }
            ContainerOp::Alias { alias, service } => {
                if container.alias(name(alias), name(service)).is_ok() {
                    assert!(container.is_alias(name(alias)));
                }
            }
            ContainerOp::Tag { tag: t, services } => {
                let services: Vec<&str> = services.iter().map(|&s| name(s)).collect();
                let _ = container.tag(tag(t), &services);
            }
            ContainerOp::Tagged { tag: t } => {
                let _ = container.tagged(tag(t));
            }
            ContainerOp::Make { name: n } => {
                let first = container.make(name(n));
                if let Ok(first) = first {
                    if container.is_static(name(n)) {
                        let second = container.make(name(n)).unwrap();
                        assert!(Arc::ptr_eq(&first, &second));
                    }
                }
            }
            ContainerOp::MakeWith {
                name: n,
                positional,
            } => {
                let args: Vec<Argument> = positional.into_iter().map(Argument::value).collect();
                let _ = container.make_with(name(n), &args);
            }
            ContainerOp::Extend { name: n } => {
                let _ = container.extend(name(n), |instance: Value, _: &Container| instance);
            }
            ContainerOp::OnRebound { name: n } => {
                let _ = container.on_rebound(name(n), |_| {});
            }
            ContainerOp::Release { name: n } => {
                container.release(name(n));
                assert!(!container.has_instance(name(n)));
            }
            ContainerOp::Unbind { name: n } => {
                if container.unbind(name(n)).is_ok() {
                    assert!(!container.has_bind(name(n)));
                }
            }
            ContainerOp::Flush => {
                container.flush().unwrap();
                assert!(container.is_empty());
            }
            ContainerOp::Queries { name: n } => {
                let _ = container.has_bind(name(n));
                let _ = container.is_resolved(name(n));
                let _ = container.can_make(name(n));
                let _ = container.get_bind(name(n));
                let _ = container.len();
            }
        }
    }
});
