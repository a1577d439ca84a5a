//! Per-thread build stack used for circular dependency detection
//!
//! Each entry is tagged with the id of the container that pushed it, so two
//! containers resolving on the same thread never see each other's chains.

use crate::error::{ContainerError, Result};
use std::cell::RefCell;

thread_local! {
    static BUILD_STACK: RefCell<Vec<(u64, String)>> = const { RefCell::new(Vec::new()) };
}

/// Guard that pops its service from the build stack on drop.
///
/// A failing build drops the guard on the error path as well, so a failed
/// resolution never leaves a stale entry behind.
#[derive(Debug)]
pub(crate) struct BuildGuard {
    container: u64,
    service: String,
}

impl BuildGuard {
    /// Push `service` for `container`.
    ///
    /// Fails with a Logic error naming the current chain if `service` is
    /// already being built by the same container on this thread.
    pub fn push(container: u64, service: &str) -> Result<Self> {
        BUILD_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            if stack
                .iter()
                .any(|(owner, name)| *owner == container && name == service)
            {
                let chain: Vec<String> = stack
                    .iter()
                    .filter(|(owner, _)| *owner == container)
                    .map(|(_, name)| name.clone())
                    .collect();
                return Err(ContainerError::circular(service, &chain));
            }
            stack.push((container, service.to_string()));
            Ok(Self {
                container,
                service: service.to_string(),
            })
        })
    }

    /// Names currently being built by `container` on this thread
    #[cfg(test)]
    pub fn chain(container: u64) -> Vec<String> {
        BUILD_STACK.with(|stack| {
            stack
                .borrow()
                .iter()
                .filter(|(owner, _)| *owner == container)
                .map(|(_, name)| name.clone())
                .collect()
        })
    }
}

impl Drop for BuildGuard {
    fn drop(&mut self) {
        BUILD_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            if let Some(pos) = stack
                .iter()
                .rposition(|(owner, name)| *owner == self.container && *name == self.service)
            {
                stack.remove(pos);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_pop() {
        {
            let _a = BuildGuard::push(1, "a").unwrap();
            {
                let _b = BuildGuard::push(1, "b").unwrap();
                assert_eq!(BuildGuard::chain(1), vec!["a", "b"]);

                let err = BuildGuard::push(1, "a").unwrap_err();
                assert!(err.is_logic());
                assert!(err.to_string().contains("[a, b]"));
            }
            assert_eq!(BuildGuard::chain(1), vec!["a"]);
        }
        assert!(BuildGuard::chain(1).is_empty());
        let _again = BuildGuard::push(1, "a").unwrap();
    }

    #[test]
    fn test_containers_are_isolated() {
        let _a = BuildGuard::push(10, "a").unwrap();
        let _other = BuildGuard::push(11, "a").unwrap();
        assert_eq!(BuildGuard::chain(10), vec!["a"]);
        assert_eq!(BuildGuard::chain(11), vec!["a"]);
    }
}
