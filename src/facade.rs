//! Process-wide container slot
//!
//! Meant for the composition root only: set it once at startup, read it
//! where an explicit handle cannot be threaded through. Library code should
//! take a `&Container` instead.

use crate::container::Container;
use crate::error::{ContainerError, Result};
use once_cell::sync::OnceCell;

static GLOBAL: OnceCell<Container> = OnceCell::new();

/// Install `container` as the process-wide container.
///
/// Fails with a Logic error if one was already installed.
pub fn set_global(container: Container) -> Result<()> {
    GLOBAL
        .set(container)
        .map_err(|_| ContainerError::logic("A global container is already set"))
}

/// The process-wide container
pub fn global() -> Result<&'static Container> {
    GLOBAL
        .get()
        .ok_or_else(|| ContainerError::logic("No global container has been set"))
}

/// The process-wide container, if one was installed
#[inline]
pub fn try_global() -> Option<&'static Container> {
    GLOBAL.get()
}
