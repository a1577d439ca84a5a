//! Error types for the service container

use std::sync::Arc;
use thiserror::Error;

/// Boxed error returned by user supplied factories, constructors and methods.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while registering or resolving services
#[derive(Error, Debug, Clone)]
pub enum ContainerError {
    /// A service or one of its dependencies cannot be produced
    #[error("{0}")]
    Unresolvable(String),

    /// The container API was misused (duplicate bind, cycles, unknown tag, ...)
    #[error("{0}")]
    Logic(String),

    /// A required argument was empty or missing
    #[error("Argument [{0}] can not be null or empty")]
    ArgumentNull(&'static str),

    /// An argument was outside of its accepted range
    #[error("Argument [{argument}] is out of range: {reason}")]
    ArgumentOutOfRange {
        argument: &'static str,
        reason: String,
    },

    /// User code failed while building a service
    #[error("Failed to build service [{service}]: {source}")]
    Runtime {
        service: String,
        #[source]
        source: Arc<dyn std::error::Error + Send + Sync>,
    },
}

impl ContainerError {
    /// Create an Unresolvable error
    #[inline]
    pub fn unresolvable(message: impl Into<String>) -> Self {
        Self::Unresolvable(message.into())
    }

    /// Create a Logic error
    #[inline]
    pub fn logic(message: impl Into<String>) -> Self {
        Self::Logic(message.into())
    }

    /// Create an ArgumentOutOfRange error
    #[inline]
    pub fn out_of_range(argument: &'static str, reason: impl Into<String>) -> Self {
        Self::ArgumentOutOfRange {
            argument,
            reason: reason.into(),
        }
    }

    /// Wrap a failure raised by user code.
    ///
    /// Container errors that travelled through user code (for example a
    /// nested `make` propagated with `?`) are returned unchanged.
    pub fn from_user(service: &str, error: BoxError) -> Self {
        match error.downcast::<ContainerError>() {
            Ok(inner) => *inner,
            Err(source) => Self::Runtime {
                service: service.to_string(),
                source: Arc::from(source),
            },
        }
    }

    /// Service is not bound and no type could be located for it
    pub(crate) fn not_found(service: &str) -> Self {
        Self::Unresolvable(format!(
            "Unresolvable service [{service}]: not bound and no type could be found"
        ))
    }

    /// Circular dependency detected while pushing onto the build stack
    pub(crate) fn circular(service: &str, chain: &[String]) -> Self {
        Self::Logic(format!(
            "Circular dependency detected for [{service}], while building stack [{}]",
            chain.join(", ")
        ))
    }

    /// Mutation attempted on a name that is being torn down by `flush`
    pub(crate) fn flushing() -> Self {
        Self::Logic("Container is flushing, can not do it".to_string())
    }

    /// True for `Unresolvable`
    #[inline]
    pub fn is_unresolvable(&self) -> bool {
        matches!(self, Self::Unresolvable(_))
    }

    /// True for `Logic`
    #[inline]
    pub fn is_logic(&self) -> bool {
        matches!(self, Self::Logic(_))
    }

    /// True for `Runtime`
    #[inline]
    pub fn is_runtime(&self) -> bool {
        matches!(self, Self::Runtime { .. })
    }
}

/// Result type alias for container operations
pub type Result<T> = std::result::Result<T, ContainerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Boom;

    impl std::fmt::Display for Boom {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("boom")
        }
    }

    impl std::error::Error for Boom {}

    #[test]
    fn test_from_user_wraps_foreign_errors() {
        let err = ContainerError::from_user("foo", Box::new(Boom));
        assert!(err.is_runtime());
        assert_eq!(err.to_string(), "Failed to build service [foo]: boom");

        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "boom");
    }

    #[test]
    fn test_from_user_keeps_container_errors() {
        let inner = ContainerError::logic("nested");
        let err = ContainerError::from_user("foo", Box::new(inner));
        assert!(err.is_logic());
        assert_eq!(err.to_string(), "nested");
    }

    #[test]
    fn test_circular_message_names_chain() {
        let err = ContainerError::circular("a", &["a".into(), "b".into()]);
        let message = err.to_string();
        assert!(message.contains("Circular dependency"));
        assert!(message.contains("[a, b]"));
    }
}
