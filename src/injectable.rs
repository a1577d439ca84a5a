//! Injectable values and service naming
//!
//! Everything the container hands out is a type-erased [`Value`]. Any
//! `Send + Sync + 'static` type can be stored in one.

use std::any::{Any, TypeId};
use std::sync::Arc;

/// A resolved service instance, shared and type-erased.
pub type Value = Arc<dyn Any + Send + Sync>;

/// Marker trait for types that can be stored in the container.
///
/// This is automatically implemented for all types that are `Send + Sync + 'static`.
/// You never need to implement this manually.
///
/// # Examples
///
/// ```rust
/// use service_container::Injectable;
///
/// struct MyService {
///     name: String,
/// }
///
/// fn assert_injectable<T: Injectable>() {}
/// assert_injectable::<MyService>();
/// ```
pub trait Injectable: Send + Sync + 'static {
    /// Returns the TypeId of this type (for internal use)
    #[inline]
    fn type_id_of() -> TypeId
    where
        Self: Sized,
    {
        TypeId::of::<Self>()
    }

    /// Returns the service name this type is resolved under
    #[inline]
    fn service_name() -> String
    where
        Self: Sized,
    {
        service_name_of::<Self>()
    }
}

// Blanket implementation - everything that's Send + Sync + 'static is Injectable
impl<T: Send + Sync + 'static> Injectable for T {}

/// Service name used for a Rust type.
///
/// Path separators are rewritten to `.` because `:` is reserved in service
/// names, so `app::db::Pool` becomes `app.db.Pool`.
///
/// ```rust
/// use service_container::service_name_of;
///
/// assert_eq!(service_name_of::<String>(), "alloc.string.String");
/// ```
pub fn service_name_of<T: ?Sized + 'static>() -> String {
    type_name_to_service(std::any::type_name::<T>())
}

#[inline]
pub(crate) fn type_name_to_service(type_name: &str) -> String {
    type_name.replace("::", ".")
}

/// Wrap a value into a [`Value`].
#[inline]
pub fn value<T: Injectable>(instance: T) -> Value {
    Arc::new(instance)
}

/// TypeId of the concrete value stored behind a [`Value`].
#[inline]
pub(crate) fn value_type_id(value: &Value) -> TypeId {
    (**value).type_id()
}

/// Address of the shared allocation, used to recognise the same instance.
#[inline]
pub(crate) fn value_addr(value: &Value) -> usize {
    Arc::as_ptr(value) as *const () as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Local;

    #[test]
    fn test_service_name_has_no_reserved_chars() {
        let name = service_name_of::<Local>();
        assert!(!name.contains(':'));
        assert!(name.ends_with(".Local"));
        assert_eq!(Local::service_name(), name);
    }

    #[test]
    fn test_value_type_id_sees_through_arc() {
        let v = value(42u32);
        assert_eq!(value_type_id(&v), TypeId::of::<u32>());
        assert_ne!(value_type_id(&v), TypeId::of::<Value>());
    }

    #[test]
    fn test_value_addr_identity() {
        let a = value(String::from("a"));
        let b = Arc::clone(&a);
        let c = value(String::from("a"));
        assert_eq!(value_addr(&a), value_addr(&b));
        assert_ne!(value_addr(&a), value_addr(&c));
    }
}
