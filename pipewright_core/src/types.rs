//! Type descriptors and type-erased values
//!
//! Stages are written against concrete Rust types, but a pipeline has to hold
//! stages with different input and output types side by side. [`TypeInfo`]
//! describes a monomorphised type so that adjacent stages can be compared, and
//! [`Value`] carries one datum across the erased boundary.

use std::any::{Any, TypeId};
use std::fmt;

/// Descriptor of a concrete type
///
/// Equality only looks at the `TypeId`; the name is kept for diagnostics.
#[derive(Clone, Copy)]
pub struct TypeInfo {
    id: TypeId,
    name: &'static str,
}

impl TypeInfo {
    /// Describe `T`
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The `TypeId` of the described type
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified name of the described type
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the described type is `T`
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeInfo {}

impl std::hash::Hash for TypeInfo {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Bound satisfied by every type that can flow through a pipeline
pub trait Datum: Any + Clone + Send + Sync {}

impl<T: Any + Clone + Send + Sync> Datum for T {}

/// Object-safe view of a [`Datum`]
trait Payload: Any + Send + Sync {
    fn clone_box(&self) -> Box<dyn Payload>;
    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send + Sync>;
    fn type_info(&self) -> TypeInfo;
}

impl<T: Datum> Payload for T {
    fn clone_box(&self) -> Box<dyn Payload> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send + Sync> {
        self
    }

    fn type_info(&self) -> TypeInfo {
        TypeInfo::of::<T>()
    }
}

/// A type-erased, cloneable datum
pub struct Value(Box<dyn Payload>);

impl Value {
    /// Erase `value`
    pub fn new<T: Datum>(value: T) -> Self {
        Self(Box::new(value))
    }

    /// Descriptor of the contained type
    pub fn type_info(&self) -> TypeInfo {
        self.0.type_info()
    }

    /// Whether the contained value is a `T`
    pub fn is<T: Datum>(&self) -> bool {
        self.0.as_any().is::<T>()
    }

    /// Borrow the contained value as `T`
    pub fn downcast_ref<T: Datum>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }

    /// Take the contained value as `T`, handing the value back on mismatch
    pub fn downcast<T: Datum>(self) -> std::result::Result<T, Value> {
        if !self.is::<T>() {
            return Err(self);
        }
        match self.0.into_any().downcast::<T>() {
            Ok(boxed) => Ok(*boxed),
            Err(_) => unreachable!("type checked above"),
        }
    }
}

impl Clone for Value {
    fn clone(&self) -> Self {
        Self(self.0.clone_box())
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Value")
            .field("type", &self.type_info())
            .finish_non_exhaustive()
    }
}
