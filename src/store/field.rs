use std::any::{self, Any, TypeId};
use std::borrow::{Borrow, Cow};
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

/// Bound satisfied by every type that can live in a store field.
///
/// Change detection compares values with `PartialEq`, and `Debug` is used
/// when state changes are logged.
pub trait FieldValue: Clone + PartialEq + fmt::Debug + 'static {}

impl<T: Clone + PartialEq + fmt::Debug + 'static> FieldValue for T {}

/// The name identifying a field within one record.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldName(Cow<'static, str>);

impl FieldName {
    /// Create a name from a string literal. Usable in `const` context.
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// The name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl Borrow<str> for FieldName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for FieldName {
    fn from(name: &'static str) -> Self {
        Self::from_static(name)
    }
}

impl From<String> for FieldName {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name))
    }
}

/// A typed key addressing one field of a [`Record`](super::Record).
///
/// The value type is part of the key, so reads and writes through the same
/// `Field` always agree on the type stored under its name.
///
/// # Examples
///
/// ```
/// use trackstore::{Field, Store};
///
/// const AGE: Field<u32> = Field::new("age");
///
/// let store = Store::builder().field(&AGE, 0).build();
/// store.set(&AGE, 31);
/// assert_eq!(store.get(&AGE), Some(31));
/// ```
pub struct Field<T> {
    name: FieldName,
    _value: PhantomData<fn() -> T>,
}

impl<T> Field<T> {
    /// Declare a field with a static name.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name: FieldName::from_static(name),
            _value: PhantomData,
        }
    }

    /// Declare a field whose name is only known at runtime.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: FieldName::from(name.into()),
            _value: PhantomData,
        }
    }

    pub fn name(&self) -> &FieldName {
        &self.name
    }
}

impl<T> Clone for Field<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            _value: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Field<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("type", &any::type_name::<T>())
            .finish()
    }
}

/// Object-safe face of a [`FieldValue`].
trait ErasedValue: fmt::Debug {
    fn as_any(&self) -> &dyn Any;
    fn same_as(&self, other: &dyn ErasedValue) -> bool;
    fn value_type(&self) -> TypeId;
    fn type_name(&self) -> &'static str;
}

impl<T: FieldValue> ErasedValue for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn same_as(&self, other: &dyn ErasedValue) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| self == other)
    }

    fn value_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn type_name(&self) -> &'static str {
        any::type_name::<T>()
    }
}

/// A type-erased, cheaply cloneable field value.
#[derive(Clone)]
pub(crate) struct Value(Rc<dyn ErasedValue>);

impl Value {
    pub(crate) fn new<T: FieldValue>(value: T) -> Self {
        Self(Rc::new(value))
    }

    pub(crate) fn downcast_ref<T: FieldValue>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }

    pub(crate) fn value_type(&self) -> TypeId {
        self.0.value_type()
    }

    pub(crate) fn type_name(&self) -> &'static str {
        self.0.type_name()
    }

    /// Whether writing `other` over `self` would be a no-op.
    pub(crate) fn is_same(&self, other: &Value) -> bool {
        Rc::ptr_eq(&self.0, &other.0) || self.0.same_as(&*other.0)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}
