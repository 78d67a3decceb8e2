use std::fmt;

use crate::store::{Field, FieldValue, Store};

/// A new value for a field: either given outright or computed from the
/// value stored at the moment the action is applied.
pub enum SetAction<T> {
    Value(T),
    Update(Box<dyn FnOnce(&T) -> T>),
}

impl<T> SetAction<T> {
    pub fn update(f: impl FnOnce(&T) -> T + 'static) -> Self {
        Self::Update(Box::new(f))
    }
}

impl<T> From<T> for SetAction<T> {
    fn from(value: T) -> Self {
        Self::Value(value)
    }
}

impl<T: fmt::Debug> fmt::Debug for SetAction<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Update(_) => f.write_str("Update(..)"),
        }
    }
}

/// A write-only handle to one field.
///
/// Creating a setter reads nothing and subscribes to nothing, so the
/// consumer holding it is never re-evaluated on its account.
///
/// # Examples
///
/// ```
/// use trackstore::{Field, Store};
///
/// const COUNT: Field<i32> = Field::new("count");
///
/// let store = Store::builder().field(&COUNT, 0).build();
/// let set = store.bind_setter(&COUNT);
///
/// set.update(|count| count + 1);
/// set.update(|count| count + 1);
/// assert_eq!(store.get(&COUNT), Some(2));
///
/// set.set(0);
/// assert_eq!(store.get(&COUNT), Some(0));
/// ```
pub struct Setter<T> {
    store: Store,
    field: Field<T>,
}

impl<T: FieldValue> Setter<T> {
    pub(crate) fn new(store: Store, field: Field<T>) -> Self {
        Self { store, field }
    }

    /// Store a literal value. Returns whether the field changed.
    pub fn set(&self, value: T) -> bool {
        self.store.set(&self.field, value)
    }

    /// Store a value computed from the one stored right now.
    pub fn update(&self, f: impl FnOnce(&T) -> T) -> bool {
        self.store.update(&self.field, f)
    }

    /// Apply either form of write.
    pub fn dispatch(&self, action: impl Into<SetAction<T>>) -> bool {
        match action.into() {
            SetAction::Value(value) => self.set(value),
            SetAction::Update(f) => self.update(f),
        }
    }

    pub fn field(&self) -> &Field<T> {
        &self.field
    }
}

impl<T> Clone for Setter<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            field: self.field.clone(),
        }
    }
}

impl<T> fmt::Debug for Setter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Setter")
            .field("field", self.field.name())
            .finish()
    }
}
