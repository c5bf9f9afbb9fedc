use std::any::{self, Any};
use std::fmt;

use crate::{PoolError, Result};

const EMPTY: &str = "<empty>";

/// A move-only box holding a value of any single concrete type.
///
/// The value can only be taken back out as the type it was stored with.
/// A default `AnyValue` holds nothing and is distinguishable from any
/// real payload via [`AnyValue::is_empty`].
#[derive(Default)]
pub struct AnyValue {
    inner: Option<Stored>,
}

struct Stored {
    value: Box<dyn Any + Send>,
    type_name: &'static str,
}

impl AnyValue {
    /// Boxes `value`, remembering its type.
    pub fn new<T: Any + Send>(value: T) -> Self {
        AnyValue {
            inner: Some(Stored {
                value: Box::new(value),
                type_name: any::type_name::<T>(),
            }),
        }
    }

    /// Returns a box holding no value.
    pub fn empty() -> Self {
        AnyValue::default()
    }

    /// Returns `true` if no value is stored.
    pub fn is_empty(&self) -> bool {
        self.inner.is_none()
    }

    /// Name of the stored type, or `"<empty>"`.
    pub fn type_name(&self) -> &'static str {
        self.inner.as_ref().map_or(EMPTY, |s| s.type_name)
    }

    /// Returns `true` if the stored value is a `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.inner.as_ref().is_some_and(|s| s.value.is::<T>())
    }

    /// Takes the value out as a `T`.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::TypeMismatch`] if `T` is not the stored type or
    /// the box is empty. Asking for the wrong type is a programming error;
    /// callers are expected to propagate it rather than recover.
    pub fn cast<T: Any>(self) -> Result<T> {
        let mismatch = |found| PoolError::TypeMismatch {
            expected: any::type_name::<T>(),
            found,
        };
        let stored = self.inner.ok_or_else(|| mismatch(EMPTY))?;
        let found = stored.type_name;
        stored
            .value
            .downcast::<T>()
            .map(|b| *b)
            .map_err(|_| mismatch(found))
    }
}

impl fmt::Debug for AnyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyValue")
            .field("type", &self.type_name())
            .finish()
    }
}
