use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Typed, optionally-qualified identity for an externally supplied value.
///
/// Two keys are equal iff both the value type and the qualifier compare
/// equal. An unqualified key (`Key::of()`) and a qualified key over the same
/// type are distinct identities.
pub struct Key<T> {
  qualifier: Option<String>,
  _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> Key<T> {
  /// An unqualified key for `T`.
  pub fn of() -> Self {
    Self {
      qualifier: None,
      _marker: PhantomData,
    }
  }

  /// A key for `T` discriminated by `qualifier`, so that two inputs of the
  /// same type can be required side by side.
  pub fn qualified(qualifier: impl Into<String>) -> Self {
    Self {
      qualifier: Some(qualifier.into()),
      _marker: PhantomData,
    }
  }

  /// The qualifier, if any.
  pub fn qualifier(&self) -> Option<&str> {
    self.qualifier.as_deref()
  }

  /// The type-erased form of this key, used in aggregate key sets and
  /// error messages.
  pub fn erased(&self) -> InputKey {
    InputKey {
      type_id: TypeId::of::<T>(),
      type_name: std::any::type_name::<T>(),
      qualifier: self.qualifier.clone(),
    }
  }
}

impl<T> Clone for Key<T> {
  fn clone(&self) -> Self {
    Self {
      qualifier: self.qualifier.clone(),
      _marker: PhantomData,
    }
  }
}

impl<T> PartialEq for Key<T> {
  fn eq(&self, other: &Self) -> bool {
    self.qualifier == other.qualifier
  }
}

impl<T> Eq for Key<T> {}

impl<T> Hash for Key<T> {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.qualifier.hash(state);
  }
}

impl<T> fmt::Debug for Key<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Key")
      .field("type", &std::any::type_name::<T>())
      .field("qualifier", &self.qualifier)
      .finish()
  }
}

impl<T: Send + Sync + 'static> From<&Key<T>> for InputKey {
  fn from(key: &Key<T>) -> Self {
    key.erased()
  }
}

/// Type-erased key: the (type, qualifier) pair without the compile-time type
/// parameter. `Graph::input_keys()` spans many value types, so its elements
/// are erased keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InputKey {
  type_id: TypeId,
  type_name: &'static str,
  qualifier: Option<String>,
}

impl InputKey {
  /// An unqualified erased key for `T`.
  pub fn of<T: Send + Sync + 'static>() -> Self {
    Key::<T>::of().erased()
  }

  /// The `TypeId` of the value type.
  pub fn type_id(&self) -> TypeId {
    self.type_id
  }

  /// The value type's name, for diagnostics.
  pub fn type_name(&self) -> &'static str {
    self.type_name
  }

  /// The qualifier, if any.
  pub fn qualifier(&self) -> Option<&str> {
    self.qualifier.as_deref()
  }
}

impl fmt::Display for InputKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.qualifier {
      Some(qualifier) => write!(f, "{}@{}", self.type_name, qualifier),
      None => write!(f, "{}", self.type_name),
    }
  }
}
