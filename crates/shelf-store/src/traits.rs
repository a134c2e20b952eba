use crate::error::{StoreError, StoreResult};

/// Lazy sequence of keys or entries; each item may fail independently.
pub type StoreIter<'a, T> = Box<dyn Iterator<Item = StoreResult<T>> + 'a>;

/// Dictionary-like persistent mapping.
///
/// All implementations must satisfy these invariants:
/// - `set` publishes atomically: a concurrent reader sees the old value or
///   the new one, never a mix.
/// - An immutable store rejects `set` on an existing key and every `delete`
///   with [`StoreError::PermissionDenied`], leaving the entry untouched.
/// - `get` and `delete` on an absent key fail with [`StoreError::NotFound`].
/// - Enumeration never yields entries from the scratch area.
/// - No operation retries on its own; every failure reaches the caller.
pub trait Store {
    type Key;
    type Value;

    /// Check whether an entry exists for `key`.
    fn contains(&self, key: &Self::Key) -> StoreResult<bool>;

    /// Read the value stored for `key`.
    fn get(&self, key: &Self::Key) -> StoreResult<Self::Value>;

    /// Store `value` under `key`, replacing any previous value if mutable.
    fn set(&self, key: &Self::Key, value: &Self::Value) -> StoreResult<()>;

    /// Remove the entry for `key`.
    fn delete(&self, key: &Self::Key) -> StoreResult<()>;

    /// Lazily enumerate every key, in no particular order.
    ///
    /// The sequence is finite and can be restarted by calling `keys` again.
    /// Mutating the store while iterating may skip or repeat entries.
    fn keys(&self) -> StoreIter<'_, Self::Key>;

    /// Read `key`, falling back to `default` when it is absent.
    fn get_or(&self, key: &Self::Key, default: Self::Value) -> StoreResult<Self::Value> {
        match self.get(key) {
            Ok(value) => Ok(value),
            Err(StoreError::NotFound(_)) => Ok(default),
            Err(e) => Err(e),
        }
    }

    /// Lazily enumerate every value.
    fn values(&self) -> StoreIter<'_, Self::Value> {
        Box::new(self.keys().map(move |key| self.get(&key?)))
    }

    /// Lazily enumerate every `(key, value)` pair.
    fn items(&self) -> StoreIter<'_, (Self::Key, Self::Value)> {
        Box::new(self.keys().map(move |key| {
            let key = key?;
            let value = self.get(&key)?;
            Ok((key, value))
        }))
    }

    /// Count the entries by walking the whole store. O(n), never cached.
    fn len(&self) -> StoreResult<usize> {
        self.keys().try_fold(0, |n, key| key.map(|_| n + 1))
    }

    /// Returns `true` if the store holds no entries.
    fn is_empty(&self) -> StoreResult<bool> {
        match self.keys().next() {
            None => Ok(true),
            Some(key) => key.map(|_| false),
        }
    }

    /// Apply `set` for each pair in order.
    ///
    /// Not atomic across the batch: on failure, earlier pairs stay written
    /// and later ones are not attempted.
    fn update<I>(&self, pairs: I) -> StoreResult<()>
    where
        I: IntoIterator<Item = (Self::Key, Self::Value)>,
        Self: Sized,
    {
        for (key, value) in pairs {
            self.set(&key, &value)?;
        }
        Ok(())
    }
}
