//! Store-backed memoization.
//!
//! [`Memoize`] wraps a fallible function of a store key. The first call for a
//! key runs the function and stores its outcome; later calls, including calls
//! from other processes sharing the same store, are answered from the store.

use std::fmt;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{Setting, StoreOptions};
use crate::error::{StoreError, StoreResult};
use crate::fs::FsStore;
use crate::serializer::Json;
use crate::traits::Store;
use crate::transform::KeyTransformer;

/// A stored function result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome<R> {
    /// The function returned this value.
    Returned(R),
    /// The function failed with this message.
    Failed(String),
}

impl<R> Outcome<R> {
    pub fn into_result(self) -> Result<R, String> {
        match self {
            Self::Returned(value) => Ok(value),
            Self::Failed(message) => Err(message),
        }
    }
}

/// Errors from [`Memoize::call`].
#[derive(Debug, thiserror::Error)]
pub enum CallError<E> {
    /// The wrapped function failed on this call.
    #[error("function failed: {0}")]
    Function(#[source] E),

    /// A failure recorded by an earlier call was replayed from the store.
    #[error("cached failure: {0}")]
    Cached(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A function whose results are kept in a [`Store`].
pub struct Memoize<St, F> {
    store: St,
    func: F,
    cache_failures: bool,
}

impl<St, F> Memoize<St, F> {
    /// Wrap `func`, keeping its results in `store`. Failures are not cached.
    pub fn new(store: St, func: F) -> Self {
        Self {
            store,
            func,
            cache_failures: false,
        }
    }

    /// Also record failures, replaying them as [`CallError::Cached`].
    pub fn cache_failures(mut self, cache_failures: bool) -> Self {
        self.cache_failures = cache_failures;
        self
    }

    pub fn store(&self) -> &St {
        &self.store
    }
}

impl<St: Store, F> Memoize<St, F> {
    /// Return the stored outcome for `key`, running the function if there is
    /// none yet.
    pub fn call<R, E>(&self, key: &St::Key) -> Result<R, CallError<E>>
    where
        St: Store<Value = Outcome<R>>,
        St::Key: fmt::Debug,
        F: Fn(&St::Key) -> Result<R, E>,
        E: fmt::Display,
    {
        match self.store.get(key) {
            Ok(outcome) => {
                debug!(key = ?key, "memoized outcome found");
                return outcome.into_result().map_err(CallError::Cached);
            }
            Err(StoreError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }

        match (self.func)(key) {
            Ok(value) => {
                let outcome = Outcome::Returned(value);
                self.store.set(key, &outcome)?;
                outcome.into_result().map_err(CallError::Cached)
            }
            Err(e) => {
                if self.cache_failures {
                    if let Err(store_err) = self.store.set(key, &Outcome::Failed(e.to_string())) {
                        warn!(key = ?key, error = %store_err, "failed to record failure");
                    }
                }
                Err(CallError::Function(e))
            }
        }
    }
}

impl<St: fmt::Debug, F> fmt::Debug for Memoize<St, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memoize")
            .field("store", &self.store)
            .field("cache_failures", &self.cache_failures)
            .finish()
    }
}

/// Memoize `func` in a JSON filesystem store at `dir`.
///
/// `dir` is resolved once, here; pass [`Setting::Computed`] to derive it from
/// the environment at construction time.
pub fn on_disk<T, R, E, F>(
    dir: Setting<PathBuf>,
    transformer: T,
    func: F,
) -> StoreResult<Memoize<FsStore<T, Json<Outcome<R>>>, F>>
where
    T: KeyTransformer,
    R: Serialize + DeserializeOwned,
    F: Fn(&T::Key) -> Result<R, E>,
{
    let store = FsStore::open(dir.resolve(), transformer, Json::new(), StoreOptions::default())?;
    Ok(Memoize::new(store, func))
}
