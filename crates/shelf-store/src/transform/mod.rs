//! Key transformers: reversible mappings between keys and storage paths.
//!
//! Every transformer must be a two-sided inverse over the keys a store will
//! receive: `from_path(to_path(k)) == k`. Enumeration runs `from_path` over
//! every stored path, so a lossy transformer corrupts iteration.
//!
//! - [`Simple`] -- one string, one segment
//! - [`Tuple`] -- one segment per key component
//! - [`Base64`] -- the whole key as one URL-safe base64 segment
//! - [`Delimited`] -- split and join on a configurable delimiter
//! - [`Archive`] -- wraps another transformer with a date segment

pub mod archive;
pub mod encoded;
pub mod delimited;

use std::fmt;

use crate::codec::{PathCodec, SEPARATOR};
use crate::error::{StoreError, StoreResult};

pub use archive::{Archive, Position};
pub use encoded::Base64;
pub use delimited::{backslash, slash, Delimited};

/// Bidirectional mapping between a key and an ordered list of path segments.
pub trait KeyTransformer {
    /// The key type callers use with the store.
    type Key: fmt::Debug;

    /// Encode a key as path segments. Must never return an empty list.
    fn to_path(&self, key: &Self::Key) -> StoreResult<Vec<String>>;

    /// Decode path segments back into a key.
    fn from_path(&self, path: &[String]) -> StoreResult<Self::Key>;
}

impl<T: KeyTransformer + ?Sized> KeyTransformer for &T {
    type Key = T::Key;

    fn to_path(&self, key: &Self::Key) -> StoreResult<Vec<String>> {
        (**self).to_path(key)
    }

    fn from_path(&self, path: &[String]) -> StoreResult<Self::Key> {
        (**self).from_path(path)
    }
}

/// Single-segment identity transformer. Keys must not contain `/`.
///
/// Decoding a multi-segment path joins it with `/`, so entries placed in
/// subdirectories by other tools still enumerate as `"a/b/c"`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Simple;

impl KeyTransformer for Simple {
    type Key = String;

    fn to_path(&self, key: &String) -> StoreResult<Vec<String>> {
        if key.is_empty() {
            return Err(StoreError::invalid_key(key, "key must not be empty"));
        }
        if key.contains(SEPARATOR) {
            return Err(StoreError::invalid_key(
                key,
                format!("key must not contain {SEPARATOR:?}"),
            ));
        }
        Ok(vec![key.clone()])
    }

    fn from_path(&self, path: &[String]) -> StoreResult<String> {
        if path.is_empty() {
            return Err(StoreError::invalid_key(path, "path must not be empty"));
        }
        Ok(PathCodec::default().join(path))
    }
}

/// Each key component becomes one directory level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Tuple;

impl KeyTransformer for Tuple {
    type Key = Vec<String>;

    fn to_path(&self, key: &Vec<String>) -> StoreResult<Vec<String>> {
        if key.is_empty() {
            return Err(StoreError::invalid_key(key, "key must not be empty"));
        }
        for component in key {
            if component.is_empty() {
                return Err(StoreError::invalid_key(
                    key,
                    "key components must not be empty",
                ));
            }
            if component.contains(SEPARATOR) {
                return Err(StoreError::invalid_key(
                    key,
                    format!("component {component:?} contains {SEPARATOR:?}"),
                ));
            }
        }
        Ok(key.clone())
    }

    fn from_path(&self, path: &[String]) -> StoreResult<Vec<String>> {
        if path.is_empty() {
            return Err(StoreError::invalid_key(path, "path must not be empty"));
        }
        Ok(path.to_vec())
    }
}
