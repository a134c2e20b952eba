//! Persistent dictionaries backed by a directory tree or an object bucket.
//!
//! A store maps structured keys to files: each key is encoded by a
//! [`KeyTransformer`] into path segments, and each value is written by a
//! [`Serializer`] into the file at that path. The store behaves like a
//! dictionary that survives restarts and can be shared between processes.
//!
//! # Backends
//!
//! Both backends implement the [`Store`] trait:
//!
//! - [`FsStore`] -- one file per key below a root directory
//! - [`BucketStore`] -- one object per key below a prefix in a [`Bucket`]
//!
//! # Design Rules
//!
//! 1. Writes go to a scratch file first and are published with one rename,
//!    so readers see the old value or the new one, never a mix.
//! 2. Reads compare the entry's modification time before and after loading
//!    and fail with [`StoreError::ConcurrentModification`] on any change.
//! 3. An immutable store never overwrites or deletes an entry.
//! 4. Deleting an entry removes the directories it leaves empty, up to but
//!    not including the root.
//! 5. Enumeration is lazy and never yields the scratch area.
//! 6. No operation retries; every failure reaches the caller.

pub mod bucket;
pub mod codec;
pub mod config;
pub mod error;
pub mod fs;
pub mod memo;
pub mod serializer;
pub mod traits;
pub mod transform;

// Re-export primary types at crate root for ergonomic imports.
pub use bucket::{Bucket, BucketStore, InMemoryBucket};
pub use codec::{PathCodec, SEPARATOR};
pub use config::{Setting, SerializerKind, StoreConfig, StoreOptions, TransformerKind};
pub use error::{SerializerError, StoreError, StoreResult};
pub use fs::{AtomicWriter, Entries, FsStore, Keys};
pub use memo::{CallError, Memoize, Outcome};
pub use serializer::{Bincode, IdentityBytes, IdentityText, Json, Serializer};
pub use traits::{Store, StoreIter};
pub use transform::{
    backslash, slash, Archive, Base64, Delimited, KeyTransformer, Position, Simple, Tuple,
};
