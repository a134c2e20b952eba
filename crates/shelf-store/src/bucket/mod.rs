//! Object-bucket backend.
//!
//! A bucket is a flat namespace of named byte objects. The store lays keys
//! out below a prefix using the same segment codec as the filesystem layout,
//! so `prefix/a/b` holds the value for a tuple key `("a", "b")`. Buckets have
//! no directories, so there is nothing to prune after a delete.

pub mod memory;
pub mod store;

use std::io;
use std::path::Path;

pub use memory::InMemoryBucket;
pub use store::BucketStore;

/// Lazy listing of object names.
pub type NameIter<'a> = Box<dyn Iterator<Item = io::Result<String>> + 'a>;

/// The narrow set of object-store capabilities the store relies on.
///
/// Transfers go through local files so that values never need to be held in
/// memory in full. Implementations must make `put_file` replace any existing
/// object in one step.
pub trait Bucket: Send + Sync {
    /// Name of the bucket, used in diagnostics.
    fn name(&self) -> &str;

    /// Create or replace the object `name` with the contents of `source`.
    fn put_file(&self, name: &str, source: &Path) -> io::Result<()>;

    /// Copy the object `name` into `dest`. Returns `false` if it is absent.
    fn fetch_to(&self, name: &str, dest: &Path) -> io::Result<bool>;

    /// Check whether the object `name` exists.
    fn exists(&self, name: &str) -> io::Result<bool>;

    /// List every object name starting with `prefix`.
    fn list(&self, prefix: &str) -> io::Result<NameIter<'_>>;

    /// Delete the object `name`. Returns `false` if it was absent.
    fn delete(&self, name: &str) -> io::Result<bool>;
}
