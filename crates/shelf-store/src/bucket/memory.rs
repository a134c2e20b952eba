use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::RwLock;

use super::{Bucket, NameIter};

/// In-memory, BTreeMap-based bucket.
///
/// Intended for tests and embedding. Objects are held behind a `RwLock` and
/// copied on every transfer. Listings are sorted by name.
pub struct InMemoryBucket {
    name: String,
    objects: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryBucket {
    /// Create a new empty bucket.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            objects: RwLock::new(BTreeMap::new()),
        }
    }

    /// Create a bucket pre-populated with `objects`.
    pub fn with_objects<I, K, V>(name: impl Into<String>, objects: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Vec<u8>>,
    {
        let bucket = Self::new(name);
        {
            let mut map = bucket.objects.write().expect("lock poisoned");
            for (k, v) in objects {
                map.insert(k.into(), v.into());
            }
        }
        bucket
    }

    /// Number of objects currently stored.
    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the bucket is empty.
    pub fn is_empty(&self) -> bool {
        self.objects.read().expect("lock poisoned").is_empty()
    }

    /// Raw contents of the object `name`.
    pub fn object(&self, name: &str) -> Option<Vec<u8>> {
        self.objects.read().expect("lock poisoned").get(name).cloned()
    }
}

impl Bucket for InMemoryBucket {
    fn name(&self) -> &str {
        &self.name
    }

    fn put_file(&self, name: &str, source: &Path) -> io::Result<()> {
        let bytes = fs::read(source)?;
        let mut map = self.objects.write().expect("lock poisoned");
        map.insert(name.to_string(), bytes);
        Ok(())
    }

    fn fetch_to(&self, name: &str, dest: &Path) -> io::Result<bool> {
        let bytes = match self.object(name) {
            Some(bytes) => bytes,
            None => return Ok(false),
        };
        fs::write(dest, bytes)?;
        Ok(true)
    }

    fn exists(&self, name: &str) -> io::Result<bool> {
        let map = self.objects.read().expect("lock poisoned");
        Ok(map.contains_key(name))
    }

    fn list(&self, prefix: &str) -> io::Result<NameIter<'_>> {
        // Snapshot the matching names so the lock is not held while the
        // caller iterates.
        let map = self.objects.read().expect("lock poisoned");
        let names: Vec<String> = map
            .range(prefix.to_string()..)
            .map(|(name, _)| name)
            .take_while(|name| name.starts_with(prefix))
            .cloned()
            .collect();
        Ok(Box::new(names.into_iter().map(Ok)))
    }

    fn delete(&self, name: &str) -> io::Result<bool> {
        let mut map = self.objects.write().expect("lock poisoned");
        Ok(map.remove(name).is_some())
    }
}

impl std::fmt::Debug for InMemoryBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBucket")
            .field("name", &self.name)
            .field("object_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(bucket: &InMemoryBucket, prefix: &str) -> Vec<String> {
        bucket
            .list(prefix)
            .unwrap()
            .collect::<io::Result<Vec<_>>>()
            .unwrap()
    }

    // -----------------------------------------------------------------------
    // Transfers
    // -----------------------------------------------------------------------

    #[test]
    fn put_then_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        fs::write(&src, b"payload").unwrap();

        let bucket = InMemoryBucket::new("test");
        bucket.put_file("a/b", &src).unwrap();
        assert!(bucket.fetch_to("a/b", &dst).unwrap());
        assert_eq!(fs::read(&dst).unwrap(), b"payload");
    }

    #[test]
    fn put_replaces_existing_object() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        fs::write(&src, b"new").unwrap();

        let bucket = InMemoryBucket::with_objects("test", [("k", b"old".to_vec())]);
        bucket.put_file("k", &src).unwrap();
        assert_eq!(bucket.object("k").unwrap(), b"new");
        assert_eq!(bucket.len(), 1);
    }

    #[test]
    fn fetch_absent_returns_false_and_leaves_dest() {
        let dir = tempfile::tempdir().unwrap();
        let dst = dir.path().join("dst");
        let bucket = InMemoryBucket::new("test");
        assert!(!bucket.fetch_to("nope", &dst).unwrap());
        assert!(!dst.exists());
    }

    #[test]
    fn put_missing_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let bucket = InMemoryBucket::new("test");
        let err = bucket.put_file("k", &dir.path().join("missing")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(bucket.is_empty());
    }

    // -----------------------------------------------------------------------
    // Listing and deletion
    // -----------------------------------------------------------------------

    #[test]
    fn list_filters_by_prefix_in_order() {
        let bucket = InMemoryBucket::with_objects(
            "test",
            [
                ("contracts/b", "1"),
                ("contracts/a", "2"),
                ("other/c", "3"),
                ("contractsx", "4"),
            ],
        );
        assert_eq!(names(&bucket, "contracts/"), vec!["contracts/a", "contracts/b"]);
        assert_eq!(names(&bucket, "").len(), 4);
        assert!(names(&bucket, "zzz").is_empty());
    }

    #[test]
    fn delete_reports_presence() {
        let bucket = InMemoryBucket::with_objects("test", [("k", "v")]);
        assert!(bucket.exists("k").unwrap());
        assert!(bucket.delete("k").unwrap());
        assert!(!bucket.delete("k").unwrap());
        assert!(!bucket.exists("k").unwrap());
    }

    #[test]
    fn debug_shows_name_and_count() {
        let bucket = InMemoryBucket::with_objects("aoeu", [("k", "v")]);
        let debug = format!("{bucket:?}");
        assert!(debug.contains("aoeu"));
        assert!(debug.contains("object_count: 1"));
    }
}
