//! End-to-end behaviour of the filesystem and bucket stores.

use std::collections::BTreeSet;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use shelf_store::{
    Bucket, BucketStore, FsStore, IdentityText, InMemoryBucket, Json, SerializerError, Serializer,
    Simple, Store, StoreError, StoreOptions, StoreResult, Tuple,
};

fn key(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

/// Every path below `root`, relative to it.
fn tree(root: &Path) -> BTreeSet<PathBuf> {
    walkdir::WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .map(|entry| {
            let entry = entry.unwrap();
            entry.path().strip_prefix(root).unwrap().to_path_buf()
        })
        .collect()
}

fn tuple_store(root: &Path, mutable: bool) -> FsStore<Tuple, Json<Value>> {
    let options = StoreOptions {
        mutable,
        ..StoreOptions::default()
    };
    FsStore::open(root, Tuple, Json::new(), options).unwrap()
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn nested_entry_lifecycle_restores_tree() {
    let dir = tempfile::tempdir().unwrap();
    let store = tuple_store(dir.path(), true);
    let before = tree(dir.path());
    let k = key(&["a", "b"]);

    store.set(&k, &json!(42)).unwrap();
    assert_eq!(store.get(&k).unwrap(), json!(42));
    assert_eq!(store.len().unwrap(), 1);

    store.delete(&k).unwrap();
    assert!(!store.contains(&k).unwrap());
    assert_eq!(tree(dir.path()), before);
}

#[test]
fn immutable_store_keeps_first_value() {
    let dir = tempfile::tempdir().unwrap();
    let store = tuple_store(dir.path(), false);
    let x = key(&["x"]);

    store.set(&x, &json!(1)).unwrap();
    assert!(matches!(
        store.set(&x, &json!(2)),
        Err(StoreError::PermissionDenied(_))
    ));
    assert_eq!(store.get(&x).unwrap(), json!(1));
    assert!(matches!(store.delete(&x), Err(StoreError::PermissionDenied(_))));
    assert!(store.contains(&x).unwrap());
}

#[test]
fn reopened_store_sees_previous_entries() {
    let dir = tempfile::tempdir().unwrap();
    tuple_store(dir.path(), true)
        .set(&key(&["cfg", "port"]), &json!(8080))
        .unwrap();

    let store = tuple_store(dir.path(), true);
    assert_eq!(store.get(&key(&["cfg", "port"])).unwrap(), json!(8080));
}

// ============================================================================
// Atomic writes
// ============================================================================

/// Writes part of the value, then fails.
struct HalfWriter;

impl Serializer for HalfWriter {
    type Value = String;

    fn dump(&self, value: &String, writer: &mut dyn Write) -> Result<(), SerializerError> {
        writer.write_all(&value.as_bytes()[..value.len() / 2])?;
        Err(SerializerError::Format("gave up halfway".into()))
    }

    fn load(&self, reader: &mut dyn Read) -> Result<String, SerializerError> {
        IdentityText.load(reader)
    }
}

#[test]
fn failed_write_leaves_old_value_and_no_temp_files() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsStore::open(dir.path(), Simple, HalfWriter, StoreOptions::default()).unwrap();
    fs::write(dir.path().join("k"), "original").unwrap();

    assert!(matches!(
        store.set(&"k".into(), &"replacement".into()),
        Err(StoreError::Serialization(_))
    ));
    assert_eq!(store.get(&"k".into()).unwrap(), "original");
    assert_eq!(fs::read_dir(store.scratch_dir()).unwrap().count(), 0);
}

#[test]
fn failed_write_of_new_key_leaves_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsStore::open(dir.path(), Simple, HalfWriter, StoreOptions::default()).unwrap();

    assert!(store.set(&"k".into(), &"value".into()).is_err());
    assert!(!store.contains(&"k".into()).unwrap());
    assert_eq!(store.len().unwrap(), 0);
    assert_eq!(fs::read_dir(store.scratch_dir()).unwrap().count(), 0);
}

#[test]
fn concurrent_writers_never_produce_torn_values() {
    let dir = tempfile::tempdir().unwrap();
    let store: FsStore<Simple, IdentityText> =
        FsStore::open(dir.path(), Simple, IdentityText, StoreOptions::default()).unwrap();
    let k = "shared".to_string();
    let a = "a".repeat(64 * 1024);
    let b = "b".repeat(64 * 1024);
    store.set(&k, &a).unwrap();

    std::thread::scope(|s| {
        for value in [&a, &b] {
            let (store, k) = (&store, &k);
            s.spawn(move || {
                for _ in 0..20 {
                    store.set(k, value).unwrap();
                }
            });
        }
        s.spawn(|| {
            for _ in 0..50 {
                match store.get(&k) {
                    Ok(v) => assert!(v == a || v == b, "torn read of {} bytes", v.len()),
                    Err(StoreError::ConcurrentModification(_)) => {}
                    Err(e) => panic!("unexpected error: {e}"),
                }
            }
        });
    });

    assert_eq!(fs::read_dir(store.scratch_dir()).unwrap().count(), 0);
}

// ============================================================================
// Torn-read detection
// ============================================================================

/// Rewrites the entry it is loading, as another process might.
struct MeddlingReader {
    target: PathBuf,
}

impl Serializer for MeddlingReader {
    type Value = String;

    fn dump(&self, value: &String, writer: &mut dyn Write) -> Result<(), SerializerError> {
        IdentityText.dump(value, writer)
    }

    fn load(&self, reader: &mut dyn Read) -> Result<String, SerializerError> {
        let mtime = fs::metadata(&self.target)?.modified()?;
        let file = fs::OpenOptions::new().write(true).open(&self.target)?;
        file.set_modified(mtime + Duration::from_secs(5))?;
        IdentityText.load(reader)
    }
}

#[test]
fn modification_during_get_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("k");
    fs::write(&target, "value").unwrap();
    let store = FsStore::open(
        dir.path(),
        Simple,
        MeddlingReader {
            target: target.clone(),
        },
        StoreOptions::default(),
    )
    .unwrap();

    assert!(matches!(
        store.get(&"k".into()),
        Err(StoreError::ConcurrentModification(ref p)) if p == &target
    ));
}

// ============================================================================
// Pruning and enumeration
// ============================================================================

#[test]
fn deleting_one_of_two_siblings_prunes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let store = tuple_store(dir.path(), true);
    store.set(&key(&["p", "q", "one"]), &json!(1)).unwrap();
    store.set(&key(&["p", "q", "two"]), &json!(2)).unwrap();

    store.delete(&key(&["p", "q", "one"])).unwrap();
    assert!(dir.path().join("p").join("q").is_dir());

    store.delete(&key(&["p", "q", "two"])).unwrap();
    assert!(!dir.path().join("p").exists());
    assert!(store.scratch_dir().is_dir());
}

#[test]
fn enumeration_never_yields_scratch_entries() {
    let dir = tempfile::tempdir().unwrap();
    let store = tuple_store(dir.path(), true);
    fs::write(store.scratch_dir().join("leftover"), "junk").unwrap();

    let mut expected = BTreeSet::new();
    for i in 0..50 {
        let k = key(&["group", &format!("{}", i % 5), &format!("item{i}")]);
        store.set(&k, &json!(i)).unwrap();
        expected.insert(k);
    }

    let keys: BTreeSet<Vec<String>> = store.keys().collect::<StoreResult<_>>().unwrap();
    assert_eq!(keys, expected);
    assert!(keys.iter().all(|k| k[0] != ".tmp"));
    assert_eq!(store.len().unwrap(), 50);
}

#[test]
fn custom_scratch_dir_is_hidden() {
    let dir = tempfile::tempdir().unwrap();
    let options = StoreOptions {
        scratch_dir: "_inflight".into(),
        ..StoreOptions::default()
    };
    let store: FsStore<Simple, Json<u8>> =
        FsStore::open(dir.path(), Simple, Json::new(), options).unwrap();
    store.set(&"k".into(), &1).unwrap();
    fs::write(dir.path().join("_inflight").join("stray"), "0").unwrap();

    let keys: Vec<String> = store.keys().collect::<StoreResult<_>>().unwrap();
    assert_eq!(keys, vec!["k"]);
    assert!(matches!(
        store.set(&"_inflight".into(), &2),
        Err(StoreError::InvalidKey { .. })
    ));
}

// ============================================================================
// Bucket variant
// ============================================================================

#[test]
fn bucket_store_follows_the_same_contract() {
    let bucket = Arc::new(InMemoryBucket::new("archive"));
    let store = BucketStore::new(bucket.clone(), "runs", Tuple, Json::<Value>::new());
    let k = key(&["a", "b"]);

    store.set(&k, &json!(42)).unwrap();
    assert_eq!(bucket.object("runs/a/b").unwrap(), b"42");
    assert_eq!(store.get(&k).unwrap(), json!(42));
    assert_eq!(store.len().unwrap(), 1);

    store.delete(&k).unwrap();
    assert!(!store.contains(&k).unwrap());
    assert!(bucket.is_empty());
    assert!(matches!(store.delete(&k), Err(StoreError::NotFound(_))));
}

#[test]
fn bucket_and_filesystem_layouts_agree() {
    let dir = tempfile::tempdir().unwrap();
    let fs_store = tuple_store(dir.path(), true);
    let bucket = Arc::new(InMemoryBucket::new("mirror"));
    let bucket_store = BucketStore::new(bucket.clone(), "", Tuple, Json::<Value>::new());

    let k = key(&["x", "y", "z"]);
    fs_store.set(&k, &json!({"n": 1})).unwrap();
    bucket_store.set(&k, &json!({"n": 1})).unwrap();

    let relative = fs_store
        .filename(&k)
        .unwrap()
        .strip_prefix(dir.path())
        .unwrap()
        .to_string_lossy()
        .replace(std::path::MAIN_SEPARATOR, "/");
    assert_eq!(relative, bucket_store.object_name(&k).unwrap());
    assert!(bucket.exists(&relative).unwrap());
}
