//! Filesystem-backed store.
//!
//! Layout: one file per key at `root/<segment>/<segment>/...`, plus one
//! scratch directory (default `.tmp`) directly below the root that holds
//! in-flight temporary files and is hidden from enumeration.

pub mod guard;
pub mod prune;
pub mod walk;
pub mod writer;

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf, MAIN_SEPARATOR};

use tracing::{debug, warn};

use crate::codec::{PathCodec, SEPARATOR};
use crate::config::{expand_home, StoreOptions};
use crate::error::{StoreError, StoreResult};
use crate::serializer::{Json, Serializer};
use crate::traits::{Store, StoreIter};
use crate::transform::{KeyTransformer, Simple};

pub use guard::read_guarded;
pub use prune::prune_empty_dirs;
pub use walk::{Entries, Keys};
pub use writer::AtomicWriter;

/// A directory tree behaving like a persistent dictionary.
pub struct FsStore<T, S> {
    root: PathBuf,
    scratch: PathBuf,
    scratch_name: String,
    mutable: bool,
    transformer: T,
    serializer: S,
    writer: AtomicWriter,
}

impl<V> FsStore<Simple, Json<V>> {
    /// Mutable store at `root` with string keys and JSON values.
    pub fn with_defaults(root: impl AsRef<Path>) -> StoreResult<Self> {
        Self::open(root, Simple, Json::new(), StoreOptions::default())
    }
}

impl<T, S> FsStore<T, S> {
    /// Open (or create) a store rooted at `root`. A leading `~` expands to
    /// the home directory.
    pub fn open(
        root: impl AsRef<Path>,
        transformer: T,
        serializer: S,
        options: StoreOptions,
    ) -> StoreResult<Self> {
        options.validate()?;
        let root = expand_home(root.as_ref());
        let scratch = root.join(&options.scratch_dir);
        fs::create_dir_all(&scratch).map_err(|e| StoreError::io(e, &scratch))?;

        debug!(root = %root.display(), mutable = options.mutable, "opened store");
        Ok(Self {
            writer: AtomicWriter::new(&scratch, options.mutable),
            root,
            scratch,
            scratch_name: options.scratch_dir,
            mutable: options.mutable,
            transformer,
            serializer,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding in-flight temporary files.
    pub fn scratch_dir(&self) -> &Path {
        &self.scratch
    }

    pub fn is_mutable(&self) -> bool {
        self.mutable
    }

    pub fn transformer(&self) -> &T {
        &self.transformer
    }

    pub fn serializer(&self) -> &S {
        &self.serializer
    }
}

impl<T: KeyTransformer, S> FsStore<T, S> {
    /// Storage path of `key`, validated for use on the filesystem.
    pub fn filename(&self, key: &T::Key) -> StoreResult<PathBuf> {
        let segments = self.transformer.to_path(key)?;
        if segments.is_empty() {
            return Err(StoreError::invalid_key(key, "key maps to an empty path"));
        }

        let codec = PathCodec::default();
        let mut path = self.root.clone();
        for (i, segment) in segments.iter().enumerate() {
            if i == 0 && codec.is_root_marker(segment) {
                return Err(StoreError::invalid_key(
                    key,
                    "absolute paths are not allowed; keys are relative to the store root",
                ));
            }
            if i == 0 && *segment == self.scratch_name {
                return Err(StoreError::invalid_key(
                    key,
                    format!("{segment:?} is reserved for the scratch area"),
                ));
            }
            check_segment(key, segment)?;
            path.push(segment);
        }
        Ok(path)
    }

    fn keys_iter(&self) -> Keys<'_, T> {
        Keys::new(&self.root, &self.scratch, &self.transformer)
    }

    /// Walk the store yielding each entry's file path and key.
    pub fn entries(&self) -> Entries<'_, T> {
        Entries::new(&self.root, &self.scratch, &self.transformer)
    }
}

impl<T, S: Serializer> FsStore<T, S> {
    fn read_file(&self, path: &Path) -> StoreResult<S::Value> {
        read_guarded(path, |reader| self.serializer.load(reader))
    }
}

/// Prune empty directories left behind by a delete. The entry is already
/// gone, so a failure here is logged rather than reported.
fn prune_after_delete(root: &Path, parent: &Path) {
    if let Err(e) = prune_empty_dirs(root, parent) {
        warn!(dir = %parent.display(), error = %e, "could not prune empty directories");
    }
}

fn check_segment(key: &impl fmt::Debug, segment: &str) -> StoreResult<()> {
    if segment.is_empty() {
        return Err(StoreError::invalid_key(key, "path segments must not be empty"));
    }
    if segment == "." || segment == ".." {
        return Err(StoreError::invalid_key(
            key,
            format!("{segment:?} is not a valid path segment"),
        ));
    }
    if segment.contains(SEPARATOR) || segment.contains(MAIN_SEPARATOR) || segment.contains('\0') {
        return Err(StoreError::invalid_key(
            key,
            format!("segment {segment:?} contains a path separator or NUL"),
        ));
    }
    Ok(())
}

impl<T, S> Store for FsStore<T, S>
where
    T: KeyTransformer,
    S: Serializer,
{
    type Key = T::Key;
    type Value = S::Value;

    fn contains(&self, key: &T::Key) -> StoreResult<bool> {
        let path = self.filename(key)?;
        match fs::metadata(&path) {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if matches!(e.kind(), io::ErrorKind::NotFound | io::ErrorKind::NotADirectory) => {
                Ok(false)
            }
            Err(e) => Err(StoreError::io(e, &path)),
        }
    }

    fn get(&self, key: &T::Key) -> StoreResult<S::Value> {
        self.read_file(&self.filename(key)?)
    }

    fn set(&self, key: &T::Key, value: &S::Value) -> StoreResult<()> {
        let path = self.filename(key)?;
        self.writer.write(&self.serializer, &path, value)
    }

    fn delete(&self, key: &T::Key) -> StoreResult<()> {
        if !self.mutable {
            return Err(StoreError::PermissionDenied(
                "store is immutable; entries cannot be deleted".into(),
            ));
        }

        let path = self.filename(key)?;
        match fs::symlink_metadata(&path) {
            Ok(meta) if meta.is_dir() => {
                return Err(StoreError::NotFound(path.display().to_string()));
            }
            Ok(_) => {}
            Err(e) => return Err(StoreError::io(e, &path)),
        }
        fs::remove_file(&path).map_err(|e| StoreError::io(e, &path))?;
        debug!(path = %path.display(), "deleted entry");

        if let Some(parent) = path.parent() {
            prune_after_delete(&self.root, parent);
        }
        Ok(())
    }

    fn keys(&self) -> StoreIter<'_, T::Key> {
        Box::new(self.keys_iter())
    }

    // Read from the walked path; a decoded key need not encode back to it.
    fn values(&self) -> StoreIter<'_, S::Value> {
        Box::new(self.entries().map(move |entry| self.read_file(&entry?.0)))
    }

    fn items(&self) -> StoreIter<'_, (T::Key, S::Value)> {
        Box::new(self.entries().map(move |entry| {
            let (path, key) = entry?;
            let value = self.read_file(&path)?;
            Ok((key, value))
        }))
    }
}

impl<T, S> fmt::Debug for FsStore<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FsStore")
            .field("root", &self.root)
            .field("mutable", &self.mutable)
            .finish()
    }
}
