use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::error::{StoreError, StoreResult};
use crate::transform::KeyTransformer;

/// Lazy walk over every entry below a store root, yielding each entry's file
/// path together with its decoded key.
///
/// Directories are read one at a time, in whatever order the filesystem
/// returns them, so memory stays bounded by tree depth rather than entry
/// count. The scratch directory is skipped without being descended into.
/// Symlinks to regular files count as entries; symlinks to directories are
/// not followed.
pub struct Entries<'a, T> {
    root: &'a Path,
    scratch: &'a Path,
    transformer: &'a T,
    walker: walkdir::IntoIter,
}

impl<'a, T: KeyTransformer> Entries<'a, T> {
    pub fn new(root: &'a Path, scratch: &'a Path, transformer: &'a T) -> Self {
        debug!(root = %root.display(), "enumerating store");
        Self {
            root,
            scratch,
            transformer,
            walker: WalkDir::new(root).min_depth(1).into_iter(),
        }
    }

    fn decode(&self, path: &Path) -> StoreResult<T::Key> {
        let relative = path
            .strip_prefix(self.root)
            .map_err(|_| StoreError::invalid_key(path, "entry lies outside the store root"))?;

        let mut segments = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(name) => {
                    let name = name.to_str().ok_or_else(|| {
                        StoreError::invalid_key(path, "file name is not valid UTF-8")
                    })?;
                    segments.push(name.to_string());
                }
                _ => {
                    return Err(StoreError::invalid_key(
                        path,
                        "unexpected path component",
                    ))
                }
            }
        }
        self.transformer.from_path(&segments)
    }
}

/// Whether a walked entry holds a value: a regular file, or a symlink whose
/// target is one. Dangling links are not entries.
fn holds_value(entry: &DirEntry) -> StoreResult<bool> {
    if entry.file_type().is_file() {
        return Ok(true);
    }
    if !entry.path_is_symlink() {
        return Ok(false);
    }
    match fs::metadata(entry.path()) {
        Ok(meta) => Ok(meta.is_file()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(StoreError::io(e, entry.path())),
    }
}

impl<T: KeyTransformer> Iterator for Entries<'_, T> {
    type Item = StoreResult<(PathBuf, T::Key)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err
                        .path()
                        .unwrap_or(self.root)
                        .to_path_buf();
                    return Some(Err(StoreError::io(io::Error::from(err), &path)));
                }
            };

            if entry.file_type().is_dir() {
                if entry.path() == self.scratch {
                    self.walker.skip_current_dir();
                }
                continue;
            }
            match holds_value(&entry) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => return Some(Err(e)),
            }
            let key = match self.decode(entry.path()) {
                Ok(key) => key,
                Err(e) => return Some(Err(e)),
            };
            return Some(Ok((entry.into_path(), key)));
        }
    }
}

/// Lazy walk over every entry below a store root, yielding decoded keys.
pub struct Keys<'a, T>(Entries<'a, T>);

impl<'a, T: KeyTransformer> Keys<'a, T> {
    pub fn new(root: &'a Path, scratch: &'a Path, transformer: &'a T) -> Self {
        Self(Entries::new(root, scratch, transformer))
    }
}

impl<T: KeyTransformer> Iterator for Keys<'_, T> {
    type Item = StoreResult<T::Key>;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|entry| entry.map(|(_, key)| key))
    }
}
