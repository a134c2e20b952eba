use std::fmt;
use std::io::{self, BufReader};
use std::path::Path;
use std::sync::Arc;

use tempfile::NamedTempFile;
use tracing::debug;

use super::Bucket;
use crate::codec::{PathCodec, SEPARATOR};
use crate::error::{StoreError, StoreResult};
use crate::fs::writer::{discard, fill};
use crate::serializer::Serializer;
use crate::traits::{Store, StoreIter};
use crate::transform::KeyTransformer;

/// A prefix within a bucket behaving like a persistent dictionary.
///
/// Values are serialized into a local temporary file and uploaded with one
/// replacing `put_file`, and read back by fetching into a temporary file.
pub struct BucketStore<T, S> {
    bucket: Arc<dyn Bucket>,
    prefix: String,
    mutable: bool,
    transformer: T,
    serializer: S,
    codec: PathCodec,
}

impl<T, S> BucketStore<T, S> {
    /// Mutable store over the objects below `prefix` in `bucket`.
    ///
    /// Separators around the prefix are normalized, so `"contracts"`,
    /// `"contracts/"` and `"/contracts/"` all name the same area. An empty
    /// prefix spans the whole bucket.
    pub fn new(bucket: Arc<dyn Bucket>, prefix: &str, transformer: T, serializer: S) -> Self {
        let trimmed = prefix.trim_matches(SEPARATOR);
        let prefix = if trimmed.is_empty() {
            String::new()
        } else {
            format!("{trimmed}{SEPARATOR}")
        };
        Self {
            bucket,
            prefix,
            mutable: true,
            transformer,
            serializer,
            codec: PathCodec::default(),
        }
    }

    /// Set whether existing objects may be overwritten and deleted.
    pub fn mutable(mut self, mutable: bool) -> Self {
        self.mutable = mutable;
        self
    }

    pub fn is_mutable(&self) -> bool {
        self.mutable
    }

    pub fn bucket(&self) -> &dyn Bucket {
        self.bucket.as_ref()
    }

    /// Normalized prefix, empty or ending with the separator.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl<T: KeyTransformer, S> BucketStore<T, S> {
    /// Full object name of `key`.
    pub fn object_name(&self, key: &T::Key) -> StoreResult<String> {
        let segments = self.transformer.to_path(key)?;
        if segments.is_empty() {
            return Err(StoreError::invalid_key(key, "key maps to an empty path"));
        }
        for (i, segment) in segments.iter().enumerate() {
            if i == 0 && self.codec.is_root_marker(segment) {
                return Err(StoreError::invalid_key(
                    key,
                    "absolute paths are not allowed; keys are relative to the prefix",
                ));
            }
            if segment.is_empty() || segment.contains(SEPARATOR) {
                return Err(StoreError::invalid_key(
                    key,
                    format!("segment {segment:?} is empty or contains a path separator"),
                ));
            }
        }
        Ok(format!("{}{}", self.prefix, self.codec.join(&segments)))
    }

    /// Decode a listed object name back into a key.
    pub fn key_from_name(&self, name: &str) -> StoreResult<T::Key> {
        let rest = name.strip_prefix(&self.prefix).ok_or_else(|| {
            StoreError::invalid_key(
                name,
                format!("object name must start with {:?}", self.prefix),
            )
        })?;
        let segments = self.codec.split(rest)?;
        self.transformer.from_path(&segments)
    }

    fn location(&self, name: &str) -> String {
        format!("{}/{}", self.bucket.name(), name)
    }

    fn fail(&self, err: io::Error, name: &str) -> StoreError {
        StoreError::io(err, Path::new(&self.location(name)))
    }
}

impl<T: KeyTransformer, S: Serializer> BucketStore<T, S> {
    /// Fetch and deserialize the object called `name`.
    fn load_object(&self, name: &str) -> StoreResult<S::Value> {
        let tmp = NamedTempFile::new().map_err(|e| StoreError::io(e, &std::env::temp_dir()))?;

        let found = match self.bucket.fetch_to(name, tmp.path()) {
            Ok(found) => found,
            Err(e) => {
                discard(tmp);
                return Err(self.fail(e, name));
            }
        };
        if !found {
            discard(tmp);
            return Err(StoreError::NotFound(self.location(name)));
        }

        let loaded = tmp
            .reopen()
            .map_err(|e| StoreError::io(e, tmp.path()))
            .and_then(|file| {
                let mut reader = BufReader::new(file);
                self.serializer
                    .load(&mut reader)
                    .map_err(|e| StoreError::from_serializer(e, Path::new(name)))
            });
        discard(tmp);
        loaded
    }

    /// List the objects below the prefix, yielding each name with its key.
    fn named_keys(&self) -> StoreIter<'_, (String, T::Key)> {
        debug!(bucket = self.bucket.name(), prefix = %self.prefix, "enumerating store");
        match self.bucket.list(&self.prefix) {
            Ok(names) => Box::new(names.map(move |name| {
                let name = name.map_err(|e| self.fail(e, &self.prefix))?;
                let key = self.key_from_name(&name)?;
                Ok((name, key))
            })),
            Err(e) => Box::new(std::iter::once(Err(self.fail(e, &self.prefix)))),
        }
    }
}

impl<T, S> Store for BucketStore<T, S>
where
    T: KeyTransformer,
    S: Serializer,
{
    type Key = T::Key;
    type Value = S::Value;

    fn contains(&self, key: &T::Key) -> StoreResult<bool> {
        let name = self.object_name(key)?;
        self.bucket.exists(&name).map_err(|e| self.fail(e, &name))
    }

    fn get(&self, key: &T::Key) -> StoreResult<S::Value> {
        self.load_object(&self.object_name(key)?)
    }

    fn set(&self, key: &T::Key, value: &S::Value) -> StoreResult<()> {
        let name = self.object_name(key)?;
        if !self.mutable && self.bucket.exists(&name).map_err(|e| self.fail(e, &name))? {
            return Err(StoreError::PermissionDenied(format!(
                "store is immutable and {} already exists",
                self.location(&name)
            )));
        }

        let mut tmp =
            NamedTempFile::new().map_err(|e| StoreError::io(e, &std::env::temp_dir()))?;
        if let Err(err) = fill(&mut tmp, &self.serializer, value) {
            discard(tmp);
            return Err(StoreError::from_serializer(err, Path::new(&name)));
        }

        let uploaded = self.bucket.put_file(&name, tmp.path());
        discard(tmp);
        uploaded.map_err(|e| self.fail(e, &name))?;
        debug!(object = %self.location(&name), "published object");
        Ok(())
    }

    fn delete(&self, key: &T::Key) -> StoreResult<()> {
        if !self.mutable {
            return Err(StoreError::PermissionDenied(
                "store is immutable; entries cannot be deleted".into(),
            ));
        }

        let name = self.object_name(key)?;
        let removed = self.bucket.delete(&name).map_err(|e| self.fail(e, &name))?;
        if !removed {
            return Err(StoreError::NotFound(self.location(&name)));
        }
        debug!(object = %self.location(&name), "deleted object");
        Ok(())
    }

    fn keys(&self) -> StoreIter<'_, T::Key> {
        Box::new(self.named_keys().map(|entry| entry.map(|(_, key)| key)))
    }

    // Fetch by listed name; a decoded key need not encode back to it.
    fn values(&self) -> StoreIter<'_, S::Value> {
        Box::new(
            self.named_keys()
                .map(move |entry| self.load_object(&entry?.0)),
        )
    }

    fn items(&self) -> StoreIter<'_, (T::Key, S::Value)> {
        Box::new(self.named_keys().map(move |entry| {
            let (name, key) = entry?;
            let value = self.load_object(&name)?;
            Ok((key, value))
        }))
    }
}

impl<T, S> fmt::Debug for BucketStore<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BucketStore")
            .field("location", &format!("{}/{}", self.bucket.name(), self.prefix))
            .field("mutable", &self.mutable)
            .finish()
    }
}
