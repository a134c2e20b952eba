//! Torn-read detection.
//!
//! A read records the entry's modification time before opening it and
//! compares it again after deserializing. Any difference, including the
//! entry appearing or disappearing, fails the read with
//! [`StoreError::ConcurrentModification`].
//!
//! This is detection, not prevention, and it is only as sharp as the
//! filesystem's timestamp resolution: two writes landing within one tick of
//! a coarse-grained clock (one second on some filesystems) are invisible.

use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::Path;
use std::time::SystemTime;

use tracing::warn;

use crate::error::{SerializerError, StoreError, StoreResult};

/// Freshness signal of the entry at `path`; `None` if it is absent.
pub fn freshness(path: &Path) -> StoreResult<Option<SystemTime>> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(None),
        Ok(meta) => meta
            .modified()
            .map(Some)
            .map_err(|e| StoreError::io(e, path)),
        Err(e) if matches!(e.kind(), io::ErrorKind::NotFound | io::ErrorKind::NotADirectory) => {
            Ok(None)
        }
        Err(e) => Err(StoreError::io(e, path)),
    }
}

/// Open `path`, run `load` over its contents, and verify the entry did not
/// change while doing so.
pub fn read_guarded<T, F>(path: &Path, load: F) -> StoreResult<T>
where
    F: FnOnce(&mut dyn Read) -> Result<T, SerializerError>,
{
    let before = freshness(path)?;

    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            let changed = before.is_some() && freshness(path)? != before;
            if changed {
                return Err(torn(path));
            }
            return Err(StoreError::io(e, path));
        }
    };
    if before.is_none() {
        // Either a directory, or an entry published between the two probes.
        return match freshness(path)? {
            None => Err(StoreError::NotFound(path.display().to_string())),
            Some(_) => Err(torn(path)),
        };
    }

    let mut reader = BufReader::new(file);
    let loaded = load(&mut reader);

    let after = freshness(path)?;
    if after != before {
        return Err(torn(path));
    }
    loaded.map_err(|e| StoreError::from_serializer(e, path))
}

fn torn(path: &Path) -> StoreError {
    warn!(path = %path.display(), "entry modified during read");
    StoreError::ConcurrentModification(path.to_path_buf())
}
