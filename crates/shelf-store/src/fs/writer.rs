use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::{SerializerError, StoreError, StoreResult};
use crate::serializer::Serializer;

/// Publishes entries by writing into the scratch area and renaming into place.
///
/// The rename is the only state transition a reader can observe. A failed
/// write removes its temporary file and leaves the target untouched.
#[derive(Clone, Debug)]
pub struct AtomicWriter {
    scratch: PathBuf,
    mutable: bool,
}

impl AtomicWriter {
    pub fn new(scratch: impl Into<PathBuf>, mutable: bool) -> Self {
        Self {
            scratch: scratch.into(),
            mutable,
        }
    }

    /// Serialize `value` and publish it at `target`.
    pub fn write<S: Serializer>(
        &self,
        serializer: &S,
        target: &Path,
        value: &S::Value,
    ) -> StoreResult<()> {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(e, parent))?;
        }

        if !self.mutable && target.exists() {
            return Err(StoreError::PermissionDenied(format!(
                "store is immutable and {} already exists",
                target.display()
            )));
        }

        // Recreate the scratch area if something removed it underneath us.
        fs::create_dir_all(&self.scratch).map_err(|e| StoreError::io(e, &self.scratch))?;
        let mut tmp =
            NamedTempFile::new_in(&self.scratch).map_err(|e| StoreError::io(e, &self.scratch))?;

        if let Err(err) = fill(&mut tmp, serializer, value) {
            discard(tmp);
            return Err(StoreError::from_serializer(err, target));
        }

        let published = if self.mutable {
            tmp.persist(target)
        } else {
            tmp.persist_noclobber(target)
        };
        match published {
            Ok(_) => {
                debug!(target = %target.display(), "published entry");
                Ok(())
            }
            Err(err) => {
                let tempfile::PersistError { error, file } = err;
                discard(file);
                if error.kind() == io::ErrorKind::AlreadyExists {
                    return Err(StoreError::PermissionDenied(format!(
                        "store is immutable and {} already exists",
                        target.display()
                    )));
                }
                Err(StoreError::io(error, target))
            }
        }
    }
}

pub(crate) fn fill<S: Serializer>(
    tmp: &mut NamedTempFile,
    serializer: &S,
    value: &S::Value,
) -> Result<(), SerializerError> {
    let mut writer = BufWriter::new(tmp.as_file_mut());
    serializer.dump(value, &mut writer)?;
    writer.flush()?;
    drop(writer);
    tmp.as_file().sync_all()?;
    Ok(())
}

/// Remove a temporary file, logging rather than raising cleanup failures so
/// the error that triggered the cleanup is the one the caller sees.
pub(crate) fn discard(tmp: NamedTempFile) {
    let path = tmp.path().to_path_buf();
    if let Err(e) = tmp.close() {
        warn!(path = %path.display(), error = %e, "failed to remove temporary file");
    }
}
