use std::fs;
use std::io;
use std::path::Path;

use tracing::debug;

use crate::error::{StoreError, StoreResult};

/// Remove empty directories from `start` upward, stopping at the first
/// non-empty one. `root` itself is never removed, nor is anything outside it.
///
/// Returns the number of directories removed.
pub fn prune_empty_dirs(root: &Path, start: &Path) -> StoreResult<usize> {
    let mut removed = 0;
    let mut current = Some(start);

    while let Some(dir) = current {
        if dir == root || !dir.starts_with(root) {
            break;
        }

        let empty = match fs::read_dir(dir) {
            Ok(mut entries) => entries.next().is_none(),
            // Already gone, e.g. pruned by a concurrent delete; keep climbing.
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                current = dir.parent();
                continue;
            }
            Err(e) => return Err(StoreError::io(e, dir)),
        };
        if !empty {
            break;
        }

        match fs::remove_dir(dir) {
            Ok(()) => {
                debug!(dir = %dir.display(), "pruned empty directory");
                removed += 1;
            }
            // Another writer filled it since we looked.
            Err(e) if e.kind() == io::ErrorKind::DirectoryNotEmpty => break,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(StoreError::io(e, dir)),
        }
        current = dir.parent();
    }

    Ok(removed)
}
