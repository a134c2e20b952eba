use crate::codec::PathCodec;
use crate::error::{StoreError, StoreResult};
use crate::transform::KeyTransformer;

/// Splits string keys on a single delimiter.
///
/// A key starting with the delimiter produces a leading segment holding the
/// delimiter itself (see [`PathCodec`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Delimited {
    codec: PathCodec,
}

impl Delimited {
    pub const fn new(delimiter: char) -> Self {
        Self {
            codec: PathCodec::new(delimiter),
        }
    }

    pub fn delimiter(&self) -> char {
        self.codec.separator()
    }
}

/// `"a/b/c"` ↔ `["a", "b", "c"]`.
pub const fn slash() -> Delimited {
    Delimited::new('/')
}

/// `"a\\b\\c"` ↔ `["a", "b", "c"]`.
pub const fn backslash() -> Delimited {
    Delimited::new('\\')
}

impl KeyTransformer for Delimited {
    type Key = String;

    fn to_path(&self, key: &String) -> StoreResult<Vec<String>> {
        self.codec.split(key)
    }

    fn from_path(&self, path: &[String]) -> StoreResult<String> {
        if path.is_empty() {
            return Err(StoreError::invalid_key(path, "path must not be empty"));
        }
        Ok(self.codec.join(path))
    }
}
