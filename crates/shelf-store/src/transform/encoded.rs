use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;

use crate::error::{StoreError, StoreResult};
use crate::transform::KeyTransformer;

/// Encodes the whole key as one opaque segment.
///
/// Uses the URL-safe alphabet (`-` and `_` instead of `+` and `/`), so the
/// segment never contains the path separator whatever the key holds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Base64;

impl KeyTransformer for Base64 {
    type Key = String;

    fn to_path(&self, key: &String) -> StoreResult<Vec<String>> {
        if key.is_empty() {
            return Err(StoreError::invalid_key(key, "key must not be empty"));
        }
        Ok(vec![URL_SAFE.encode(key.as_bytes())])
    }

    fn from_path(&self, path: &[String]) -> StoreResult<String> {
        let [segment] = path else {
            return Err(StoreError::invalid_key(
                path,
                "base64 keys occupy exactly one segment",
            ));
        };
        let bytes = URL_SAFE
            .decode(segment)
            .map_err(|e| StoreError::invalid_key(segment, e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| StoreError::invalid_key(segment, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn encodes_separators_away() {
        let path = Base64.to_path(&"a/b/c???".into()).unwrap();
        assert_eq!(path.len(), 1);
        assert!(!path[0].contains('/'));
        assert_eq!(Base64.from_path(&path).unwrap(), "a/b/c???");
    }

    #[test]
    fn rejects_nested_and_garbage_paths() {
        assert!(Base64.from_path(&["YQ==".into(), "Yg==".into()]).is_err());
        assert!(Base64.from_path(&["not base64!".into()]).is_err());
        assert!(Base64.from_path(&[]).is_err());
    }

    proptest! {
        #[test]
        fn base64_roundtrips(key in "\\PC{1,32}") {
            let path = Base64.to_path(&key).unwrap();
            prop_assert_eq!(Base64.from_path(&path).unwrap(), key);
        }
    }
}
