//! Joining and splitting storage paths.
//!
//! A storage path is an ordered list of non-empty segments. The codec turns
//! that list into one separator-joined string and back. A path that starts
//! with the separator is split into a leading segment holding the separator
//! itself, so `"/abc"` becomes `["/", "abc"]` and joins back to `"/abc"`.
//! Consumers must decide what a leading root marker means for them; the
//! codec never drops it.

use crate::error::{StoreError, StoreResult};

/// Separator used by the filesystem and bucket layouts.
pub const SEPARATOR: char = '/';

/// Bidirectional codec between segment lists and separator-joined strings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PathCodec {
    separator: char,
}

impl PathCodec {
    /// Create a codec splitting on `separator`.
    pub const fn new(separator: char) -> Self {
        Self { separator }
    }

    /// The separator this codec joins and splits on.
    pub fn separator(&self) -> char {
        self.separator
    }

    /// Returns `true` if `segment` is the leading root marker.
    pub fn is_root_marker(&self, segment: &str) -> bool {
        let mut chars = segment.chars();
        chars.next() == Some(self.separator) && chars.next().is_none()
    }

    /// Join segments into one path string.
    pub fn join<S: AsRef<str>>(&self, segments: &[S]) -> String {
        let mut out = String::new();
        let mut rest = segments;
        if let Some((first, tail)) = segments.split_first() {
            if self.is_root_marker(first.as_ref()) {
                out.push(self.separator);
                rest = tail;
            }
        }
        for (i, segment) in rest.iter().enumerate() {
            if i > 0 {
                out.push(self.separator);
            }
            out.push_str(segment.as_ref());
        }
        out
    }

    /// Split a path string into segments.
    ///
    /// Fails on an empty path and on empty segments (`"a//b"`, `"a/"`).
    pub fn split(&self, path: &str) -> StoreResult<Vec<String>> {
        if path.is_empty() {
            return Err(StoreError::invalid_key(path, "path must not be empty"));
        }

        let (mut segments, rest) = match path.strip_prefix(self.separator) {
            Some(rest) => (vec![self.separator.to_string()], rest),
            None => (Vec::new(), path),
        };
        if rest.is_empty() {
            return Ok(segments);
        }

        for part in rest.split(self.separator) {
            if part.is_empty() {
                return Err(StoreError::invalid_key(
                    path,
                    "path segments must not be empty",
                ));
            }
            segments.push(part.to_string());
        }
        Ok(segments)
    }
}

impl Default for PathCodec {
    fn default() -> Self {
        Self::new(SEPARATOR)
    }
}
