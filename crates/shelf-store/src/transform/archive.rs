use std::fmt::Write as _;

use chrono::{DateTime, Local};

use crate::error::{StoreError, StoreResult};
use crate::transform::KeyTransformer;

/// Which end of the inner path receives the date segment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Position {
    /// `(date,) + path`
    #[default]
    Left,
    /// `path + (date,)`
    Right,
}

/// Wraps a transformer and adds a date segment to every path.
///
/// Writing the same key on different days lands in different entries, which
/// turns a cache into a dated archive. Decoding strips the date again, so
/// enumeration yields the inner key once per stored date.
#[derive(Clone, Debug)]
pub struct Archive<T> {
    inner: T,
    date_format: String,
    position: Position,
    now: fn() -> DateTime<Local>,
}

impl<T> Archive<T> {
    /// Daily archive (`%Y-%m-%d`) on the left of the inner path.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            date_format: "%Y-%m-%d".to_string(),
            position: Position::Left,
            now: Local::now,
        }
    }

    /// strftime format of the date segment. Use `"%Y-%m-%d %H:00"` for
    /// hourly buckets.
    pub fn date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = format.into();
        self
    }

    pub fn position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    /// Replace the clock consulted on every `to_path`.
    pub fn clock(mut self, now: fn() -> DateTime<Local>) -> Self {
        self.now = now;
        self
    }

    /// The date segment for the current clock reading.
    pub fn stamp(&self) -> StoreResult<String> {
        let mut stamp = String::new();
        write!(stamp, "{}", (self.now)().format(&self.date_format)).map_err(|_| {
            StoreError::Config(format!("invalid date format {:?}", self.date_format))
        })?;
        if stamp.is_empty() {
            return Err(StoreError::Config(
                "date format produced an empty segment".into(),
            ));
        }
        Ok(stamp)
    }
}

impl<T: KeyTransformer> KeyTransformer for Archive<T> {
    type Key = T::Key;

    fn to_path(&self, key: &T::Key) -> StoreResult<Vec<String>> {
        let mut path = self.inner.to_path(key)?;
        let stamp = self.stamp()?;
        match self.position {
            Position::Left => path.insert(0, stamp),
            Position::Right => path.push(stamp),
        }
        Ok(path)
    }

    fn from_path(&self, path: &[String]) -> StoreResult<T::Key> {
        if path.len() < 2 {
            return Err(StoreError::invalid_key(
                path,
                "archived paths need a date segment and at least one key segment",
            ));
        }
        let inner = match self.position {
            Position::Left => &path[1..],
            Position::Right => &path[..path.len() - 1],
        };
        self.inner.from_path(inner)
    }
}
