//! Value serializers.
//!
//! The store never interprets stored bytes; it hands a stream to the
//! serializer on write and on read. Built-ins:
//!
//! - [`Json`] -- `serde_json`, the default
//! - [`Bincode`] -- compact binary `serde` encoding
//! - [`IdentityBytes`] -- raw `Vec<u8>` payloads, written verbatim
//! - [`IdentityText`] -- raw UTF-8 `String` payloads, written verbatim

use std::fmt;
use std::io::{Read, Write};
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::SerializerError;

/// Converts values to and from byte streams.
pub trait Serializer {
    /// The value type stored through this serializer.
    type Value;

    /// Write `value` to `writer`.
    fn dump(&self, value: &Self::Value, writer: &mut dyn Write) -> Result<(), SerializerError>;

    /// Read one value from `reader`.
    fn load(&self, reader: &mut dyn Read) -> Result<Self::Value, SerializerError>;
}

/// JSON encoding via `serde_json`.
pub struct Json<V> {
    pretty: bool,
    _value: PhantomData<fn() -> V>,
}

impl<V> Json<V> {
    pub fn new() -> Self {
        Self {
            pretty: false,
            _value: PhantomData,
        }
    }

    /// Indented output, for stores meant to be read by people.
    pub fn pretty() -> Self {
        Self {
            pretty: true,
            _value: PhantomData,
        }
    }
}

impl<V> Default for Json<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Clone for Json<V> {
    fn clone(&self) -> Self {
        Self {
            pretty: self.pretty,
            _value: PhantomData,
        }
    }
}

impl<V> fmt::Debug for Json<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Json").field("pretty", &self.pretty).finish()
    }
}

fn json_error(err: serde_json::Error) -> SerializerError {
    if err.is_io() {
        SerializerError::Io(err.into())
    } else {
        SerializerError::Format(err.to_string())
    }
}

impl<V: Serialize + DeserializeOwned> Serializer for Json<V> {
    type Value = V;

    fn dump(&self, value: &V, writer: &mut dyn Write) -> Result<(), SerializerError> {
        if self.pretty {
            serde_json::to_writer_pretty(writer, value).map_err(json_error)
        } else {
            serde_json::to_writer(writer, value).map_err(json_error)
        }
    }

    fn load(&self, reader: &mut dyn Read) -> Result<V, SerializerError> {
        serde_json::from_reader(reader).map_err(json_error)
    }
}

/// Binary encoding via `bincode`.
pub struct Bincode<V> {
    _value: PhantomData<fn() -> V>,
}

impl<V> Bincode<V> {
    pub fn new() -> Self {
        Self {
            _value: PhantomData,
        }
    }
}

impl<V> Default for Bincode<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Clone for Bincode<V> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<V> fmt::Debug for Bincode<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Bincode")
    }
}

fn bincode_error(err: bincode::Error) -> SerializerError {
    match *err {
        bincode::ErrorKind::Io(e) => SerializerError::Io(e),
        other => SerializerError::Format(other.to_string()),
    }
}

impl<V: Serialize + DeserializeOwned> Serializer for Bincode<V> {
    type Value = V;

    fn dump(&self, value: &V, writer: &mut dyn Write) -> Result<(), SerializerError> {
        bincode::serialize_into(writer, value).map_err(bincode_error)
    }

    fn load(&self, reader: &mut dyn Read) -> Result<V, SerializerError> {
        bincode::deserialize_from(reader).map_err(bincode_error)
    }
}

/// Stores byte payloads as-is.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityBytes;

impl Serializer for IdentityBytes {
    type Value = Vec<u8>;

    fn dump(&self, value: &Vec<u8>, writer: &mut dyn Write) -> Result<(), SerializerError> {
        writer.write_all(value)?;
        Ok(())
    }

    fn load(&self, reader: &mut dyn Read) -> Result<Vec<u8>, SerializerError> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

/// Stores UTF-8 text as-is.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityText;

impl Serializer for IdentityText {
    type Value = String;

    fn dump(&self, value: &String, writer: &mut dyn Write) -> Result<(), SerializerError> {
        writer.write_all(value.as_bytes())?;
        Ok(())
    }

    fn load(&self, reader: &mut dyn Read) -> Result<String, SerializerError> {
        let bytes = IdentityBytes.load(reader)?;
        String::from_utf8(bytes).map_err(|e| SerializerError::Format(e.to_string()))
    }
}
