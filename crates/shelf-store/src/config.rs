use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Per-store behaviour fixed at construction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreOptions {
    /// Whether existing entries may be overwritten and deleted.
    pub mutable: bool,
    /// Name of the scratch directory directly below the root.
    pub scratch_dir: String,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            mutable: true,
            scratch_dir: ".tmp".to_string(),
        }
    }
}

impl StoreOptions {
    /// The scratch directory must be exactly one normal path component.
    pub fn validate(&self) -> StoreResult<()> {
        let mut components = Path::new(&self.scratch_dir).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(()),
            _ => Err(StoreError::Config(format!(
                "scratch_dir must be a single directory name, got {:?}",
                self.scratch_dir
            ))),
        }
    }
}

/// Built-in key transformers selectable from configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformerKind {
    #[default]
    Simple,
    Tuple,
    Base64,
    Slash,
    Backslash,
}

/// Built-in serializers selectable from configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SerializerKind {
    #[default]
    Json,
    Bincode,
    Bytes,
    Text,
}

/// Store configuration as read from a TOML file.
///
/// ```toml
/// root = "~/.cache/http"
/// mutable = false
/// scratch_dir = ".tmp"
/// transformer = "base64"
/// serializer = "json"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub root: PathBuf,
    pub mutable: bool,
    pub scratch_dir: String,
    pub transformer: TransformerKind,
    pub serializer: SerializerKind,
}

impl Default for StoreConfig {
    fn default() -> Self {
        let options = StoreOptions::default();
        Self {
            root: PathBuf::from("."),
            mutable: options.mutable,
            scratch_dir: options.scratch_dir,
            transformer: TransformerKind::default(),
            serializer: SerializerKind::default(),
        }
    }
}

impl StoreConfig {
    pub fn from_toml_str(text: &str) -> StoreResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| StoreError::Config(e.to_string()))?;
        config.options().validate()?;
        Ok(config)
    }

    /// Read and parse a TOML configuration file.
    pub fn load(path: &Path) -> StoreResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| StoreError::io(e, path))?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> StoreResult<String> {
        toml::to_string(self).map_err(|e| StoreError::Config(e.to_string()))
    }

    pub fn options(&self) -> StoreOptions {
        StoreOptions {
            mutable: self.mutable,
            scratch_dir: self.scratch_dir.clone(),
        }
    }

    /// Root with a leading `~` expanded.
    pub fn resolved_root(&self) -> PathBuf {
        expand_home(&self.root)
    }
}

/// A configuration value given either literally or by a function, resolved
/// once when the consumer is built.
#[derive(Clone, Debug)]
pub enum Setting<T> {
    Literal(T),
    Computed(fn() -> T),
}

impl<T> Setting<T> {
    pub fn resolve(self) -> T {
        match self {
            Self::Literal(value) => value,
            Self::Computed(f) => f(),
        }
    }
}

impl<T> From<T> for Setting<T> {
    fn from(value: T) -> Self {
        Self::Literal(value)
    }
}

/// Replace a leading `~` component with `$HOME`. Other paths are returned
/// unchanged, as is everything when `$HOME` is unset.
pub fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(rest),
        None => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = StoreConfig::default();
        assert!(c.mutable);
        assert_eq!(c.scratch_dir, ".tmp");
        assert_eq!(c.transformer, TransformerKind::Simple);
        assert_eq!(c.serializer, SerializerKind::Json);
    }

    #[test]
    fn parses_partial_toml() {
        let c = StoreConfig::from_toml_str(
            r#"
            root = "/var/cache/pages"
            mutable = false
            transformer = "base64"
            "#,
        )
        .unwrap();
        assert_eq!(c.root, PathBuf::from("/var/cache/pages"));
        assert!(!c.mutable);
        assert_eq!(c.transformer, TransformerKind::Base64);
        assert_eq!(c.serializer, SerializerKind::Json);
        assert_eq!(c.scratch_dir, ".tmp");
    }

    #[test]
    fn toml_roundtrip() {
        let c = StoreConfig {
            serializer: SerializerKind::Bincode,
            transformer: TransformerKind::Backslash,
            ..StoreConfig::default()
        };
        let text = c.to_toml_string().unwrap();
        assert_eq!(StoreConfig::from_toml_str(&text).unwrap(), c);
    }

    #[test]
    fn rejects_unknown_kinds_and_bad_scratch() {
        assert!(matches!(
            StoreConfig::from_toml_str(r#"transformer = "magic""#),
            Err(StoreError::Config(_))
        ));
        assert!(matches!(
            StoreConfig::from_toml_str(r#"scratch_dir = "a/b""#),
            Err(StoreError::Config(_))
        ));
        assert!(matches!(
            StoreConfig::from_toml_str(r#"scratch_dir = "..""#),
            Err(StoreError::Config(ref msg)) if msg.contains("single directory name")
        ));
    }

    #[test]
    fn scratch_dir_must_be_one_plain_name() {
        for bad in ["..", ".", "", "a/b", "/tmp"] {
            let options = StoreOptions {
                scratch_dir: bad.into(),
                ..StoreOptions::default()
            };
            assert!(
                matches!(options.validate(), Err(StoreError::Config(_))),
                "{bad:?} should be rejected"
            );
        }
        assert!(StoreOptions::default().validate().is_ok());
        assert!(StoreOptions {
            scratch_dir: "_inflight".into(),
            ..StoreOptions::default()
        }
        .validate()
        .is_ok());
    }

    #[test]
    fn load_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            StoreConfig::load(&dir.path().join("shelf.toml")),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn setting_resolves_literal_and_computed() {
        fn answer() -> u32 {
            42
        }
        assert_eq!(Setting::Literal(7).resolve(), 7);
        assert_eq!(Setting::<u32>::Computed(answer).resolve(), 42);
        assert_eq!(Setting::from("x").resolve(), "x");
    }

    #[test]
    fn expand_home_only_touches_tilde() {
        assert_eq!(expand_home(Path::new("/abs/path")), PathBuf::from("/abs/path"));
        assert_eq!(expand_home(Path::new("rel")), PathBuf::from("rel"));
        if let Some(home) = std::env::var_os("HOME") {
            assert_eq!(
                expand_home(Path::new("~/.http")),
                PathBuf::from(home).join(".http")
            );
        }
    }
}
