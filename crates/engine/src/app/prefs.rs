//! Flat key-value preference store shared by every level of a session.
//!
//! Writes land in a working copy immediately and only reach durable storage on
//! [`PrefsStore::flush`]. There are no transactions; a crash between two `set`
//! calls can leave a partial key set behind and readers must cope with that.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::atomic_io::write_text_atomic;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PrefValue {
    Str(String),
    Float(f64),
    Int(i32),
}

impl PrefValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Self::Str(_) => "str",
            Self::Float(_) => "float",
            Self::Int(_) => "int",
        }
    }
}

#[derive(Debug, Error)]
pub enum PrefsError {
    #[error("failed to read prefs file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write prefs file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("prefs file {path} is malformed at {json_path}: {message}")]
    Decode {
        path: PathBuf,
        json_path: String,
        message: String,
    },
    #[error("failed to encode prefs: {0}")]
    Encode(#[source] serde_json::Error),
}

pub trait PrefsStore {
    fn set(&mut self, key: &str, value: PrefValue);
    fn get(&self, key: &str) -> Option<PrefValue>;
    fn delete(&mut self, key: &str);
    fn flush(&mut self) -> Result<(), PrefsError>;

    fn has_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    fn get_str(&self, key: &str) -> Option<String> {
        typed(key, self.get(key), |value| value.as_str().map(str::to_string))
    }

    fn get_f64(&self, key: &str) -> Option<f64> {
        typed(key, self.get(key), |value| value.as_f64())
    }

    fn get_i32(&self, key: &str) -> Option<i32> {
        typed(key, self.get(key), |value| value.as_i32())
    }
}

fn typed<T>(
    key: &str,
    value: Option<PrefValue>,
    convert: impl FnOnce(&PrefValue) -> Option<T>,
) -> Option<T> {
    let value = value?;
    let converted = convert(&value);
    if converted.is_none() {
        warn!(
            key,
            stored_kind = value.type_name(),
            "pref_type_mismatch; treating key as absent"
        );
    }
    converted
}

/// In-process store. The durable copy is tracked separately so a test can observe
/// exactly what a fresh process would see via [`MemoryPrefs::reopen`].
#[derive(Debug, Default, Clone)]
pub struct MemoryPrefs {
    working: BTreeMap<String, PrefValue>,
    durable: BTreeMap<String, PrefValue>,
    flush_count: u32,
}

impl MemoryPrefs {
    pub fn new() -> Self {
        Self::default()
    }

    /// What a subsequent process start would load.
    pub fn reopen(&self) -> Self {
        Self {
            working: self.durable.clone(),
            durable: self.durable.clone(),
            flush_count: 0,
        }
    }

    pub fn flush_count(&self) -> u32 {
        self.flush_count
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.working.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.working.is_empty()
    }
}

impl PrefsStore for MemoryPrefs {
    fn set(&mut self, key: &str, value: PrefValue) {
        self.working.insert(key.to_string(), value);
    }

    fn get(&self, key: &str) -> Option<PrefValue> {
        self.working.get(key).cloned()
    }

    fn delete(&mut self, key: &str) {
        self.working.remove(key);
    }

    fn flush(&mut self) -> Result<(), PrefsError> {
        self.durable = self.working.clone();
        self.flush_count = self.flush_count.saturating_add(1);
        Ok(())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PrefsFile {
    #[serde(default)]
    values: BTreeMap<String, PrefValue>,
}

/// JSON-backed store. `flush` rewrites the whole file through a temp-file swap.
#[derive(Debug)]
pub struct FilePrefs {
    path: PathBuf,
    values: BTreeMap<String, PrefValue>,
    dirty: bool,
}

impl FilePrefs {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PrefsError> {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(raw) => parse_prefs_json(&path, &raw)?.values,
            Err(source) if source.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "prefs_file_missing; starting empty");
                BTreeMap::new()
            }
            Err(source) => return Err(PrefsError::Read { path, source }),
        };

        Ok(Self {
            path,
            values,
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn parse_prefs_json(path: &Path, raw: &str) -> Result<PrefsFile, PrefsError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize::<_, PrefsFile>(&mut deserializer).map_err(|error| {
        let json_path = error.path().to_string();
        PrefsError::Decode {
            path: path.to_path_buf(),
            json_path,
            message: error.into_inner().to_string(),
        }
    })
}

impl PrefsStore for FilePrefs {
    fn set(&mut self, key: &str, value: PrefValue) {
        self.values.insert(key.to_string(), value);
        self.dirty = true;
    }

    fn get(&self, key: &str) -> Option<PrefValue> {
        self.values.get(key).cloned()
    }

    fn delete(&mut self, key: &str) {
        if self.values.remove(key).is_some() {
            self.dirty = true;
        }
    }

    fn flush(&mut self) -> Result<(), PrefsError> {
        if !self.dirty {
            return Ok(());
        }
        let file = PrefsFile {
            values: self.values.clone(),
        };
        let json = serde_json::to_string_pretty(&file).map_err(PrefsError::Encode)?;
        write_text_atomic(&self.path, &json).map_err(|source| PrefsError::Write {
            path: self.path.clone(),
            source,
        })?;
        self.dirty = false;
        debug!(path = %self.path.display(), keys = self.values.len(), "prefs_flushed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn unflushed_writes_are_not_durable() {
        let mut prefs = MemoryPrefs::new();
        prefs.set("lastActiveLevel", PrefValue::Str("Scene1".to_string()));

        assert_eq!(prefs.get_str("lastActiveLevel").as_deref(), Some("Scene1"));
        assert!(prefs.reopen().is_empty());

        prefs.flush().expect("flush");
        assert_eq!(
            prefs.reopen().get_str("lastActiveLevel").as_deref(),
            Some("Scene1")
        );
        assert_eq!(prefs.flush_count(), 1);
    }

    #[test]
    fn mistyped_value_reads_as_absent() {
        let mut prefs = MemoryPrefs::new();
        prefs.set("playerPosX", PrefValue::Str("five".to_string()));

        assert!(prefs.has_key("playerPosX"));
        assert_eq!(prefs.get_f64("playerPosX"), None);
    }

    #[test]
    fn delete_of_missing_key_is_a_no_op() {
        let mut prefs = MemoryPrefs::new();
        prefs.delete("playerHealth");
        assert!(prefs.is_empty());
    }

    #[test]
    fn file_prefs_survive_reopen_after_flush() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("saves").join("prefs.json");

        let mut prefs = FilePrefs::open(&path).expect("open empty");
        prefs.set("playerPosX", PrefValue::Float(3.5));
        prefs.set("playerHealth", PrefValue::Int(2));
        prefs.set("lastActiveLevel", PrefValue::Str("Scene2".to_string()));
        prefs.flush().expect("flush");

        let reopened = FilePrefs::open(&path).expect("reopen");
        assert_eq!(reopened.get_f64("playerPosX"), Some(3.5));
        assert_eq!(reopened.get_i32("playerHealth"), Some(2));
        assert_eq!(
            reopened.get_str("lastActiveLevel").as_deref(),
            Some("Scene2")
        );
    }

    #[test]
    fn file_prefs_without_flush_leave_disk_untouched() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("prefs.json");

        let mut prefs = FilePrefs::open(&path).expect("open");
        prefs.set("playerPosX", PrefValue::Float(1.0));
        drop(prefs);

        assert!(!path.exists());
    }

    #[test]
    fn malformed_file_reports_json_path() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("prefs.json");
        fs::write(
            &path,
            r#"{"values":{"playerHealth":{"kind":"int","value":"two"}}}"#,
        )
        .expect("write");

        let err = FilePrefs::open(&path).expect_err("decode error");
        match err {
            PrefsError::Decode { json_path, .. } => {
                assert!(json_path.starts_with("values.playerHealth"), "{json_path}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
