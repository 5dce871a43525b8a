use std::{
    collections::HashMap,
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context};
use serde_json::Value;

/// String-keyed store of JSON values, written through synchronously
pub trait Storage {
    fn load(&self, key: &str) -> anyhow::Result<Option<Value>>;
    fn store(&mut self, key: &str, value: &Value) -> anyhow::Result<()>;
    fn delete(&mut self, key: &str) -> anyhow::Result<()>;
}

impl<S: Storage + ?Sized> Storage for &mut S {
    fn load(&self, key: &str) -> anyhow::Result<Option<Value>> {
        (**self).load(key)
    }

    fn store(&mut self, key: &str, value: &Value) -> anyhow::Result<()> {
        (**self).store(key, value)
    }

    fn delete(&mut self, key: &str) -> anyhow::Result<()> {
        (**self).delete(key)
    }
}

/// Keeps serialized values in memory, like a local storage that never hits disk
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> MemoryStorage {
        MemoryStorage::default()
    }

    /// The serialized form last written under `key`
    pub fn raw(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(|s| s as &str)
    }

    pub fn insert_raw(&mut self, key: &str, json: String) {
        self.entries.insert(String::from(key), json);
    }
}

impl Storage for MemoryStorage {
    fn load(&self, key: &str) -> anyhow::Result<Option<Value>> {
        self.entries
            .get(key)
            .map(|json| {
                serde_json::from_str(json).with_context(|| format!("parsing stored value {key:?}"))
            })
            .transpose()
    }

    fn store(&mut self, key: &str, value: &Value) -> anyhow::Result<()> {
        let json = serde_json::to_string(value)
            .with_context(|| format!("serializing value for {key:?}"))?;
        self.entries.insert(String::from(key), json);
        Ok(())
    }

    fn delete(&mut self, key: &str) -> anyhow::Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// All keys live in a single JSON object file, rewritten in full on every write
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    entries: serde_json::Map<String, Value>,
}

impl FileStorage {
    pub fn open(path: impl Into<PathBuf>) -> anyhow::Result<FileStorage> {
        let path = path.into();
        let entries = match fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice(&bytes)
                .with_context(|| format!("parsing store file {path:?}"))?
            {
                Value::Object(map) => map,
                _ => return Err(anyhow!("store file {path:?} is not a JSON object")),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(?path, "store file does not exist yet, starting empty");
                serde_json::Map::new()
            }
            Err(e) => return Err(e).with_context(|| format!("reading store file {path:?}")),
        };
        Ok(FileStorage { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> anyhow::Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut file = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("creating temporary file in {dir:?}"))?;
        serde_json::to_writer_pretty(&mut file, &self.entries)
            .with_context(|| format!("serializing store file {:?}", self.path))?;
        file.write_all(b"\n")
            .with_context(|| format!("writing store file {:?}", self.path))?;
        file.persist(&self.path)
            .with_context(|| format!("replacing store file {:?}", self.path))?;
        Ok(())
    }
}

impl Storage for FileStorage {
    fn load(&self, key: &str) -> anyhow::Result<Option<Value>> {
        Ok(self.entries.get(key).cloned())
    }

    fn store(&mut self, key: &str, value: &Value) -> anyhow::Result<()> {
        self.entries.insert(String::from(key), value.clone());
        self.flush()
    }

    fn delete(&mut self, key: &str) -> anyhow::Result<()> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}
