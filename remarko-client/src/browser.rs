use anyhow::anyhow;
use gloo_storage::{errors::StorageError, LocalStorage, Storage as _};
use serde_json::Value;

use crate::Storage;

/// The browser's `localStorage`. Changes made from other tabs are not observed.
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserStorage;

impl Storage for BrowserStorage {
    fn load(&self, key: &str) -> anyhow::Result<Option<Value>> {
        match LocalStorage::get::<Value>(key) {
            Ok(v) => Ok(Some(v)),
            Err(StorageError::KeyNotFound(_)) => Ok(None),
            Err(e) => Err(anyhow!("reading {key:?} from local storage: {e}")),
        }
    }

    fn store(&mut self, key: &str, value: &Value) -> anyhow::Result<()> {
        LocalStorage::set(key, value)
            .map_err(|e| anyhow!("saving {key:?} to local storage: {e}"))
    }

    fn delete(&mut self, key: &str) -> anyhow::Result<()> {
        LocalStorage::delete(key);
        Ok(())
    }
}
