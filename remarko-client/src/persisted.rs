use anyhow::Context;
use serde::{de::DeserializeOwned, Serialize};

use crate::Storage;

/// A value mirrored to one key of a [`Storage`]
///
/// The in-memory value is always updated first, then written in full. There
/// is no batching: every `set` or `update` is one write.
#[derive(Clone, Debug)]
pub struct Persisted<T> {
    key: String,
    value: T,
}

impl<T> Persisted<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Reads `key`, installing and writing `default()` if nothing is stored yet
    pub fn load<S, F>(storage: &mut S, key: &str, default: F) -> anyhow::Result<Persisted<T>>
    where
        S: Storage + ?Sized,
        F: FnOnce() -> T,
    {
        match storage.load(key)? {
            Some(json) => {
                let value = serde_json::from_value(json)
                    .with_context(|| format!("deserializing stored value {key:?}"))?;
                Ok(Persisted {
                    key: String::from(key),
                    value,
                })
            }
            None => {
                tracing::debug!(key, "no stored value, installing default");
                let this = Persisted {
                    key: String::from(key),
                    value: default(),
                };
                this.write(storage)?;
                Ok(this)
            }
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn set<S>(&mut self, storage: &mut S, value: T) -> anyhow::Result<()>
    where
        S: Storage + ?Sized,
    {
        self.value = value;
        self.write(storage)
    }

    /// Derives the new value from the current one, never from an older copy
    pub fn update<S, F>(&mut self, storage: &mut S, f: F) -> anyhow::Result<()>
    where
        S: Storage + ?Sized,
        F: FnOnce(&T) -> T,
    {
        let value = f(&self.value);
        self.set(storage, value)
    }

    fn write<S>(&self, storage: &mut S) -> anyhow::Result<()>
    where
        S: Storage + ?Sized,
    {
        let json = serde_json::to_value(&self.value)
            .with_context(|| format!("serializing value for {:?}", self.key))?;
        storage
            .store(&self.key, &json)
            .with_context(|| format!("persisting {:?}", self.key))
    }
}
