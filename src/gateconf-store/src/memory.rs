use crate::StoreError;
use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};

/// Keyed byte storage. Values are MessagePack, keys live in named buckets.
#[derive(Debug, Default)]
pub struct Memory {
    map: DashMap<String, Vec<u8>>,
}

impl Memory {
    pub fn new() -> Self {
        Self { map: DashMap::new() }
    }

    fn make_key(bucket: &str, key: &str) -> String {
        format!("{}/{}", bucket, key)
    }

    /// Insert or update (upsert)
    pub fn put<T: Serialize>(&self, bucket: &str, key: &str, value: &T) -> Result<(), StoreError> {
        let bytes = rmp_serde::to_vec(value)?;
        self.map.insert(Self::make_key(bucket, key), bytes);
        Ok(())
    }

    /// Get by key
    pub fn get<T: DeserializeOwned>(&self, bucket: &str, key: &str) -> Result<Option<T>, StoreError> {
        match self.map.get(&Self::make_key(bucket, key)) {
            Some(bytes) => Ok(Some(rmp_serde::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Delete by key, reporting whether it existed
    pub fn delete(&self, bucket: &str, key: &str) -> Result<bool, StoreError> {
        Ok(self.map.remove(&Self::make_key(bucket, key)).is_some())
    }

    /// Check if key exists
    pub fn exists(&self, bucket: &str, key: &str) -> bool {
        self.map.contains_key(&Self::make_key(bucket, key))
    }

    /// All values whose key starts with `prefix` inside `bucket`
    pub fn list_prefix<T: DeserializeOwned>(
        &self,
        bucket: &str,
        prefix: &str,
    ) -> Result<Vec<T>, StoreError> {
        let head = Self::make_key(bucket, prefix);
        let mut out = Vec::new();
        for entry in self.map.iter() {
            if entry.key().starts_with(&head) {
                out.push(rmp_serde::from_slice(entry.value())?);
            }
        }
        Ok(out)
    }

    /// All values inside `bucket`
    pub fn list<T: DeserializeOwned>(&self, bucket: &str) -> Result<Vec<T>, StoreError> {
        self.list_prefix(bucket, "")
    }

    /// Delete every key starting with `prefix` inside `bucket`, reporting how
    /// many were removed
    pub fn delete_prefix(&self, bucket: &str, prefix: &str) -> usize {
        let head = Self::make_key(bucket, prefix);
        let doomed: Vec<String> = self
            .map
            .iter()
            .filter(|e| e.key().starts_with(&head))
            .map(|e| e.key().clone())
            .collect();
        let n = doomed.len();
        for k in doomed {
            self.map.remove(&k);
        }
        n
    }

    /// Remaining keys of `bucket`, bucket prefix stripped
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        let head = Self::make_key(bucket, "");
        self.map
            .iter()
            .filter_map(|e| e.key().strip_prefix(&head).map(str::to_owned))
            .collect()
    }
}
