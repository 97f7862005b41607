use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
    api::ResultSink,
    error::{persistence_error, Error},
};

/// Keeps artifacts in memory. Used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<BTreeMap<String, Vec<u8>>>,
    failing: HashSet<String>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every write to one of `keys` fails with a persistence error.
    pub fn failing<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: Mutex::new(BTreeMap::new()),
            failing: keys.into_iter().map(Into::into).collect(),
        }
    }

    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.lock().await.get(key).cloned()
    }

    pub async fn keys(&self) -> Vec<String> {
        self.entries.lock().await.keys().cloned().collect()
    }
}

#[async_trait]
impl ResultSink for MemorySink {
    async fn write(&self, key: &str, bytes: Vec<u8>) -> Result<(), Error> {
        if self.failing.contains(key) {
            return Err(persistence_error(format!("{}: rejected", key)));
        }

        self.entries.lock().await.insert(key.to_string(), bytes);

        Ok(())
    }
}
