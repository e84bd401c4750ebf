//! Storage for group to rate-limit class mappings.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{LimitsError, LimitsResult};

/// Prefix of every group mapping key in the database.
pub const GROUP_KEY_PREFIX: &str = "rs-group:";

/// Database key holding the rate-limit class of `group`.
pub fn group_key(group: &str) -> String {
    format!("{}{}", GROUP_KEY_PREFIX, group)
}

/// Key-value access used for class lookups and administration.
///
/// Implementations handle their own synchronisation; callers issue one
/// command at a time and hold no lock across calls.
#[async_trait]
pub trait ClassStore: Send + Sync {
    async fn get(&self, key: &str) -> LimitsResult<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> LimitsResult<()>;

    /// Returns whether a key was removed.
    async fn delete(&self, key: &str) -> LimitsResult<bool>;
}

/// A store command, as recorded by [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Get(String),
    Set(String, String),
    Delete(String),
}

/// In-process store that keeps a log of every command it receives.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
    calls: Mutex<Vec<StoreCall>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with `group -> class` mappings.
    pub fn with_classes<I, G, C>(classes: I) -> Self
    where
        I: IntoIterator<Item = (G, C)>,
        G: AsRef<str>,
        C: Into<String>,
    {
        let values = classes
            .into_iter()
            .map(|(group, class)| (group_key(group.as_ref()), class.into()))
            .collect();

        Self {
            values: Mutex::new(values),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Commands received so far, oldest first.
    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    /// Keys passed to `get`, oldest first.
    pub fn get_keys(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                StoreCall::Get(key) => Some(key),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: StoreCall) -> LimitsResult<()> {
        self.calls
            .lock()
            .map_err(|_| LimitsError::Internal("Failed to acquire call log lock".into()))?
            .push(call);
        Ok(())
    }

    fn values(&self) -> LimitsResult<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.values
            .lock()
            .map_err(|_| LimitsError::Internal("Failed to acquire store lock".into()))
    }
}

#[async_trait]
impl ClassStore for MemoryStore {
    async fn get(&self, key: &str) -> LimitsResult<Option<String>> {
        self.record(StoreCall::Get(key.to_string()))?;
        Ok(self.values()?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> LimitsResult<()> {
        self.record(StoreCall::Set(key.to_string(), value.to_string()))?;
        self.values()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> LimitsResult<bool> {
        self.record(StoreCall::Delete(key.to_string()))?;
        Ok(self.values()?.remove(key).is_some())
    }
}
