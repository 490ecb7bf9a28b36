use std::collections::HashMap;
use std::sync::Mutex;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    #[error("storage quota exceeded")]
    QuotaExceeded,
    #[error("storage is unavailable")]
    Unavailable,
}

/// String key/value storage scoped to one browser session or device.
///
/// Mirrors the Web Storage API so a `window.sessionStorage` wrapper and the
/// in-memory store below are interchangeable behind the wheel engine.
pub trait PlayStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Mode {
    Normal,
    Quota(usize), // max number of entries
    Disabled,
}

#[derive(Debug)]
pub struct MemoryPlayStore {
    items: Mutex<HashMap<String, String>>,
    mode: Mode,
}

impl MemoryPlayStore {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(HashMap::new()),
            mode: Mode::Normal,
        }
    }

    /// Store that rejects writes once it holds `max_entries` keys.
    pub fn with_quota(max_entries: usize) -> Self {
        Self {
            items: Mutex::new(HashMap::new()),
            mode: Mode::Quota(max_entries),
        }
    }

    /// Store that fails every read and write, like storage disabled by the browser.
    pub fn disabled() -> Self {
        Self {
            items: Mutex::new(HashMap::new()),
            mode: Mode::Disabled,
        }
    }

    pub fn len(&self) -> usize {
        self.items.lock().map(|items| items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryPlayStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayStore for MemoryPlayStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        if self.mode == Mode::Disabled {
            return Err(StoreError::Unavailable);
        }
        let items = self.items.lock().map_err(|_| StoreError::Unavailable)?;
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut items = match self.mode {
            Mode::Disabled => return Err(StoreError::Unavailable),
            _ => self.items.lock().map_err(|_| StoreError::Unavailable)?,
        };
        if let Mode::Quota(max_entries) = self.mode {
            if !items.contains_key(key) && items.len() >= max_entries {
                return Err(StoreError::QuotaExceeded);
            }
        }
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_and_overwrite() {
        let store = MemoryPlayStore::new();
        assert_eq!(store.get_item("k").unwrap(), None);
        store.set_item("k", "a").unwrap();
        store.set_item("k", "b").unwrap();
        assert_eq!(store.get_item("k").unwrap().as_deref(), Some("b"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_quota_allows_overwriting_existing_keys() {
        let store = MemoryPlayStore::with_quota(1);
        store.set_item("a", "1").unwrap();
        assert_eq!(store.set_item("b", "1"), Err(StoreError::QuotaExceeded));
        assert!(store.set_item("a", "2").is_ok());
    }

    #[test]
    fn test_disabled_store_fails_everything() {
        let store = MemoryPlayStore::disabled();
        assert_eq!(store.get_item("a"), Err(StoreError::Unavailable));
        assert_eq!(store.set_item("a", "1"), Err(StoreError::Unavailable));
        assert!(store.is_empty());
    }
}
