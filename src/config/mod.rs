//! App-level key/value settings.
//!
//! Each app definition owns one [`ConfigStore`]. Settings are written during
//! the definition phase and become read-only once the app is built; a derived
//! app receives a merged copy at derivation time and the two stores never
//! alias afterwards.

use std::collections::HashMap;

use serde_json::Value;

/// A string-keyed settings table with arbitrary JSON values.
///
/// Reading an absent key is not an error — [`get`](Self::get) returns
/// `None` as the explicit "unset" sentinel. The `lock` key is present from
/// construction (initialized to `false`); when set to `true` it makes the
/// dispatcher serialize requests.
///
/// # Examples
///
/// ```
/// use sendero::config::ConfigStore;
///
/// let mut config = ConfigStore::new();
/// config.set("public_folder", "static");
/// config.set("sessions", true);
///
/// assert_eq!(config.get_str("public_folder"), Some("static"));
/// assert_eq!(config.get_bool("sessions"), Some(true));
/// assert_eq!(config.get("unknown_key"), None);
/// assert_eq!(config.get_bool("lock"), Some(false));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigStore {
    entries: HashMap<String, Value>,
}

impl ConfigStore {
    /// Creates a store with the `lock` default in place.
    pub fn new() -> Self {
        let mut store = Self {
            entries: HashMap::new(),
        };
        store.set("lock", false);
        store
    }

    /// Sets `key` to `value`, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Returns the value for `key`, or `None` when unset. Never errors.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Returns the value for `key` as a bool, or `None` when unset or not a
    /// bool.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    /// Returns the value for `key` as a string slice, or `None` when unset
    /// or not a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Copies every entry of `other` into this store.
    ///
    /// Keys present in both take `other`'s value (last writer wins). Called
    /// at derivation time to seed a child from its parent; the copies are
    /// independent afterwards.
    pub fn merge_from(&mut self, other: &ConfigStore) {
        for (key, value) in &other.entries {
            self.entries.insert(key.clone(), value.clone());
        }
    }

    /// Number of entries, including the `lock` default.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the store has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(key, value)` entries in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}
