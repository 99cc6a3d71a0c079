//! Shared settings store with change notification
//!
//! Key-value settings shared between the governor and the rest of the game
//! runtime. Watchers fire on every write and receive the writer's
//! `WriteOrigin`, so a subscriber can tell an external edit apart from a
//! value the quality controller just persisted itself. Threading the origin
//! through the write replaces the ambient "setting from watcher" flag such
//! stores usually grow, and stays correct under real concurrency.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Who performed a settings write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOrigin {
    /// Any writer outside the governor (UI, presets, remote config)
    External,

    /// The quality controller persisting its own completed transition
    SelfPersist,
}

/// Watcher callback: receives the new value and the write's origin
pub type WatchFn = Arc<dyn Fn(&Value, WriteOrigin) + Send + Sync>;

/// Settings store interface consumed by the governor
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;

    /// Write a value and notify every watcher of `key`, tagged with `origin`
    fn set(&self, key: &str, value: Value, origin: WriteOrigin);

    /// Subscribe to writes of `key`
    fn watch(&self, key: &str, callback: WatchFn);

    /// Convenience accessor for numeric settings
    fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(|value| value.as_f64())
    }
}

/// In-memory settings store
///
/// Watchers are invoked synchronously on the writer's thread, after the
/// value lock is released. The watcher list is snapshotted before invocation
/// so a callback may write back into the store without deadlocking.
#[derive(Default)]
pub struct MemorySettings {
    values: Mutex<HashMap<String, Value>>,
    watchers: Mutex<HashMap<String, Vec<WatchFn>>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.lock().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: Value, origin: WriteOrigin) {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.clone());
        debug!("Setting updated: {} = {} ({:?})", key, value, origin);

        let callbacks: Vec<WatchFn> = self
            .watchers
            .lock()
            .unwrap()
            .get(key)
            .map(|list| list.to_vec())
            .unwrap_or_default();

        for callback in callbacks {
            callback(&value, origin);
        }
    }

    fn watch(&self, key: &str, callback: WatchFn) {
        self.watchers
            .lock()
            .unwrap()
            .entry(key.to_string())
            .or_default()
            .push(callback);
    }
}
