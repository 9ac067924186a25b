//! Key-value snapshot storage.
//!
//! Services persist their state as JSON snapshots through this capability
//! instead of talking to a concrete store, so tests can hand them an
//! in-memory fake and a real frontend can back it with whatever the host
//! provides.

use std::collections::HashMap;
use std::sync::Mutex;

/// Snapshot keys, matching the original deployment's store layout.
pub const USERS_KEY: &str = "orlalock_users";
pub const SESSION_KEY: &str = "orlalock_current_user";
pub const RESERVATIONS_KEY: &str = "orlalock_reservations";

/// Minimal get/set capability over string keys and JSON string values.
pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), String>;
    /// Removes a key. Absence is not an error.
    fn remove(&self, key: &str) -> Result<(), String>;
}

/// In-memory store. The default backend for the demo binary and the fake
/// used throughout the tests.
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), String> {
        self.entries
            .lock()
            .map_err(|_| "storage lock poisoned".to_string())?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), String> {
        self.entries
            .lock()
            .map_err(|_| "storage lock poisoned".to_string())?
            .remove(key);
        Ok(())
    }
}
