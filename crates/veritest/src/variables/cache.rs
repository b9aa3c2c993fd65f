//! Read-through cache for the common test-data file.
//!
//! Owned by the suite runner rather than living process-wide. Keyed by
//! canonicalized path; the lock is held across the first parse so concurrent
//! first access never double-parses. A missing or malformed file yields an
//! empty object, never an error.

use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Default)]
pub struct CommonDataCache {
    entries: Mutex<HashMap<PathBuf, Arc<Value>>>,
}

impl CommonDataCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load (or fetch from cache) the common data at `path`.
    pub fn load(&self, path: &Path) -> Arc<Value> {
        let key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let mut entries = self.entries.lock();
        if let Some(cached) = entries.get(&key) {
            return Arc::clone(cached);
        }
        let data = Arc::new(read_common_data(&key));
        entries.insert(key, Arc::clone(&data));
        data
    }
}

fn read_common_data(path: &Path) -> Value {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) => {
            debug!(path = %path.display(), %err, "common data file not readable, using empty seed");
            return Value::Object(serde_json::Map::new());
        }
    };
    match serde_json::from_str(&contents) {
        Ok(value) => value,
        Err(err) => {
            warn!(path = %path.display(), %err, "common data file is not valid JSON, using empty seed");
            Value::Object(serde_json::Map::new())
        }
    }
}
