//! Per-test-case variable environment.
//!
//! The store is rebuilt fresh for every test case. Precedence, lowest to
//! highest: common-data environment-scoped values (dot-flattened when nested)
//! < suite-level variables < values extracted during preconditions < values
//! extracted from the main response. A later write to a name always wins and
//! nothing is ever deleted mid-run.

pub mod cache;

pub use cache::CommonDataCache;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::warn;

/// Ordered mapping of variable name to typed JSON value.
#[derive(Debug, Clone, Default)]
pub struct VariableStore {
    values: IndexMap<String, Value>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store from the common test data and suite-level variables.
    ///
    /// `common_data` may be wrapped under a `testdata` key. Each top-level
    /// entry is either a bare value or a per-environment mapping (keys
    /// matching `env_key` case-insensitively, falling back to `default`).
    /// Entries that resolve to objects are flattened with dot-separated keys;
    /// arrays flatten with a literal index segment (`parent.0.field`).
    pub fn build(
        common_data: &Value,
        env_key: &str,
        suite_variables: &IndexMap<String, Value>,
    ) -> Self {
        let mut store = VariableStore::new();

        let entries = match common_data.get("testdata") {
            Some(Value::Object(inner)) => Some(inner),
            _ => common_data.as_object(),
        };

        if let Some(entries) = entries {
            for (name, raw) in entries {
                let chosen = match raw {
                    Value::Object(env_map) => resolve_env_layer(env_map, env_key),
                    bare => Some(bare),
                };
                let Some(chosen) = chosen else {
                    warn!(variable = %name, env = %env_key, "no value for environment, skipping");
                    continue;
                };
                match chosen {
                    Value::Object(_) | Value::Array(_) => store.flatten_into(name, chosen),
                    scalar => store.insert(name.clone(), scalar.clone()),
                }
            }
        }

        for (name, value) in suite_variables {
            store.insert(name.clone(), value.clone());
        }
        store
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn insert(&mut self, name: String, value: Value) {
        self.values.insert(name, value);
    }

    /// Merge every field of a JSON object into the store (later wins).
    pub fn merge_object(&mut self, object: &serde_json::Map<String, Value>) {
        for (name, value) in object {
            self.insert(name.clone(), value.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Extract variables from a response body by dot-path.
    ///
    /// A path segment consisting entirely of digits indexes into an array
    /// when the current node is an array, otherwise it is an object key. A
    /// failed lookup only skips that one variable; it never fails the test.
    pub fn extract(&mut self, body: &Value, paths: &IndexMap<String, String>) {
        for (name, path) in paths {
            match walk_path(body, path) {
                Some(value) => self.insert(name.clone(), value.clone()),
                None => {
                    warn!(variable = %name, path = %path, "could not extract variable");
                }
            }
        }
    }

    fn flatten_into(&mut self, prefix: &str, value: &Value) {
        match value {
            Value::Object(map) => {
                for (key, child) in map {
                    self.flatten_into(&format!("{}.{}", prefix, key), child);
                }
            }
            Value::Array(items) => {
                for (index, item) in items.iter().enumerate() {
                    self.flatten_into(&format!("{}.{}", prefix, index), item);
                }
            }
            scalar => self.insert(prefix.to_string(), scalar.clone()),
        }
    }
}

/// Pick the environment-specific entry out of a per-environment mapping.
fn resolve_env_layer<'a>(
    env_map: &'a serde_json::Map<String, Value>,
    env_key: &str,
) -> Option<&'a Value> {
    env_map
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(env_key))
        .map(|(_, value)| value)
        .or_else(|| env_map.get("default"))
}

fn walk_path<'a>(body: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = body;
    for segment in path.split('.') {
        current = match current {
            Value::Array(items) if segment.chars().all(|c| c.is_ascii_digit()) => {
                items.get(segment.parse::<usize>().ok()?)?
            }
            Value::Object(map) => map.get(segment)?,
            _ => return None,
        };
    }
    Some(current)
}
