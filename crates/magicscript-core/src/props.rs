//! Property maps sent by the scripting side
//!
//! Every create/update call carries an open-ended string-keyed map of
//! heterogeneous values. The schema belongs to each node kind, so reads are
//! lenient: a value of the wrong shape reads as `None` and is ignored.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::PropertyError;

/// Open-ended property map (insertion ordered)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Properties(Map<String, Value>);

impl Properties {
    /// Create an empty property map
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Build from a JSON value, which must be an object (`null` reads as empty)
    pub fn from_json(value: Value) -> Result<Self, PropertyError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::new()),
            other => Err(PropertyError::NotAnObject(type_name(&other).to_string())),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Merge a delta into this map, delta keys overwrite existing ones
    pub fn merge(&mut self, delta: &Properties) {
        for (key, value) in &delta.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }

    /// Copy of this map without the given keys
    pub fn without(&self, keys: &[&str]) -> Properties {
        Properties(
            self.0
                .iter()
                .filter(|(k, _)| !keys.contains(&k.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    pub fn read_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn read_bool(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(Value::as_bool)
    }

    /// Read a `[x, y, z]` number array
    pub fn read_vec3(&self, key: &str) -> Option<[f32; 3]> {
        let values = self.read_numbers(key)?;
        match values.as_slice() {
            [x, y, z] => Some([*x, *y, *z]),
            _ => None,
        }
    }

    /// Read a `[x, y, z, w]` quaternion array
    pub fn read_quat(&self, key: &str) -> Option<[f32; 4]> {
        let values = self.read_numbers(key)?;
        match values.as_slice() {
            [x, y, z, w] => Some([*x, *y, *z, *w]),
            _ => None,
        }
    }

    /// Read an array of strings, non-string entries are skipped
    pub fn read_str_list(&self, key: &str) -> Option<Vec<String>> {
        let array = self.0.get(key)?.as_array()?;
        Some(
            array
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    fn read_numbers(&self, key: &str) -> Option<Vec<f32>> {
        let array = self.0.get(key)?.as_array()?;
        array.iter().map(|v| v.as_f64().map(|n| n as f32)).collect()
    }
}

impl From<Map<String, Value>> for Properties {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
