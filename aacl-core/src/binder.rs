//! Payload binding.
//!
//! The grammar alone decides which keys a payload has; caller data only
//! supplies values. Caller keys the grammar does not ask for are dropped, so
//! the key set that reaches the server is a pure function of the grammar it
//! issued.
//!
//! ```rust,ignore
//! let payload = binder::bind(&grammar, &data)?;
//! // {"entropy": .., "intent": .., "state": .., <required_keys in order>}
//! ```

use crate::error::{Error, Result};
use crate::grammar::Grammar;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An execution payload bound from a grammar.
///
/// Keys keep construction order: the common fields (`entropy`, `intent`,
/// `state`) first, then the grammar's `required_keys` as listed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(Map<String, Value>);

impl Payload {
    /// Number of keys in the payload.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Look up a single field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Keys in construction order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Borrow the underlying JSON object.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

/// Bind caller `data` against `grammar`.
///
/// Fails with [`Error::MissingField`] on the first required key absent from
/// `data`, and with [`Error::PayloadShape`] if the result does not hold
/// exactly `required_keys.len() + 3` keys. A JSON `null` counts as present.
pub fn bind(grammar: &Grammar, data: &Map<String, Value>) -> Result<Payload> {
    let mut payload = Map::with_capacity(grammar.expected_key_count());

    payload.insert("entropy".into(), Value::String(grammar.entropy.clone()));
    payload.insert("intent".into(), Value::String(grammar.intent.clone()));
    payload.insert("state".into(), Value::String(grammar.state.clone()));

    for key in &grammar.required_keys {
        let value = data
            .get(key)
            .ok_or_else(|| Error::MissingField(key.clone()))?;
        payload.insert(key.clone(), value.clone());
    }

    // A required key shadowing a common field, or listed twice, collapses
    // into an existing entry and leaves the map short.
    let expected = grammar.expected_key_count();
    if payload.len() != expected {
        return Err(Error::PayloadShape {
            expected,
            actual: payload.len(),
        });
    }

    Ok(Payload(payload))
}

/// Bind any serializable caller data.
///
/// `data` must serialize to a JSON object (a struct or map); anything else is
/// rejected with [`Error::InvalidData`].
pub fn bind_serializable<D>(grammar: &Grammar, data: &D) -> Result<Payload>
where
    D: Serialize + ?Sized,
{
    let map = to_object(data)?;
    bind(grammar, &map)
}

/// Serialize caller data into the JSON object form the binder reads.
pub(crate) fn to_object<D>(data: &D) -> Result<Map<String, Value>>
where
    D: Serialize + ?Sized,
{
    match serde_json::to_value(data)? {
        Value::Object(map) => Ok(map),
        other => Err(Error::InvalidData(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
