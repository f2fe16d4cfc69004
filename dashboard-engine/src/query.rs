//! Query-string state as a plain value.
//!
//! [`QueryParams`] is the boundary shape of the browser's query string: an
//! ordered map from key to [`QueryValue`]. Key order is significant because
//! decoded filters follow it.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

// ------------------------------------------------------------------ //
//  QueryValue                                                         //
// ------------------------------------------------------------------ //

/// Raw value of a single query parameter.
///
/// Deserializing coerces scalars to strings, so `{"from": 1704067200000}`
/// reads the same as `{"from": "1704067200000"}`. `null` array elements are
/// dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum QueryValue {
    /// `null` / absent value.
    Null,
    Single(String),
    /// Repeated key (`?API=a&API=b`) or an explicit array.
    Multiple(Vec<String>),
}

impl QueryValue {
    /// Flatten the value to one string, joining lists with `,`.
    ///
    /// Returns `None` for [`QueryValue::Null`].
    pub fn joined(&self) -> Option<String> {
        match self {
            QueryValue::Null => None,
            QueryValue::Single(s) => Some(s.clone()),
            QueryValue::Multiple(values) => Some(values.join(",")),
        }
    }
}

impl<'de> Deserialize<'de> for QueryValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = match Value::deserialize(deserializer)? {
            Value::Null => QueryValue::Null,
            Value::Array(items) => {
                QueryValue::Multiple(items.into_iter().filter_map(coerce_scalar).collect())
            }
            other => coerce_scalar(other).map_or(QueryValue::Null, QueryValue::Single),
        };
        Ok(value)
    }
}

fn coerce_scalar(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        // Nested structures keep their JSON text.
        other => Some(other.to_string()),
    }
}

impl From<&str> for QueryValue {
    fn from(s: &str) -> Self {
        QueryValue::Single(s.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(s: String) -> Self {
        QueryValue::Single(s)
    }
}

impl From<Vec<String>> for QueryValue {
    fn from(values: Vec<String>) -> Self {
        QueryValue::Multiple(values)
    }
}

// ------------------------------------------------------------------ //
//  QueryParams                                                        //
// ------------------------------------------------------------------ //

/// Ordered query-parameter map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    entries: Vec<(String, QueryValue)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from raw `key=value` pairs, merging repeated keys into a
    /// [`QueryValue::Multiple`] in arrival order.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut params = Self::new();
        for (key, value) in pairs {
            let key = key.into();
            let value = value.into();
            match params.entries.iter_mut().find(|(k, _)| *k == key) {
                Some((_, existing)) => {
                    let merged = match std::mem::replace(existing, QueryValue::Null) {
                        QueryValue::Null => QueryValue::Single(value),
                        QueryValue::Single(first) => QueryValue::Multiple(vec![first, value]),
                        QueryValue::Multiple(mut values) => {
                            values.push(value);
                            QueryValue::Multiple(values)
                        }
                    };
                    *existing = merged;
                }
                None => params.entries.push((key, QueryValue::Single(value))),
            }
        }
        params
    }

    /// Set `key`, replacing an existing value in place or appending.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<QueryValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&QueryValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &QueryValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<QueryValue>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

impl Serialize for QueryParams {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for QueryParams {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ParamsVisitor;

        impl<'de> Visitor<'de> for ParamsVisitor {
            type Value = QueryParams;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of query parameters")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut params = QueryParams::new();
                while let Some((key, value)) = access.next_entry::<String, QueryValue>()? {
                    params.insert(key, value);
                }
                Ok(params)
            }
        }

        deserializer.deserialize_map(ParamsVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_pairs_merge_into_list() {
        let params = QueryParams::from_pairs([("period", "1d"), ("API", "a"), ("API", "b")]);
        assert_eq!(params.len(), 2);
        assert_eq!(params.get("period"), Some(&QueryValue::Single("1d".into())));
        assert_eq!(
            params.get("API"),
            Some(&QueryValue::Multiple(vec!["a".into(), "b".into()]))
        );
    }

    #[test]
    fn insert_replaces_without_reordering() {
        let mut params = QueryParams::new();
        params.insert("period", "1d");
        params.insert("API", "a");
        params.insert("period", "5m");
        let keys: Vec<_> = params.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["period", "API"]);
        assert_eq!(params.get("period"), Some(&QueryValue::Single("5m".into())));
    }

    #[test]
    fn json_keeps_key_order_and_nulls() {
        let params: QueryParams = serde_json::from_str(
            r#"{"period":"1d","API":null,"APPLICATION":["x","y"],"EMPTY":""}"#,
        )
        .unwrap();
        let keys: Vec<_> = params.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["period", "API", "APPLICATION", "EMPTY"]);
        assert_eq!(params.get("API"), Some(&QueryValue::Null));
        assert_eq!(params.get("EMPTY"), Some(&QueryValue::Single(String::new())));

        let back = serde_json::to_string(&params).unwrap();
        assert_eq!(
            back,
            r#"{"period":"1d","API":null,"APPLICATION":["x","y"],"EMPTY":""}"#
        );
    }

    #[test]
    fn scalars_are_coerced_to_strings() {
        let params: QueryParams = serde_json::from_str(
            r#"{
                "period": "custom",
                "from": 1704067200000,
                "to": 1704153600000,
                "SAMPLED": true,
                "API": [1, null, "b"]
            }"#,
        )
        .unwrap();
        assert_eq!(params.get("from"), Some(&QueryValue::Single("1704067200000".into())));
        assert_eq!(params.get("to"), Some(&QueryValue::Single("1704153600000".into())));
        assert_eq!(params.get("SAMPLED"), Some(&QueryValue::Single("true".into())));
        assert_eq!(
            params.get("API"),
            Some(&QueryValue::Multiple(vec!["1".into(), "b".into()]))
        );
    }

    #[test]
    fn joined_flattens_lists() {
        assert_eq!(QueryValue::Null.joined(), None);
        assert_eq!(
            QueryValue::Multiple(vec!["a".into(), "b".into()]).joined().as_deref(),
            Some("a,b")
        );
    }
}
