//! Value converters applied before validation

use serde::Serialize;
use serde_json::{Map, Value};

use super::display_value;

/// Named converters referenced by the attribute tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Converter {
    /// Boolean-like input (`"true"`, `"0"`, `1`, ...) to a JSON boolean
    #[serde(rename = "convert_to_boolean")]
    ToBoolean,
    /// `key=value` notation to a structured object
    #[serde(rename = "convert_kvp_list_to_dict")]
    KvpListToDict,
}

impl Converter {
    /// Convert an attribute value
    pub fn apply(self, value: &Value) -> Result<Value, String> {
        match self {
            Converter::ToBoolean => convert_to_boolean(value),
            Converter::KvpListToDict => match value {
                Value::Array(items) => {
                    let kvp_list = items
                        .iter()
                        .map(|item| {
                            item.as_str()
                                .map(str::to_string)
                                .ok_or_else(|| format!("'{}' is not of the form <key>=[value]", display_value(item)))
                        })
                        .collect::<Result<Vec<_>, _>>()?;
                    convert_kvp_list_to_dict(&kvp_list).map(Value::Object)
                }
                other => Ok(other.clone()),
            },
        }
    }

    /// Convert every element of a list value.
    ///
    /// String elements in `key=value[,key=value]` notation become objects with
    /// one scalar per key (or a list when a key repeats). Other elements, and
    /// non-list values, pass through for the validator to judge.
    pub fn apply_to_list(self, value: &Value) -> Result<Value, String> {
        let Value::Array(items) = value else {
            return Ok(value.clone());
        };
        let converted = items
            .iter()
            .map(|item| match (self, item) {
                (Converter::KvpListToDict, Value::String(entry)) => {
                    let pairs: Vec<String> =
                        entry.split(',').map(|pair| pair.trim().to_string()).collect();
                    convert_kvp_list_to_dict(&pairs).map(collapse_single_values)
                }
                (Converter::KvpListToDict, other) => Ok(other.clone()),
                (converter, other) => converter.apply(other),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Value::Array(converted))
    }
}

/// Accepts booleans, `0`/`1`, and the strings `true`/`false`/`1`/`0` in any case
pub fn convert_to_boolean(value: &Value) -> Result<Value, String> {
    let converted = match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(s) => match s.to_ascii_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    };
    converted
        .map(Value::Bool)
        .ok_or_else(|| format!("'{}' cannot be converted to boolean", display_value(value)))
}

/// `["a=1", "a=2", "b=3"]` into `{"a": ["1", "2"], "b": ["3"]}`
///
/// Repeated values for a key are kept once, in first-seen order.
pub fn convert_kvp_list_to_dict(kvp_list: &[String]) -> Result<Map<String, Value>, String> {
    let mut dict: Map<String, Value> = Map::new();
    for kvp in kvp_list {
        let (key, value) = convert_kvp_str_to_list(kvp)?;
        let values = dict
            .entry(key)
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(values) = values {
            let value = Value::String(value);
            if !values.contains(&value) {
                values.push(value);
            }
        }
    }
    Ok(dict)
}

fn convert_kvp_str_to_list(kvp: &str) -> Result<(String, String), String> {
    match kvp.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("'{}' is not of the form <key>=[value]", kvp)),
    }
}

fn collapse_single_values(dict: Map<String, Value>) -> Value {
    Value::Object(
        dict.into_iter()
            .map(|(key, value)| match value {
                Value::Array(mut values) if values.len() == 1 => (key, values.remove(0)),
                other => (key, other),
            })
            .collect(),
    )
}
