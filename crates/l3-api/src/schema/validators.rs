//! Attribute validators
//!
//! A closed set of named rules. Each returns `Err(reason)` with a
//! human-readable reason; [`super::AttributeSpec::check`] wraps it into
//! [`crate::L3Error::InvalidInput`] with the attribute name.

use std::collections::HashSet;
use std::net::IpAddr;

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use super::converters::Converter;
use super::display_value;

/// Named validation rules referenced by the attribute tables
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Validator {
    #[serde(rename = "type:uuid")]
    Uuid,
    #[serde(rename = "type:uuid_or_none")]
    UuidOrNone,
    #[serde(rename = "type:string")]
    String { max_len: usize },
    #[serde(rename = "type:ip_address_or_none")]
    IpAddressOrNone,
    #[serde(rename = "type:fixed_ips")]
    FixedIps,
    /// Absent/empty, or an object matching the nested key specs
    #[serde(rename = "type:dict_or_nodata")]
    DictOrNoData(Vec<NestedAttributeSpec>),
}

impl Validator {
    /// Validate `value`. Dict validators convert nested values in place.
    pub fn validate(&self, value: &mut Value) -> Result<(), String> {
        match self {
            Validator::Uuid => validate_uuid(value),
            Validator::UuidOrNone => validate_uuid_or_none(value),
            Validator::String { max_len } => validate_string(value, *max_len),
            Validator::IpAddressOrNone => validate_ip_address_or_none(value),
            Validator::FixedIps => validate_fixed_ips(value),
            Validator::DictOrNoData(key_specs) => validate_dict_or_nodata(value, key_specs),
        }
    }
}

/// Per-key rule inside a dict-valued attribute
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NestedAttributeSpec {
    #[serde(skip)]
    pub name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validate: Option<Box<Validator>>,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub convert_list_to: Option<Converter>,
}

impl NestedAttributeSpec {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            validate: None,
            required: false,
            default: None,
            convert_list_to: None,
        }
    }

    pub fn validate(mut self, validator: Validator) -> Self {
        self.validate = Some(Box::new(validator));
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn convert_list_to(mut self, converter: Converter) -> Self {
        self.convert_list_to = Some(converter);
        self
    }
}

pub fn validate_uuid(value: &Value) -> Result<(), String> {
    match value.as_str() {
        Some(s) if Uuid::parse_str(s).is_ok() => Ok(()),
        _ => Err(format!("'{}' is not a valid UUID", display_value(value))),
    }
}

pub fn validate_uuid_or_none(value: &Value) -> Result<(), String> {
    if value.is_null() {
        return Ok(());
    }
    validate_uuid(value)
}

pub fn validate_string(value: &Value, max_len: usize) -> Result<(), String> {
    let Some(s) = value.as_str() else {
        return Err(format!("'{}' is not a valid string", display_value(value)));
    };
    if s.chars().count() > max_len {
        return Err(format!("'{}' exceeds maximum length of {}", s, max_len));
    }
    Ok(())
}

pub fn validate_ip_address(value: &Value) -> Result<(), String> {
    match value.as_str() {
        Some(s) if s.parse::<IpAddr>().is_ok() => Ok(()),
        _ => Err(format!("'{}' is not a valid IP address", display_value(value))),
    }
}

pub fn validate_ip_address_or_none(value: &Value) -> Result<(), String> {
    if value.is_null() {
        return Ok(());
    }
    validate_ip_address(value)
}

/// A list of `{subnet_id?, ip_address?}` objects without duplicate addresses.
/// Null is accepted as "no fixed IPs".
pub fn validate_fixed_ips(value: &Value) -> Result<(), String> {
    if value.is_null() {
        return Ok(());
    }
    let Some(entries) = value.as_array() else {
        return Err(format!("Invalid data format for fixed IP: '{}'", display_value(value)));
    };

    let mut seen = HashSet::new();
    for entry in entries {
        let Some(fixed_ip) = entry.as_object() else {
            return Err(format!("Invalid data format for fixed IP: '{}'", display_value(entry)));
        };
        if let Some(ip_address) = fixed_ip.get("ip_address") {
            validate_ip_address(ip_address)?;
            let normalized = ip_address
                .as_str()
                .and_then(|s| s.parse::<IpAddr>().ok());
            if !seen.insert(normalized) {
                return Err(format!("Duplicate IP address '{}'", display_value(ip_address)));
            }
        }
        if let Some(subnet_id) = fixed_ip.get("subnet_id") {
            validate_uuid(subnet_id)?;
        }
    }
    Ok(())
}

/// Null or an empty object pass (an empty object is normalized to null);
/// anything else must satisfy [`validate_dict`]
pub fn validate_dict_or_nodata(value: &mut Value, key_specs: &[NestedAttributeSpec]) -> Result<(), String> {
    let is_empty = match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    };
    if is_empty {
        *value = Value::Null;
        return Ok(());
    }
    validate_dict(value, key_specs)
}

/// Recursive descent over a dict value: required keys must be present, every
/// present key is converted then validated by its own rule. Keys without a
/// spec are left alone.
pub fn validate_dict(value: &mut Value, key_specs: &[NestedAttributeSpec]) -> Result<(), String> {
    let rendered = display_value(value);
    let Value::Object(dict) = value else {
        return Err(format!("'{}' is not a dictionary", rendered));
    };

    let missing: Vec<&str> = key_specs
        .iter()
        .filter(|spec| spec.required && !dict.contains_key(spec.name))
        .map(|spec| spec.name)
        .collect();
    if !missing.is_empty() {
        return Err(format!("Validation of dictionary's keys failed. Expected keys: {:?}", missing));
    }

    for spec in key_specs {
        let Some(item) = dict.get_mut(spec.name) else {
            continue;
        };
        if let Some(converter) = spec.convert_list_to {
            *item = converter.apply_to_list(item)?;
        }
        if let Some(validator) = &spec.validate {
            validator.validate(item)?;
        }
    }
    Ok(())
}
