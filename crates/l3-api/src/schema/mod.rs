//! Resource attribute schema
//!
//! Static description of the `routers` and `floatingips` resources: which
//! attributes may be supplied on create (POST) and update (PUT), which are
//! returned in responses, their defaults, and the validator/converter each
//! value must pass. The generic request pipeline in [`crate::request`] is
//! driven entirely by these tables.

mod attributes;
pub mod converters;
pub mod validators;

#[cfg(test)]
mod validators_test;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;
use uuid::Uuid;

use crate::error::L3Error;

pub use attributes::{
    resource_attribute_map, EXTERNAL_GW_INFO, NAME_FIELD_SIZE, PROJECT_ID_FIELD_SIZE,
};
pub use converters::Converter;
pub use validators::Validator;

/// Resource kinds defined by the L3 extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Router,
    FloatingIp,
}

impl ResourceKind {
    /// All resources, in registration order
    pub const ALL: [ResourceKind; 2] = [ResourceKind::Router, ResourceKind::FloatingIp];

    /// Collection name used in URLs and the attribute map
    pub fn collection(self) -> &'static str {
        match self {
            ResourceKind::Router => "routers",
            ResourceKind::FloatingIp => "floatingips",
        }
    }

    /// Member name used as the request/response body key
    pub fn member(self) -> &'static str {
        match self {
            ResourceKind::Router => "router",
            ResourceKind::FloatingIp => "floatingip",
        }
    }

    /// Look up a resource by collection name
    pub fn from_collection(collection: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.collection() == collection)
    }

    /// Attribute schema for this resource
    pub fn schema(self) -> &'static ResourceSchema {
        resource_attribute_map().resource(self)
    }

    /// The NotFound condition for an id of this kind
    pub fn not_found(self, id: Uuid) -> L3Error {
        match self {
            ResourceKind::Router => L3Error::RouterNotFound { router_id: id },
            ResourceKind::FloatingIp => L3Error::FloatingIPNotFound { floatingip_id: id },
        }
    }
}

/// Metadata of a single resource attribute
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeSpec {
    #[serde(skip)]
    pub name: &'static str,
    /// May be supplied on create
    pub allow_post: bool,
    /// May be supplied on update
    pub allow_put: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validate: Option<Validator>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub convert_to: Option<Converter>,
    /// Returned in responses
    pub is_visible: bool,
    /// Substituted on create when absent. `Some(Value::Null)` is an explicit
    /// null default; `None` makes the attribute required on create.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub primary_key: bool,
    /// Presence is decided by the authorization layer
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub required_by_policy: bool,
    /// Mutation is gated by the authorization layer
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub enforce_policy: bool,
}

impl AttributeSpec {
    /// Read-only, invisible attribute with no validation
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            allow_post: false,
            allow_put: false,
            validate: None,
            convert_to: None,
            is_visible: false,
            default: None,
            primary_key: false,
            required_by_policy: false,
            enforce_policy: false,
        }
    }

    pub fn allow_post(mut self) -> Self {
        self.allow_post = true;
        self
    }

    pub fn allow_put(mut self) -> Self {
        self.allow_put = true;
        self
    }

    pub fn validate(mut self, validator: Validator) -> Self {
        self.validate = Some(validator);
        self
    }

    pub fn convert_to(mut self, converter: Converter) -> Self {
        self.convert_to = Some(converter);
        self
    }

    pub fn visible(mut self) -> Self {
        self.is_visible = true;
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn required_by_policy(mut self) -> Self {
        self.required_by_policy = true;
        self
    }

    pub fn enforce_policy(mut self) -> Self {
        self.enforce_policy = true;
        self
    }

    /// Required on create: accepted on POST and no default to fall back on
    pub fn is_required_on_create(&self) -> bool {
        self.allow_post && self.default.is_none()
    }

    /// Run the converter then the validator against `value`
    pub fn check(&self, value: &mut Value) -> Result<(), L3Error> {
        if let Some(converter) = self.convert_to {
            *value = converter
                .apply(value)
                .map_err(|message| L3Error::invalid_input(self.name, message))?;
        }
        if let Some(validator) = &self.validate {
            validator
                .validate(value)
                .map_err(|message| L3Error::invalid_input(self.name, message))?;
        }
        Ok(())
    }
}

/// Attribute table of one resource, in declaration order
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSchema {
    attributes: Vec<AttributeSpec>,
}

impl ResourceSchema {
    pub fn new(attributes: Vec<AttributeSpec>) -> Self {
        Self { attributes }
    }

    pub fn get(&self, name: &str) -> Option<&AttributeSpec> {
        self.attributes.iter().find(|attr| attr.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AttributeSpec> {
        self.attributes.iter()
    }

    /// Name of the primary key attribute
    pub fn primary_key(&self) -> Option<&'static str> {
        self.attributes.iter().find(|attr| attr.primary_key).map(|attr| attr.name)
    }

    /// Add an attribute unless one with the same name already exists.
    /// Returns whether it was added.
    pub fn merge_attribute(&mut self, attribute: AttributeSpec) -> bool {
        if self.contains(attribute.name) {
            return false;
        }
        self.attributes.push(attribute);
        true
    }
}

impl Serialize for ResourceSchema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.attributes.len()))?;
        for attr in &self.attributes {
            map.serialize_entry(attr.name, attr)?;
        }
        map.end()
    }
}

/// Resource collection name to attribute table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeMap {
    resources: Vec<(&'static str, ResourceSchema)>,
}

impl AttributeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, collection: &'static str, schema: ResourceSchema) {
        match self.resources.iter_mut().find(|(name, _)| *name == collection) {
            Some((_, existing)) => *existing = schema,
            None => self.resources.push((collection, schema)),
        }
    }

    pub fn get(&self, collection: &str) -> Option<&ResourceSchema> {
        self.resources
            .iter()
            .find(|(name, _)| *name == collection)
            .map(|(_, schema)| schema)
    }

    pub fn get_mut(&mut self, collection: &str) -> Option<&mut ResourceSchema> {
        self.resources
            .iter_mut()
            .find(|(name, _)| *name == collection)
            .map(|(_, schema)| schema)
    }

    /// Attribute table of a built-in resource.
    ///
    /// Only valid on the registry built by [`resource_attribute_map`], which
    /// always holds every [`ResourceKind`].
    fn resource(&self, kind: ResourceKind) -> &ResourceSchema {
        static EMPTY: std::sync::LazyLock<ResourceSchema> =
            std::sync::LazyLock::new(|| ResourceSchema::new(Vec::new()));
        self.get(kind.collection()).unwrap_or(&EMPTY)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &ResourceSchema)> {
        self.resources.iter().map(|(name, schema)| (*name, schema))
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }
}

impl Serialize for AttributeMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.resources.len()))?;
        for (name, schema) in &self.resources {
            map.serialize_entry(name, schema)?;
        }
        map.end()
    }
}

/// Render a JSON value the way error messages quote user input
pub(crate) fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "None".to_string(),
        other => other.to_string(),
    }
}
