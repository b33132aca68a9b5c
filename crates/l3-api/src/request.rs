//! Request preparation and response shaping
//!
//! Turns a raw JSON request body into a validated attribute map using only
//! the resource schema, and filters response objects down to visible (and
//! requested) attributes.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

use crate::context::RequestContext;
use crate::error::L3Error;
use crate::models::{FloatingIpSpec, FloatingIpUpdate, RouterInterfaceInfo, RouterSpec, RouterUpdate};
use crate::schema::{ResourceKind, ResourceSchema};

const TENANT_ID: &str = "tenant_id";

/// Kind of request being prepared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Update,
}

impl Action {
    /// HTTP method the action is exposed as
    pub fn method(self) -> &'static str {
        match self {
            Action::Create => "POST",
            Action::Update => "PUT",
        }
    }
}

/// Validate a request body of the form `{"<member>": {...}}`.
///
/// Unknown attributes and attributes not allowed for `action` are rejected.
/// On create, defaults are filled in, the tenant is taken from the context
/// when absent, and attributes without a default are required. Converters
/// run before validators.
pub fn prepare_request_body(
    context: &RequestContext,
    kind: ResourceKind,
    body: &Value,
    action: Action,
) -> Result<Map<String, Value>, L3Error> {
    let member = kind.member();
    let mut attrs = body
        .get(member)
        .and_then(Value::as_object)
        .cloned()
        .ok_or_else(|| L3Error::BadRequest {
            resource: member,
            message: format!("Unable to find '{}' in request body", member),
        })?;

    let schema = kind.schema();
    verify_attributes(schema, &attrs)?;

    if action == Action::Create && schema.contains(TENANT_ID) {
        populate_tenant_id(context, member, &mut attrs)?;
    }

    for attr in schema.iter() {
        let present = attrs.contains_key(attr.name);
        match action {
            Action::Create if present && !attr.allow_post => {
                return Err(L3Error::AttributeNotAllowed {
                    attribute: attr.name.to_string(),
                    method: action.method(),
                });
            }
            Action::Create if !present && attr.allow_post => match &attr.default {
                Some(default) => {
                    attrs.insert(attr.name.to_string(), default.clone());
                }
                None => return Err(L3Error::MissingAttribute(attr.name.to_string())),
            },
            Action::Update if present && !attr.allow_put => {
                return Err(L3Error::AttributeNotAllowed {
                    attribute: attr.name.to_string(),
                    method: action.method(),
                });
            }
            _ => {}
        }
    }

    for attr in schema.iter() {
        if let Some(value) = attrs.get_mut(attr.name) {
            attr.check(value)?;
        }
    }

    debug!(
        "Prepared {} {} body with attributes {:?}",
        member,
        action.method(),
        attrs.keys().collect::<Vec<_>>()
    );
    Ok(attrs)
}

fn verify_attributes(schema: &ResourceSchema, attrs: &Map<String, Value>) -> Result<(), L3Error> {
    let unknown: Vec<&str> = attrs
        .keys()
        .map(String::as_str)
        .filter(|name| !schema.contains(name))
        .collect();
    if unknown.is_empty() {
        Ok(())
    } else {
        Err(L3Error::UnrecognizedAttributes(unknown.join(", ")))
    }
}

fn populate_tenant_id(
    context: &RequestContext,
    member: &'static str,
    attrs: &mut Map<String, Value>,
) -> Result<(), L3Error> {
    match (attrs.get(TENANT_ID), context.tenant_id.as_deref()) {
        (None, Some(tenant_id)) => {
            attrs.insert(TENANT_ID.to_string(), Value::String(tenant_id.to_string()));
            Ok(())
        }
        (None, None) => Err(L3Error::MissingAttribute(TENANT_ID.to_string())),
        (Some(requested), scoped) if !context.is_admin && requested.as_str() != scoped => {
            Err(L3Error::BadRequest {
                resource: member,
                message: "Specifying 'tenant_id' other than authenticated tenant in request \
                          requires admin privileges"
                    .to_string(),
            })
        }
        _ => Ok(()),
    }
}

/// Keep only visible attributes and, when `fields` is given, only those
/// listed. Attributes unknown to the schema are dropped.
pub fn filter_response(kind: ResourceKind, value: &Map<String, Value>, fields: Option<&[String]>) -> Map<String, Value> {
    let schema = kind.schema();
    value
        .iter()
        .filter(|(name, _)| schema.get(name).is_some_and(|attr| attr.is_visible))
        .filter(|(name, _)| fields.is_none_or(|fields| fields.iter().any(|f| f == *name)))
        .map(|(name, v)| (name.clone(), v.clone()))
        .collect()
}

fn into_typed<T: DeserializeOwned>(kind: ResourceKind, attrs: Map<String, Value>) -> Result<T, L3Error> {
    serde_json::from_value(Value::Object(attrs)).map_err(|e| L3Error::BadRequest {
        resource: kind.member(),
        message: e.to_string(),
    })
}

/// Prepare and deserialize a router create body
pub fn parse_router_create(context: &RequestContext, body: &Value) -> Result<RouterSpec, L3Error> {
    let attrs = prepare_request_body(context, ResourceKind::Router, body, Action::Create)?;
    into_typed(ResourceKind::Router, attrs)
}

/// Prepare and deserialize a router update body
pub fn parse_router_update(context: &RequestContext, body: &Value) -> Result<RouterUpdate, L3Error> {
    let attrs = prepare_request_body(context, ResourceKind::Router, body, Action::Update)?;
    into_typed(ResourceKind::Router, attrs)
}

/// Prepare and deserialize a floating IP create body
pub fn parse_floatingip_create(context: &RequestContext, body: &Value) -> Result<FloatingIpSpec, L3Error> {
    let attrs = prepare_request_body(context, ResourceKind::FloatingIp, body, Action::Create)?;
    into_typed(ResourceKind::FloatingIp, attrs)
}

/// Prepare and deserialize a floating IP update body
pub fn parse_floatingip_update(context: &RequestContext, body: &Value) -> Result<FloatingIpUpdate, L3Error> {
    let attrs = prepare_request_body(context, ResourceKind::FloatingIp, body, Action::Update)?;
    into_typed(ResourceKind::FloatingIp, attrs)
}

/// Deserialize the body of an `add_router_interface` / `remove_router_interface` action
pub fn parse_interface_info(body: &Value) -> Result<RouterInterfaceInfo, L3Error> {
    let bad_request = |message: String| L3Error::BadRequest { resource: "router", message };
    let Some(attrs) = body.as_object() else {
        return Err(bad_request("Interface info must be a dictionary".to_string()));
    };
    let info: RouterInterfaceInfo =
        serde_json::from_value(Value::Object(attrs.clone())).map_err(|e| bad_request(e.to_string()))?;
    if info.subnet_id.is_none() && info.port_id.is_none() {
        return Err(bad_request("Either subnet_id or port_id must be specified".to_string()));
    }
    Ok(info)
}
