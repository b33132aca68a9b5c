//! Router and floating IP models
//!
//! Response models mirror the attributes declared in the resource schema
//! (see [`crate::schema`]). Request models are what a prepared request body
//! (defaults filled, values converted and validated) deserializes into.

use std::net::IpAddr;

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::schema::ResourceKind;

/// Resources exposed through the L3 API
pub trait ApiResource: Serialize {
    /// Schema entry describing this resource
    const KIND: ResourceKind;

    /// Primary key
    fn id(&self) -> Uuid;
}

/// Router lifecycle state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RouterStatus {
    #[default]
    Active,
    Allocating,
    Error,
}

/// Floating IP state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FloatingIpStatus {
    Active,
    #[default]
    Down,
    Error,
}

/// A fixed IP on the external network used by a router gateway
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ExternalFixedIp {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnet_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<IpAddr>,
}

/// Router external gateway
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ExternalGatewayInfo {
    pub network_id: Uuid,
    #[serde(default)]
    pub external_fixed_ips: Option<Vec<ExternalFixedIp>>,
}

/// Router as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Router {
    pub id: Uuid,
    pub name: String,
    pub admin_state_up: bool,
    pub status: RouterStatus,
    pub tenant_id: String,
    pub external_gateway_info: Option<ExternalGatewayInfo>,
}

impl ApiResource for Router {
    const KIND: ResourceKind = ResourceKind::Router;

    fn id(&self) -> Uuid {
        self.id
    }
}

/// Floating IP as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct FloatingIp {
    pub id: Uuid,
    pub floating_ip_address: IpAddr,
    pub floating_network_id: Uuid,
    pub router_id: Option<Uuid>,
    pub port_id: Option<Uuid>,
    pub fixed_ip_address: Option<IpAddr>,
    pub tenant_id: String,
    pub status: FloatingIpStatus,
}

impl ApiResource for FloatingIp {
    const KIND: ResourceKind = ResourceKind::FloatingIp;

    fn id(&self) -> Uuid {
        self.id
    }
}

fn default_admin_state_up() -> bool {
    true
}

/// Router create request
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct RouterSpec {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_admin_state_up")]
    pub admin_state_up: bool,
    pub tenant_id: String,
    #[serde(default)]
    pub external_gateway_info: Option<ExternalGatewayInfo>,
}

impl RouterSpec {
    /// Minimal spec for a tenant, everything else defaulted
    pub fn new(tenant_id: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            admin_state_up: true,
            tenant_id: tenant_id.into(),
            external_gateway_info: None,
        }
    }
}

/// Router update request
///
/// `None` leaves an attribute untouched. For `external_gateway_info`,
/// `Some(None)` clears the gateway.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct RouterUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_state_up: Option<bool>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub external_gateway_info: Option<Option<ExternalGatewayInfo>>,
}

/// Floating IP create request
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct FloatingIpSpec {
    pub floating_network_id: Uuid,
    #[serde(default)]
    pub floating_ip_address: Option<IpAddr>,
    #[serde(default)]
    pub subnet_id: Option<Uuid>,
    #[serde(default)]
    pub port_id: Option<Uuid>,
    #[serde(default)]
    pub fixed_ip_address: Option<IpAddr>,
    pub tenant_id: String,
}

impl FloatingIpSpec {
    /// Unassociated floating IP on an external network
    pub fn new(tenant_id: impl Into<String>, floating_network_id: Uuid) -> Self {
        Self {
            floating_network_id,
            floating_ip_address: None,
            subnet_id: None,
            port_id: None,
            fixed_ip_address: None,
            tenant_id: tenant_id.into(),
        }
    }
}

/// Floating IP update request
///
/// `port_id: Some(None)` disassociates the floating IP.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct FloatingIpUpdate {
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub port_id: Option<Option<Uuid>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub fixed_ip_address: Option<Option<IpAddr>>,
}

/// Body of `add_router_interface` / `remove_router_interface`
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct RouterInterfaceInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnet_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port_id: Option<Uuid>,
}

impl RouterInterfaceInfo {
    /// Interface identified by subnet
    pub fn subnet(subnet_id: Uuid) -> Self {
        Self { subnet_id: Some(subnet_id), port_id: None }
    }

    /// Interface identified by port
    pub fn port(port_id: Uuid) -> Self {
        Self { subnet_id: None, port_id: Some(port_id) }
    }
}

/// Descriptor returned when attaching or detaching a router interface
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct RouterInterface {
    /// Router id
    pub id: Uuid,
    pub tenant_id: String,
    pub port_id: Uuid,
    pub subnet_id: Uuid,
    pub subnet_ids: Vec<Uuid>,
    pub network_id: Uuid,
}

/// Distinguishes an absent field (`None`) from an explicit null (`Some(None)`)
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_router_update_distinguishes_null_gateway() {
        let clear: RouterUpdate =
            serde_json::from_value(json!({"external_gateway_info": null})).unwrap();
        assert_eq!(clear.external_gateway_info, Some(None));

        let untouched: RouterUpdate = serde_json::from_value(json!({"name": "r1"})).unwrap();
        assert_eq!(untouched.external_gateway_info, None);
        assert_eq!(untouched.name.as_deref(), Some("r1"));
    }

    #[test]
    fn test_floatingip_update_disassociate() {
        let update: FloatingIpUpdate = serde_json::from_value(json!({"port_id": null})).unwrap();
        assert_eq!(update.port_id, Some(None));
        assert_eq!(update.fixed_ip_address, None);
    }

    #[test]
    fn test_router_spec_defaults() {
        let spec: RouterSpec = serde_json::from_value(json!({"tenant_id": "t1"})).unwrap();
        assert!(spec.admin_state_up);
        assert_eq!(spec.name, "");
        assert!(spec.external_gateway_info.is_none());
    }

    #[test]
    fn test_status_wire_format() {
        assert_eq!(serde_json::to_value(RouterStatus::Active).unwrap(), json!("ACTIVE"));
        assert_eq!(serde_json::to_value(FloatingIpStatus::Down).unwrap(), json!("DOWN"));
    }
}
