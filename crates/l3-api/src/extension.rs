//! L3 extension descriptor
//!
//! Metadata the API server needs to mount the `routers` and `floatingips`
//! collections: naming, REST resource layout, member actions, the versioned
//! attribute map and quota registration.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::L3Config;
use crate::schema::{resource_attribute_map, AttributeMap, ResourceKind};

/// API version whose attribute map this extension extends
pub const API_VERSION: &str = "2.0";

/// Service plugin type the resources are dispatched to
pub const L3_ROUTER_NAT: &str = "L3_ROUTER_NAT";

pub const ADD_ROUTER_INTERFACE: &str = "add_router_interface";
pub const REMOVE_ROUTER_INTERFACE: &str = "remove_router_interface";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

/// REST layout of one resource collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceInfo {
    pub collection: &'static str,
    pub member: &'static str,
    /// Action name to HTTP method, mounted under the member path
    pub member_actions: BTreeMap<&'static str, HttpMethod>,
    pub register_quota: bool,
    pub plugin: &'static str,
}

impl ResourceInfo {
    fn new(kind: ResourceKind) -> Self {
        let member_actions = match kind {
            ResourceKind::Router => BTreeMap::from([
                (ADD_ROUTER_INTERFACE, HttpMethod::Put),
                (REMOVE_ROUTER_INTERFACE, HttpMethod::Put),
            ]),
            ResourceKind::FloatingIp => BTreeMap::new(),
        };
        Self {
            collection: kind.collection(),
            member: kind.member(),
            member_actions,
            register_quota: true,
            plugin: L3_ROUTER_NAT,
        }
    }

    /// `/routers`
    pub fn collection_path(&self) -> String {
        format!("/{}", self.collection)
    }

    /// `/routers/{id}`
    pub fn member_path(&self) -> String {
        format!("/{}/{{id}}", self.collection)
    }

    /// Path and method of a member action, if the resource defines it
    pub fn action(&self, action: &str) -> Option<(String, HttpMethod)> {
        self.member_actions
            .get_key_value(action)
            .map(|(name, method)| (format!("{}/{}", self.member_path(), name), *method))
    }
}

/// Sink for default quota limits
pub trait QuotaRegistry {
    fn register_resource(&mut self, resource: &str, default_limit: i64);
}

impl QuotaRegistry for BTreeMap<String, i64> {
    fn register_resource(&mut self, resource: &str, default_limit: i64) {
        self.insert(resource.to_string(), default_limit);
    }
}

/// Serializable summary of the extension
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtensionDescriptor {
    pub name: &'static str,
    pub alias: &'static str,
    pub description: &'static str,
    pub updated: &'static str,
    pub resources: Vec<ResourceInfo>,
}

/// The L3 router extension
#[derive(Debug, Clone, Default)]
pub struct L3Extension {
    config: L3Config,
}

impl L3Extension {
    pub fn new(config: L3Config) -> Self {
        Self { config }
    }

    pub fn name(&self) -> &'static str {
        "Neutron L3 Router"
    }

    pub fn alias(&self) -> &'static str {
        "router"
    }

    pub fn description(&self) -> &'static str {
        "Router abstraction for basic L3 forwarding between L2 Neutron networks and access to external networks via a NAT gateway."
    }

    pub fn updated(&self) -> &'static str {
        "2012-07-20T10:00:00-00:00"
    }

    pub fn resources(&self) -> Vec<ResourceInfo> {
        ResourceKind::ALL.into_iter().map(ResourceInfo::new).collect()
    }

    /// Attributes this extension contributes to API `version`
    pub fn extended_resources(&self, version: &str) -> AttributeMap {
        if version == API_VERSION {
            resource_attribute_map().clone()
        } else {
            debug!("No extended resources for API version {}", version);
            AttributeMap::new()
        }
    }

    /// Merge extension attributes into resources already present in
    /// `attributes`. Existing attribute definitions are kept.
    pub fn update_attributes_map(&self, attributes: &mut AttributeMap) {
        for (collection, schema) in resource_attribute_map().iter() {
            let Some(target) = attributes.get_mut(collection) else {
                continue;
            };
            let added = schema
                .iter()
                .filter(|attr| target.merge_attribute((*attr).clone()))
                .count();
            debug!("Merged {} attribute(s) into {}", added, collection);
        }
    }

    /// Register default quota limits for routers and floating IPs
    pub fn register_quotas(&self, registry: &mut dyn QuotaRegistry) {
        registry.register_resource(ResourceKind::Router.member(), self.config.quota_router);
        registry.register_resource(ResourceKind::FloatingIp.member(), self.config.quota_floatingip);
        info!(
            "Registered L3 quotas: router={}, floatingip={}",
            self.config.quota_router, self.config.quota_floatingip
        );
    }

    pub fn descriptor(&self) -> ExtensionDescriptor {
        ExtensionDescriptor {
            name: self.name(),
            alias: self.alias(),
            description: self.description(),
            updated: self.updated(),
            resources: self.resources(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttributeSpec, ResourceSchema};

    #[test]
    fn test_metadata() {
        let ext = L3Extension::default();
        assert_eq!(ext.name(), "Neutron L3 Router");
        assert_eq!(ext.alias(), "router");
        assert_eq!(ext.updated(), "2012-07-20T10:00:00-00:00");
    }

    #[test]
    fn test_router_resource_layout() {
        let resources = L3Extension::default().resources();
        assert_eq!(resources.len(), 2);

        let routers = &resources[0];
        assert_eq!(routers.collection_path(), "/routers");
        assert_eq!(routers.member_path(), "/routers/{id}");
        assert_eq!(
            routers.action(ADD_ROUTER_INTERFACE),
            Some(("/routers/{id}/add_router_interface".to_string(), HttpMethod::Put))
        );
        assert!(routers.action("reboot").is_none());

        let floatingips = &resources[1];
        assert_eq!(floatingips.member, "floatingip");
        assert!(floatingips.member_actions.is_empty());
        assert!(floatingips.register_quota);
    }

    #[test]
    fn test_extended_resources_by_version() {
        let ext = L3Extension::default();
        let map = ext.extended_resources("2.0");
        assert!(map.get("routers").is_some());
        assert!(map.get("floatingips").is_some());
        assert!(ext.extended_resources("1.0").is_empty());
    }

    #[test]
    fn test_update_attributes_map_keeps_existing() {
        let custom_name = AttributeSpec::new("name").allow_post().visible();
        let mut map = AttributeMap::new();
        map.insert("routers", ResourceSchema::new(vec![custom_name.clone()]));

        L3Extension::default().update_attributes_map(&mut map);

        let routers = map.get("routers").unwrap();
        assert_eq!(routers.get("name"), Some(&custom_name));
        assert!(routers.contains("external_gateway_info"));
        // Resources not already present are left out
        assert!(map.get("floatingips").is_none());
    }

    #[test]
    fn test_register_quotas() {
        let ext = L3Extension::new(L3Config {
            quota_router: 3,
            quota_floatingip: -1,
        });
        let mut registry: BTreeMap<String, i64> = BTreeMap::new();
        ext.register_quotas(&mut registry);
        assert_eq!(registry.get("router"), Some(&3));
        assert_eq!(registry.get("floatingip"), Some(&-1));
    }
}
