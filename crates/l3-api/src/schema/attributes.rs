//! Attribute tables for routers and floating IPs

use std::sync::LazyLock;

use serde_json::{json, Value};

use super::converters::Converter;
use super::validators::{NestedAttributeSpec, Validator};
use super::{AttributeMap, AttributeSpec, ResourceKind, ResourceSchema};

/// Maximum length of resource names
pub const NAME_FIELD_SIZE: usize = 255;

/// Maximum length of tenant/project identifiers
pub const PROJECT_ID_FIELD_SIZE: usize = 255;

/// Router attribute holding the external gateway
pub const EXTERNAL_GW_INFO: &str = "external_gateway_info";

static RESOURCE_ATTRIBUTE_MAP: LazyLock<AttributeMap> = LazyLock::new(|| {
    let mut map = AttributeMap::new();
    map.insert(ResourceKind::Router.collection(), router_attributes());
    map.insert(ResourceKind::FloatingIp.collection(), floatingip_attributes());
    map
});

/// The immutable attribute map of the L3 extension, built on first use
pub fn resource_attribute_map() -> &'static AttributeMap {
    &RESOURCE_ATTRIBUTE_MAP
}

fn id_attribute() -> AttributeSpec {
    AttributeSpec::new("id")
        .validate(Validator::Uuid)
        .visible()
        .primary_key()
}

fn tenant_id_attribute() -> AttributeSpec {
    AttributeSpec::new("tenant_id")
        .allow_post()
        .required_by_policy()
        .validate(Validator::String { max_len: PROJECT_ID_FIELD_SIZE })
        .visible()
}

fn status_attribute() -> AttributeSpec {
    AttributeSpec::new("status").visible()
}

fn router_attributes() -> ResourceSchema {
    ResourceSchema::new(vec![
        id_attribute(),
        AttributeSpec::new("name")
            .allow_post()
            .allow_put()
            .validate(Validator::String { max_len: NAME_FIELD_SIZE })
            .visible()
            .default_value(json!("")),
        AttributeSpec::new("admin_state_up")
            .allow_post()
            .allow_put()
            .default_value(json!(true))
            .convert_to(Converter::ToBoolean)
            .visible(),
        status_attribute(),
        tenant_id_attribute(),
        AttributeSpec::new(EXTERNAL_GW_INFO)
            .allow_post()
            .allow_put()
            .visible()
            .default_value(Value::Null)
            .enforce_policy()
            .validate(Validator::DictOrNoData(vec![
                NestedAttributeSpec::new("network_id")
                    .validate(Validator::Uuid)
                    .required(),
                NestedAttributeSpec::new("external_fixed_ips")
                    .convert_list_to(Converter::KvpListToDict)
                    .validate(Validator::FixedIps)
                    .default_value(Value::Null),
            ])),
    ])
}

fn floatingip_attributes() -> ResourceSchema {
    ResourceSchema::new(vec![
        id_attribute(),
        AttributeSpec::new("floating_ip_address")
            .allow_post()
            .validate(Validator::IpAddressOrNone)
            .visible()
            .default_value(Value::Null)
            .enforce_policy(),
        // input only
        AttributeSpec::new("subnet_id")
            .allow_post()
            .validate(Validator::UuidOrNone)
            .default_value(Value::Null),
        AttributeSpec::new("floating_network_id")
            .allow_post()
            .validate(Validator::Uuid)
            .visible(),
        AttributeSpec::new("router_id")
            .validate(Validator::UuidOrNone)
            .visible()
            .default_value(Value::Null),
        AttributeSpec::new("port_id")
            .allow_post()
            .allow_put()
            .validate(Validator::UuidOrNone)
            .visible()
            .default_value(Value::Null)
            .required_by_policy(),
        AttributeSpec::new("fixed_ip_address")
            .allow_post()
            .allow_put()
            .validate(Validator::IpAddressOrNone)
            .visible()
            .default_value(Value::Null),
        tenant_id_attribute(),
        status_attribute(),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_router_table() {
        let schema = ResourceKind::Router.schema();
        assert_eq!(schema.primary_key(), Some("id"));

        let admin = schema.get("admin_state_up").unwrap();
        assert_eq!(admin.default, Some(json!(true)));
        assert!(admin.allow_post && admin.allow_put);

        let status = schema.get("status").unwrap();
        assert!(!status.allow_post && !status.allow_put && status.is_visible);

        let tenant = schema.get("tenant_id").unwrap();
        assert!(tenant.allow_post && !tenant.allow_put && tenant.required_by_policy);
        assert!(tenant.is_required_on_create());

        assert!(schema.get(EXTERNAL_GW_INFO).unwrap().enforce_policy);
    }

    #[test]
    fn test_floatingip_table() {
        let schema = ResourceKind::FloatingIp.schema();
        for read_only in ["id", "router_id", "status"] {
            let attr = schema.get(read_only).unwrap();
            assert!(!attr.allow_post && !attr.allow_put, "{} must be read-only", read_only);
        }

        let subnet = schema.get("subnet_id").unwrap();
        assert!(subnet.allow_post && !subnet.is_visible, "subnet_id is input only");

        let network = schema.get("floating_network_id").unwrap();
        assert!(network.is_required_on_create());
        assert!(!network.allow_put);

        let port = schema.get("port_id").unwrap();
        assert!(port.allow_put && port.required_by_policy);
    }

    #[test]
    fn test_lookup_by_collection() {
        assert_eq!(ResourceKind::from_collection("routers"), Some(ResourceKind::Router));
        assert_eq!(ResourceKind::from_collection("floatingips"), Some(ResourceKind::FloatingIp));
        assert_eq!(ResourceKind::from_collection("networks"), None);
        assert_eq!(resource_attribute_map().len(), 2);
    }
}
