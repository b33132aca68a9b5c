//! Integration tests for the L3 API surface
//!
//! Exercise the public schema, request pipeline and extension descriptor the
//! way an API server would when mounting the extension.

use std::collections::BTreeMap;

use l3_api::extension::{HttpMethod, REMOVE_ROUTER_INTERFACE};
use l3_api::request::{parse_floatingip_create, parse_router_create, prepare_request_body, Action};
use l3_api::{resource_attribute_map, ErrorCategory, L3Config, L3Error, L3Extension, RequestContext, ResourceKind};
use serde_json::json;

#[test]
fn test_attribute_map_export() {
    let exported = serde_json::to_value(resource_attribute_map()).unwrap();

    let name = &exported["routers"]["name"];
    assert_eq!(name["allow_post"], json!(true));
    assert_eq!(name["allow_put"], json!(true));
    assert_eq!(name["default"], json!(""));

    let router_id = &exported["floatingips"]["router_id"];
    assert_eq!(router_id["allow_post"], json!(false));
    assert_eq!(router_id["is_visible"], json!(true));
}

#[test]
fn test_mount_extension() {
    let extension = L3Extension::new(L3Config::default());

    let mut routes = Vec::new();
    for resource in extension.resources() {
        routes.push(resource.collection_path());
        routes.push(resource.member_path());
        if let Some((path, method)) = resource.action(REMOVE_ROUTER_INTERFACE) {
            assert_eq!(method, HttpMethod::Put);
            routes.push(path);
        }
    }
    assert_eq!(
        routes,
        vec![
            "/routers",
            "/routers/{id}",
            "/routers/{id}/remove_router_interface",
            "/floatingips",
            "/floatingips/{id}",
        ]
    );

    let mut quotas: BTreeMap<String, i64> = BTreeMap::new();
    extension.register_quotas(&mut quotas);
    assert_eq!(quotas.get("router"), Some(&10));
    assert_eq!(quotas.get("floatingip"), Some(&50));

    let descriptor = serde_json::to_value(extension.descriptor()).unwrap();
    assert_eq!(descriptor["alias"], json!("router"));
    assert_eq!(descriptor["resources"][0]["member_actions"]["add_router_interface"], json!("PUT"));
}

#[test]
fn test_request_errors_map_to_categories() {
    let context = RequestContext::new("tenant-a");

    let err = parse_router_create(&context, &json!({"router": {"id": "abc"}})).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::BadRequest);

    let err = parse_floatingip_create(&context, &json!({"floatingip": {"floating_network_id": 7}})).unwrap_err();
    assert!(matches!(err, L3Error::InvalidInput { .. }));
    assert_eq!(err.category(), ErrorCategory::BadRequest);
}

#[test]
fn test_prepared_body_is_complete() {
    let context = RequestContext::new("tenant-a");
    let network_id = uuid::Uuid::new_v4();

    let attrs = prepare_request_body(
        &context,
        ResourceKind::FloatingIp,
        &json!({"floatingip": {"floating_network_id": network_id}}),
        Action::Create,
    )
    .unwrap();

    for name in ["floating_ip_address", "subnet_id", "port_id", "fixed_ip_address"] {
        assert_eq!(attrs[name], json!(null), "{} should default to null", name);
    }
    assert_eq!(attrs["tenant_id"], json!("tenant-a"));
}
