//! Test utilities for MockRouterPlugin tests

use std::net::IpAddr;

use uuid::Uuid;

use super::{FixedIp, MockRouterPlugin, Network, Port, Subnet};
use crate::context::RequestContext;
use crate::models::{ExternalGatewayInfo, RouterSpec};

pub(crate) const TENANT: &str = "tenant-a";
pub(crate) const OTHER_TENANT: &str = "tenant-b";

/// One external network and one tenant network with a single port on it
pub(crate) struct TestTopology {
    pub(crate) plugin: MockRouterPlugin,
    pub(crate) context: RequestContext,
    pub(crate) ext_net: Uuid,
    pub(crate) ext_subnet: Uuid,
    pub(crate) int_net: Uuid,
    pub(crate) int_subnet: Uuid,
    pub(crate) port: Uuid,
}

pub(crate) fn ip(address: &str) -> IpAddr {
    address.parse().unwrap()
}

/// Create an external network 172.24.4.0/24 and a tenant network
/// 10.0.0.0/24 with a port at 10.0.0.5
pub(crate) fn create_test_topology() -> TestTopology {
    let plugin = MockRouterPlugin::new();

    let ext = Network::external("public");
    let ext_subnet = Subnet::new(ext.id, "172.24.4.0/24".parse().unwrap());
    let int = Network::internal(TENANT, "private");
    let int_subnet = Subnet::new(int.id, "10.0.0.0/24".parse().unwrap());
    let port = Port::new(
        TENANT,
        int.id,
        vec![FixedIp { subnet_id: int_subnet.id, ip_address: ip("10.0.0.5") }],
    );

    let topology = TestTopology {
        plugin: plugin.clone(),
        context: RequestContext::new(TENANT),
        ext_net: ext.id,
        ext_subnet: ext_subnet.id,
        int_net: int.id,
        int_subnet: int_subnet.id,
        port: port.id,
    };
    plugin.add_network(ext);
    plugin.add_subnet(ext_subnet);
    plugin.add_network(int);
    plugin.add_subnet(int_subnet);
    plugin.add_port(port);
    topology
}

/// Add another tenant subnet and return (network, subnet)
pub(crate) fn add_test_subnet(plugin: &MockRouterPlugin, tenant_id: &str, cidr: &str) -> (Uuid, Uuid) {
    let network = Network::internal(tenant_id, "extra");
    let subnet = Subnet::new(network.id, cidr.parse().unwrap());
    let ids = (network.id, subnet.id);
    plugin.add_network(network);
    plugin.add_subnet(subnet);
    ids
}

pub(crate) fn router_spec_with_gateway(network_id: Uuid) -> RouterSpec {
    let mut spec = RouterSpec::new(TENANT);
    spec.name = "r1".to_string();
    spec.external_gateway_info = Some(ExternalGatewayInfo {
        network_id,
        external_fixed_ips: None,
    });
    spec
}

/// Topology plus a router with a gateway on the external network and an
/// interface on the tenant subnet
pub(crate) async fn create_routed_topology() -> (TestTopology, Uuid) {
    use crate::models::RouterInterfaceInfo;
    use crate::plugin_trait::RouterPlugin;

    let topology = create_test_topology();
    let router = topology
        .plugin
        .create_router(&topology.context, router_spec_with_gateway(topology.ext_net))
        .await
        .unwrap();
    topology
        .plugin
        .add_router_interface(&topology.context, router.id, RouterInterfaceInfo::subnet(topology.int_subnet))
        .await
        .unwrap();
    (topology, router.id)
}
