//! Topology types and state helpers for MockRouterPlugin

use std::collections::HashSet;
use std::net::IpAddr;

use ipnetwork::IpNetwork;
use uuid::Uuid;

use super::L3State;
use crate::context::RequestContext;
use crate::error::L3Error;
use crate::models::{FloatingIp, Router, RouterInterface};

pub const DEVICE_OWNER_ROUTER_INTF: &str = "network:router_interface";
pub const DEVICE_OWNER_ROUTER_GW: &str = "network:router_gateway";
pub const DEVICE_OWNER_FLOATINGIP: &str = "network:floatingip";

/// L2 network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Network {
    pub id: Uuid,
    pub name: String,
    pub tenant_id: String,
    /// Usable as a router gateway / floating IP source
    pub router_external: bool,
}

impl Network {
    /// Admin-owned external network
    pub fn external(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            tenant_id: String::new(),
            router_external: true,
        }
    }

    /// Tenant network
    pub fn internal(tenant_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            tenant_id: tenant_id.into(),
            router_external: false,
        }
    }
}

/// IP subnet of a network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subnet {
    pub id: Uuid,
    pub network_id: Uuid,
    pub cidr: IpNetwork,
    pub gateway_ip: Option<IpAddr>,
}

impl Subnet {
    /// Subnet whose gateway is the first host address of `cidr`
    pub fn new(network_id: Uuid, cidr: IpNetwork) -> Self {
        Self {
            id: Uuid::new_v4(),
            network_id,
            cidr,
            gateway_ip: cidr.iter().nth(1),
        }
    }

    pub fn without_gateway(mut self) -> Self {
        self.gateway_ip = None;
        self
    }
}

/// Address bound to a port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedIp {
    pub subnet_id: Uuid,
    pub ip_address: IpAddr,
}

/// Port on a network. An empty `device_id` means unowned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Port {
    pub id: Uuid,
    pub network_id: Uuid,
    pub tenant_id: String,
    pub device_id: String,
    pub device_owner: String,
    pub fixed_ips: Vec<FixedIp>,
}

impl Port {
    /// Unowned port with the given addresses
    pub fn new(tenant_id: impl Into<String>, network_id: Uuid, fixed_ips: Vec<FixedIp>) -> Self {
        Self {
            id: Uuid::new_v4(),
            network_id,
            tenant_id: tenant_id.into(),
            device_id: String::new(),
            device_owner: String::new(),
            fixed_ips,
        }
    }

    fn is_interface_of(&self, router_id: Uuid) -> bool {
        self.device_owner == DEVICE_OWNER_ROUTER_INTF && self.device_id == router_id.to_string()
    }

    /// Interface descriptor for this port attached to `router_id`
    pub(crate) fn interface_info(&self, router_id: Uuid) -> RouterInterface {
        let subnet_ids: Vec<Uuid> = self.fixed_ips.iter().map(|ip| ip.subnet_id).collect();
        RouterInterface {
            id: router_id,
            tenant_id: self.tenant_id.clone(),
            port_id: self.id,
            subnet_id: subnet_ids.first().copied().unwrap_or_default(),
            subnet_ids,
            network_id: self.network_id,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct RouterRecord {
    pub(crate) router: Router,
    pub(crate) gw_port_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub(crate) struct FloatingIpRecord {
    pub(crate) floatingip: FloatingIp,
    pub(crate) floating_port_id: Uuid,
}

impl L3State {
    pub(crate) fn network(&self, id: Uuid) -> Result<&Network, L3Error> {
        self.networks
            .get(&id)
            .ok_or(L3Error::NetworkNotFound { net_id: id })
    }

    pub(crate) fn subnet(&self, id: Uuid) -> Result<&Subnet, L3Error> {
        self.subnets
            .get(&id)
            .ok_or(L3Error::SubnetNotFound { subnet_id: id })
    }

    /// Port visible to the caller
    pub(crate) fn port(&self, context: &RequestContext, id: Uuid) -> Result<&Port, L3Error> {
        self.ports
            .get(&id)
            .filter(|port| context.can_access(&port.tenant_id))
            .ok_or(L3Error::PortNotFound { port_id: id })
    }

    /// Router visible to the caller
    pub(crate) fn visible_router(&self, context: &RequestContext, id: Uuid) -> Result<&RouterRecord, L3Error> {
        self.routers
            .get(&id)
            .filter(|record| context.can_access(&record.router.tenant_id))
            .ok_or(L3Error::RouterNotFound { router_id: id })
    }

    /// Floating IP visible to the caller
    pub(crate) fn visible_floatingip(&self, context: &RequestContext, id: Uuid) -> Result<&FloatingIpRecord, L3Error> {
        self.floatingips
            .get(&id)
            .filter(|record| context.can_access(&record.floatingip.tenant_id))
            .ok_or(L3Error::FloatingIPNotFound { floatingip_id: id })
    }

    /// Addresses held by ports on a network, optionally ignoring one port
    pub(crate) fn used_ips(&self, network_id: Uuid, exclude_port: Option<Uuid>) -> HashSet<IpAddr> {
        self.ports
            .values()
            .filter(|port| port.network_id == network_id && Some(port.id) != exclude_port)
            .flat_map(|port| port.fixed_ips.iter().map(|ip| ip.ip_address))
            .collect()
    }

    fn candidate_subnets(&self, network_id: Uuid, subnet_id: Option<Uuid>) -> Result<Vec<&Subnet>, L3Error> {
        if let Some(subnet_id) = subnet_id {
            let subnet = self.subnet(subnet_id)?;
            if subnet.network_id != network_id {
                return Err(L3Error::BadRequest {
                    resource: "port",
                    message: format!("Subnet {} is not on network {}", subnet_id, network_id),
                });
            }
            return Ok(vec![subnet]);
        }
        Ok(self
            .subnets
            .values()
            .filter(|subnet| subnet.network_id == network_id)
            .collect())
    }

    /// First free host address on the network (or on `subnet_id`)
    pub(crate) fn allocate_ip(
        &self,
        network_id: Uuid,
        subnet_id: Option<Uuid>,
        taken: &HashSet<IpAddr>,
    ) -> Result<FixedIp, L3Error> {
        self.candidate_subnets(network_id, subnet_id)?
            .into_iter()
            .find_map(|subnet| {
                first_free_address(subnet, taken).map(|ip_address| FixedIp {
                    subnet_id: subnet.id,
                    ip_address,
                })
            })
            .ok_or(L3Error::IpAddressGenerationFailure { net_id: network_id })
    }

    /// Reserve a specific address, which must lie inside a subnet of the network
    pub(crate) fn request_ip(
        &self,
        network_id: Uuid,
        subnet_id: Option<Uuid>,
        ip_address: IpAddr,
        taken: &HashSet<IpAddr>,
    ) -> Result<FixedIp, L3Error> {
        let subnet = self
            .candidate_subnets(network_id, subnet_id)?
            .into_iter()
            .find(|subnet| subnet.cidr.contains(ip_address))
            .filter(|subnet| !is_network_or_broadcast(subnet, ip_address))
            .ok_or_else(|| L3Error::BadRequest {
                resource: "port",
                message: format!("IP address {} is not a valid IP for the specified subnet", ip_address),
            })?;
        // The gateway address belongs to the subnet's router
        if subnet.gateway_ip == Some(ip_address) {
            return Err(L3Error::BadRequest {
                resource: "port",
                message: format!("IP address {} is the gateway IP of subnet {}", ip_address, subnet.id),
            });
        }
        if taken.contains(&ip_address) {
            return Err(L3Error::IpAddressInUse { net_id: network_id, ip_address });
        }
        Ok(FixedIp { subnet_id: subnet.id, ip_address })
    }

    pub(crate) fn insert_port(&mut self, port: Port) -> Uuid {
        let id = port.id;
        self.ports.insert(id, port);
        id
    }

    /// Interface ports of a router
    pub(crate) fn router_interfaces(&self, router_id: Uuid) -> Vec<&Port> {
        self.ports
            .values()
            .filter(|port| port.is_interface_of(router_id))
            .collect()
    }

    /// Whether the router has an interface with an address on the subnet
    pub(crate) fn router_has_subnet(&self, router_id: Uuid, subnet_id: Uuid) -> bool {
        self.router_interfaces(router_id)
            .iter()
            .any(|port| port.fixed_ips.iter().any(|ip| ip.subnet_id == subnet_id))
    }
}

/// Network address, or IPv4 broadcast address on prefixes shorter than /31
fn is_network_or_broadcast(subnet: &Subnet, ip: IpAddr) -> bool {
    if ip == subnet.cidr.network() {
        return true;
    }
    match subnet.cidr {
        IpNetwork::V4(net) if net.prefix() < 31 => ip == IpAddr::V4(net.broadcast()),
        _ => false,
    }
}

fn first_free_address(subnet: &Subnet, taken: &HashSet<IpAddr>) -> Option<IpAddr> {
    subnet.cidr.iter().find(|ip| {
        !is_network_or_broadcast(subnet, *ip) && Some(*ip) != subnet.gateway_ip && !taken.contains(ip)
    })
}
