//! Router operations for MockRouterPlugin
//!
//! Handles router CRUD, external gateways and router interfaces

use tracing::{debug, info, warn};
use uuid::Uuid;

use super::helpers::{FixedIp, Port, RouterRecord, DEVICE_OWNER_ROUTER_GW, DEVICE_OWNER_ROUTER_INTF};
use super::{check_quota, L3State, MockRouterPlugin};
use crate::context::RequestContext;
use crate::error::L3Error;
use crate::models::*;
use crate::query::{ListQuery, Projected};

/// Addresses a gateway port will take on an external network
struct GatewayPlan {
    network_id: Uuid,
    fixed_ips: Vec<FixedIp>,
}

enum GatewayChange {
    Keep,
    Remove,
    Replace(GatewayPlan),
}

fn bad_request(message: String) -> L3Error {
    L3Error::BadRequest { resource: "router", message }
}

pub(crate) fn create_router(
    client: &MockRouterPlugin,
    _context: &RequestContext,
    spec: RouterSpec,
) -> Result<Router, L3Error> {
    let mut state = client.state();

    if let Some(quotas) = client.quotas {
        let used = state
            .routers
            .values()
            .filter(|record| record.router.tenant_id == spec.tenant_id)
            .count();
        check_quota(quotas.quota_router, used, "router")?;
    }

    let plan = spec
        .external_gateway_info
        .as_ref()
        .map(|info| plan_gateway(&state, info, None))
        .transpose()?;

    let mut record = RouterRecord {
        router: Router {
            id: Uuid::new_v4(),
            name: spec.name,
            admin_state_up: spec.admin_state_up,
            status: RouterStatus::Active,
            tenant_id: spec.tenant_id,
            external_gateway_info: None,
        },
        gw_port_id: None,
    };
    if let Some(plan) = plan {
        attach_gateway(&mut state, &mut record, plan);
    }

    let router = record.router.clone();
    state.routers.insert(router.id, record);
    info!("Created router {} for tenant {}", router.id, router.tenant_id);
    Ok(router)
}

pub(crate) fn update_router(
    client: &MockRouterPlugin,
    context: &RequestContext,
    id: Uuid,
    update: RouterUpdate,
) -> Result<Router, L3Error> {
    let mut state = client.state();
    let mut record = state.visible_router(context, id)?.clone();

    let change = match &update.external_gateway_info {
        None => GatewayChange::Keep,
        Some(requested) => plan_gateway_change(&state, &record, requested.as_ref())?,
    };

    if let Some(name) = update.name {
        record.router.name = name;
    }
    if let Some(admin_state_up) = update.admin_state_up {
        record.router.admin_state_up = admin_state_up;
    }
    match change {
        GatewayChange::Keep => {}
        GatewayChange::Remove => detach_gateway(&mut state, &mut record),
        GatewayChange::Replace(plan) => {
            detach_gateway(&mut state, &mut record);
            attach_gateway(&mut state, &mut record, plan);
        }
    }

    let router = record.router.clone();
    state.routers.insert(id, record);
    info!("Updated router {}", id);
    Ok(router)
}

pub(crate) fn get_router(
    client: &MockRouterPlugin,
    context: &RequestContext,
    id: Uuid,
    fields: Option<&[String]>,
) -> Result<Projected<Router>, L3Error> {
    let state = client.state();
    let record = state.visible_router(context, id)?;
    Ok(Projected::new(record.router.clone(), fields.map(<[String]>::to_vec)))
}

pub(crate) fn delete_router(client: &MockRouterPlugin, context: &RequestContext, id: Uuid) -> Result<(), L3Error> {
    let mut state = client.state();
    let mut record = state.visible_router(context, id)?.clone();

    if !state.router_interfaces(id).is_empty() {
        warn!("Refusing to delete router {}: interfaces still attached", id);
        return Err(L3Error::router_in_use(id));
    }
    if let Some(gateway) = &record.router.external_gateway_info {
        ensure_gateway_unused(&state, id, gateway.network_id)?;
    }

    detach_gateway(&mut state, &mut record);
    state.routers.remove(&id);
    info!("Deleted router {}", id);
    Ok(())
}

pub(crate) fn list_routers(
    client: &MockRouterPlugin,
    context: &RequestContext,
    query: &ListQuery,
) -> Result<Vec<Projected<Router>>, L3Error> {
    let routers: Vec<Router> = client
        .state()
        .routers
        .values()
        .filter(|record| context.can_access(&record.router.tenant_id))
        .map(|record| record.router.clone())
        .collect();
    query.apply(routers)
}

pub(crate) fn add_router_interface(
    client: &MockRouterPlugin,
    context: &RequestContext,
    router_id: Uuid,
    info: RouterInterfaceInfo,
) -> Result<RouterInterface, L3Error> {
    let mut state = client.state();
    let tenant_id = state.visible_router(context, router_id)?.router.tenant_id.clone();

    let port = match (info.subnet_id, info.port_id) {
        (None, None) => return Err(bad_request("Either subnet_id or port_id must be specified".to_string())),
        (Some(_), Some(_)) => return Err(bad_request("Cannot specify both subnet-id and port-id".to_string())),
        (None, Some(port_id)) => attach_port(&mut state, context, router_id, port_id)?,
        (Some(subnet_id), None) => attach_subnet(&mut state, context, router_id, &tenant_id, subnet_id)?,
    };

    info!(
        "Attached port {} to router {} on subnets {:?}",
        port.id,
        router_id,
        port.fixed_ips.iter().map(|ip| ip.subnet_id).collect::<Vec<_>>()
    );
    Ok(port.interface_info(router_id))
}

fn attach_port(
    state: &mut L3State,
    context: &RequestContext,
    router_id: Uuid,
    port_id: Uuid,
) -> Result<Port, L3Error> {
    let port = state.port(context, port_id)?;
    if !port.device_id.is_empty() {
        return Err(L3Error::PortInUse {
            port_id,
            device_id: port.device_id.clone(),
        });
    }
    if port.fixed_ips.is_empty() {
        return Err(bad_request(format!(
            "Router port {} must have at least one fixed IP",
            port_id
        )));
    }
    if let Some(fixed) = port
        .fixed_ips
        .iter()
        .find(|ip| state.router_has_subnet(router_id, ip.subnet_id))
    {
        return Err(bad_request(format!(
            "Router already has a port on subnet {}",
            fixed.subnet_id
        )));
    }

    let port = state.ports.get_mut(&port_id).ok_or(L3Error::PortNotFound { port_id })?;
    port.device_id = router_id.to_string();
    port.device_owner = DEVICE_OWNER_ROUTER_INTF.to_string();
    Ok(port.clone())
}

fn attach_subnet(
    state: &mut L3State,
    context: &RequestContext,
    router_id: Uuid,
    tenant_id: &str,
    subnet_id: Uuid,
) -> Result<Port, L3Error> {
    let subnet = state.subnet(subnet_id)?.clone();
    let network = state.network(subnet.network_id)?;
    if !context.can_access(&network.tenant_id) {
        return Err(L3Error::SubnetNotFound { subnet_id });
    }
    let Some(gateway_ip) = subnet.gateway_ip else {
        return Err(bad_request(format!(
            "Subnet {} for router interface must have a gateway IP",
            subnet_id
        )));
    };
    if state.router_has_subnet(router_id, subnet_id) {
        return Err(bad_request(format!("Router already has a port on subnet {}", subnet_id)));
    }
    if state.used_ips(subnet.network_id, None).contains(&gateway_ip) {
        return Err(L3Error::IpAddressInUse {
            net_id: subnet.network_id,
            ip_address: gateway_ip,
        });
    }

    let mut port = Port::new(
        tenant_id,
        subnet.network_id,
        vec![FixedIp { subnet_id, ip_address: gateway_ip }],
    );
    port.device_id = router_id.to_string();
    port.device_owner = DEVICE_OWNER_ROUTER_INTF.to_string();
    state.insert_port(port.clone());
    Ok(port)
}

pub(crate) fn remove_router_interface(
    client: &MockRouterPlugin,
    context: &RequestContext,
    router_id: Uuid,
    info: RouterInterfaceInfo,
) -> Result<RouterInterface, L3Error> {
    let mut state = client.state();
    state.visible_router(context, router_id)?;

    let removed = match (info.subnet_id, info.port_id) {
        (None, None) => return Err(bad_request("Either subnet_id or port_id must be specified".to_string())),
        (subnet_id, Some(port_id)) => detach_port(&mut state, router_id, port_id, subnet_id)?,
        (Some(subnet_id), None) => detach_subnet(&mut state, router_id, subnet_id)?,
    };

    info!("Detached port {} from router {}", removed.port_id, router_id);
    Ok(removed)
}

fn detach_port(
    state: &mut L3State,
    router_id: Uuid,
    port_id: Uuid,
    subnet_id: Option<Uuid>,
) -> Result<RouterInterface, L3Error> {
    let port = state
        .router_interfaces(router_id)
        .into_iter()
        .find(|port| port.id == port_id)
        .cloned()
        .ok_or(L3Error::RouterInterfaceNotFound { router_id, port_id })?;

    if let Some(subnet_id) = subnet_id {
        if !port.fixed_ips.iter().any(|ip| ip.subnet_id == subnet_id) {
            return Err(L3Error::RouterInterfaceNotFoundForSubnet { router_id, subnet_id });
        }
    }
    for fixed in &port.fixed_ips {
        ensure_interface_unused(state, router_id, fixed.subnet_id)?;
    }

    state.ports.remove(&port_id);
    Ok(port.interface_info(router_id))
}

fn detach_subnet(state: &mut L3State, router_id: Uuid, subnet_id: Uuid) -> Result<RouterInterface, L3Error> {
    let port = state
        .router_interfaces(router_id)
        .into_iter()
        .find(|port| port.fixed_ips.iter().any(|ip| ip.subnet_id == subnet_id))
        .cloned()
        .ok_or(L3Error::RouterInterfaceNotFoundForSubnet { router_id, subnet_id })?;

    ensure_interface_unused(state, router_id, subnet_id)?;

    let remaining: Vec<FixedIp> = port
        .fixed_ips
        .iter()
        .filter(|ip| ip.subnet_id != subnet_id)
        .copied()
        .collect();
    if remaining.is_empty() {
        state.ports.remove(&port.id);
    } else if let Some(stored) = state.ports.get_mut(&port.id) {
        debug!("Port {} keeps {} address(es) on router {}", port.id, remaining.len(), router_id);
        stored.fixed_ips = remaining;
    }

    let mut interface = port.interface_info(router_id);
    interface.subnet_id = subnet_id;
    interface.subnet_ids = vec![subnet_id];
    Ok(interface)
}

/// A subnet cannot leave a router while a floating IP reaches a fixed address
/// inside it through that router.
fn ensure_interface_unused(state: &L3State, router_id: Uuid, subnet_id: Uuid) -> Result<(), L3Error> {
    let Ok(subnet) = state.subnet(subnet_id) else {
        return Ok(());
    };
    let in_use = state.floatingips.values().any(|record| {
        let fip = &record.floatingip;
        fip.router_id == Some(router_id)
            && fip.fixed_ip_address.is_some_and(|ip| subnet.cidr.contains(ip))
    });
    if in_use {
        warn!(
            "Subnet {} on router {} is still used by floating IPs",
            subnet_id, router_id
        );
        return Err(L3Error::RouterInterfaceInUseByFloatingIP { router_id, subnet_id });
    }
    Ok(())
}

/// A gateway cannot leave its network while floating IPs from that network
/// are routed through the router.
fn ensure_gateway_unused(state: &L3State, router_id: Uuid, net_id: Uuid) -> Result<(), L3Error> {
    let in_use = state.floatingips.values().any(|record| {
        record.floatingip.router_id == Some(router_id) && record.floatingip.floating_network_id == net_id
    });
    if in_use {
        warn!(
            "Gateway of router {} on network {} is still used by floating IPs",
            router_id, net_id
        );
        return Err(L3Error::RouterExternalGatewayInUseByFloatingIp { router_id, net_id });
    }
    Ok(())
}

fn plan_gateway_change(
    state: &L3State,
    record: &RouterRecord,
    requested: Option<&ExternalGatewayInfo>,
) -> Result<GatewayChange, L3Error> {
    let router_id = record.router.id;
    let current = record
        .router
        .external_gateway_info
        .as_ref()
        .map(|gateway| gateway.network_id);

    if let Some(current) = current {
        if requested.map(|info| info.network_id) != Some(current) {
            ensure_gateway_unused(state, router_id, current)?;
        }
    }

    match requested {
        None if current.is_none() => Ok(GatewayChange::Keep),
        None => Ok(GatewayChange::Remove),
        Some(info) if Some(info.network_id) == current && info.external_fixed_ips.is_none() => {
            Ok(GatewayChange::Keep)
        }
        Some(info) => {
            let exclude = if Some(info.network_id) == current { record.gw_port_id } else { None };
            Ok(GatewayChange::Replace(plan_gateway(state, info, exclude)?))
        }
    }
}

fn plan_gateway(
    state: &L3State,
    info: &ExternalGatewayInfo,
    exclude_port: Option<Uuid>,
) -> Result<GatewayPlan, L3Error> {
    let network = state.network(info.network_id)?;
    if !network.router_external {
        return Err(bad_request(format!(
            "Network {} is not an external network",
            info.network_id
        )));
    }

    let mut taken = state.used_ips(network.id, exclude_port);
    let requested = info.external_fixed_ips.as_deref().unwrap_or_default();
    let mut fixed_ips = Vec::new();
    if requested.is_empty() {
        fixed_ips.push(state.allocate_ip(network.id, None, &taken)?);
    }
    for entry in requested {
        let fixed = match entry.ip_address {
            Some(ip) => state.request_ip(network.id, entry.subnet_id, ip, &taken)?,
            None => state.allocate_ip(network.id, entry.subnet_id, &taken)?,
        };
        taken.insert(fixed.ip_address);
        fixed_ips.push(fixed);
    }

    Ok(GatewayPlan {
        network_id: network.id,
        fixed_ips,
    })
}

fn attach_gateway(state: &mut L3State, record: &mut RouterRecord, plan: GatewayPlan) {
    let mut port = Port::new(String::new(), plan.network_id, plan.fixed_ips.clone());
    port.device_id = record.router.id.to_string();
    port.device_owner = DEVICE_OWNER_ROUTER_GW.to_string();
    record.gw_port_id = Some(state.insert_port(port));
    record.router.external_gateway_info = Some(ExternalGatewayInfo {
        network_id: plan.network_id,
        external_fixed_ips: Some(
            plan.fixed_ips
                .iter()
                .map(|ip| ExternalFixedIp {
                    subnet_id: Some(ip.subnet_id),
                    ip_address: Some(ip.ip_address),
                })
                .collect(),
        ),
    });
    debug!("Router {} gateway set on network {}", record.router.id, plan.network_id);
}

fn detach_gateway(state: &mut L3State, record: &mut RouterRecord) {
    if let Some(port_id) = record.gw_port_id.take() {
        state.ports.remove(&port_id);
    }
    record.router.external_gateway_info = None;
}
