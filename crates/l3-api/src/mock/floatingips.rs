//! Floating IP operations for MockRouterPlugin
//!
//! Handles floating IP CRUD and association with internal ports

use std::net::IpAddr;

use tracing::{debug, info};
use uuid::Uuid;

use super::helpers::{FixedIp, FloatingIpRecord, Port, DEVICE_OWNER_FLOATINGIP};
use super::{check_quota, L3State, MockRouterPlugin};
use crate::context::RequestContext;
use crate::error::L3Error;
use crate::models::*;
use crate::query::{ListQuery, Projected};

/// Resolved target of a floating IP
#[derive(Debug, Clone, Copy)]
struct Association {
    port_id: Uuid,
    fixed_ip: IpAddr,
    router_id: Uuid,
}

fn bad_request(message: String) -> L3Error {
    L3Error::BadRequest { resource: "floatingip", message }
}

pub(crate) fn create_floatingip(
    client: &MockRouterPlugin,
    context: &RequestContext,
    spec: FloatingIpSpec,
) -> Result<FloatingIp, L3Error> {
    let mut state = client.state();

    if let Some(quotas) = client.quotas {
        let used = state
            .floatingips
            .values()
            .filter(|record| record.floatingip.tenant_id == spec.tenant_id)
            .count();
        check_quota(quotas.quota_floatingip, used, "floatingip")?;
    }

    let network_id = spec.floating_network_id;
    if !state.network(network_id).is_ok_and(|network| network.router_external) {
        return Err(bad_request(format!(
            "Network {} is not a valid external network",
            network_id
        )));
    }

    let taken = state.used_ips(network_id, None);
    let external = match spec.floating_ip_address {
        Some(ip) => state.request_ip(network_id, spec.subnet_id, ip, &taken)?,
        None => state.allocate_ip(network_id, spec.subnet_id, &taken)?,
    };

    let id = Uuid::new_v4();
    let mut floatingip = FloatingIp {
        id,
        floating_ip_address: external.ip_address,
        floating_network_id: network_id,
        router_id: None,
        port_id: None,
        fixed_ip_address: None,
        tenant_id: spec.tenant_id,
        status: FloatingIpStatus::Down,
    };
    let association = plan_association(&state, context, &floatingip, spec.port_id, spec.fixed_ip_address)?;

    let mut floating_port = Port::new(String::new(), network_id, vec![external]);
    floating_port.device_id = id.to_string();
    floating_port.device_owner = DEVICE_OWNER_FLOATINGIP.to_string();
    let floating_port_id = state.insert_port(floating_port);

    apply_association(&mut floatingip, association);

    state.floatingips.insert(
        id,
        FloatingIpRecord {
            floatingip: floatingip.clone(),
            floating_port_id,
        },
    );
    info!(
        "Created floating IP {} ({}) on network {}",
        id, floatingip.floating_ip_address, network_id
    );
    Ok(floatingip)
}

pub(crate) fn update_floatingip(
    client: &MockRouterPlugin,
    context: &RequestContext,
    id: Uuid,
    update: FloatingIpUpdate,
) -> Result<FloatingIp, L3Error> {
    let mut state = client.state();
    let current = state.visible_floatingip(context, id)?.floatingip.clone();

    let port_id = update.port_id.unwrap_or(current.port_id);
    let fixed_ip_address = match update.fixed_ip_address {
        Some(fixed) => fixed,
        None if port_id == current.port_id => current.fixed_ip_address,
        None => None,
    };

    let association = plan_association(&state, context, &current, port_id, fixed_ip_address)?;

    let record = state
        .floatingips
        .get_mut(&id)
        .ok_or(L3Error::FloatingIPNotFound { floatingip_id: id })?;
    apply_association(&mut record.floatingip, association);
    info!(
        "Updated floating IP {}: port {:?}, router {:?}",
        id, record.floatingip.port_id, record.floatingip.router_id
    );
    Ok(record.floatingip.clone())
}

pub(crate) fn get_floatingip(
    client: &MockRouterPlugin,
    context: &RequestContext,
    id: Uuid,
    fields: Option<&[String]>,
) -> Result<Projected<FloatingIp>, L3Error> {
    let state = client.state();
    let record = state.visible_floatingip(context, id)?;
    Ok(Projected::new(record.floatingip.clone(), fields.map(<[String]>::to_vec)))
}

pub(crate) fn delete_floatingip(client: &MockRouterPlugin, context: &RequestContext, id: Uuid) -> Result<(), L3Error> {
    let mut state = client.state();
    let floating_port_id = state.visible_floatingip(context, id)?.floating_port_id;

    state.ports.remove(&floating_port_id);
    state.floatingips.remove(&id);
    info!("Deleted floating IP {}", id);
    Ok(())
}

pub(crate) fn list_floatingips(
    client: &MockRouterPlugin,
    context: &RequestContext,
    query: &ListQuery,
) -> Result<Vec<Projected<FloatingIp>>, L3Error> {
    let floatingips: Vec<FloatingIp> = client
        .state()
        .floatingips
        .values()
        .filter(|record| context.can_access(&record.floatingip.tenant_id))
        .map(|record| record.floatingip.clone())
        .collect();
    query.apply(floatingips)
}

fn apply_association(floatingip: &mut FloatingIp, association: Option<Association>) {
    match association {
        Some(association) => {
            floatingip.port_id = Some(association.port_id);
            floatingip.fixed_ip_address = Some(association.fixed_ip);
            floatingip.router_id = Some(association.router_id);
            floatingip.status = FloatingIpStatus::Active;
        }
        None => {
            floatingip.port_id = None;
            floatingip.fixed_ip_address = None;
            floatingip.router_id = None;
            floatingip.status = FloatingIpStatus::Down;
        }
    }
}

/// Validate an association request without touching state.
///
/// `None` for `port_id` means the floating IP stays (or becomes) unassociated.
fn plan_association(
    state: &L3State,
    context: &RequestContext,
    floatingip: &FloatingIp,
    port_id: Option<Uuid>,
    fixed_ip_address: Option<IpAddr>,
) -> Result<Option<Association>, L3Error> {
    let Some(port_id) = port_id else {
        if fixed_ip_address.is_some() {
            return Err(bad_request(
                "fixed_ip_address cannot be specified without a port_id".to_string(),
            ));
        }
        return Ok(None);
    };

    let fip_id = floatingip.id;
    let floating_network_id = floatingip.floating_network_id;
    let port = state.port(context, port_id)?;
    if port.tenant_id != floatingip.tenant_id {
        return Err(bad_request(format!(
            "Cannot associate floating IP with port {} owned by a different tenant",
            port_id
        )));
    }
    let internal = internal_fixed_ip(port, fixed_ip_address)?;

    let router_id = router_for_floatingip(state, internal.subnet_id, floating_network_id).ok_or(
        L3Error::ExternalGatewayForFloatingIPNotFound {
            external_network_id: floating_network_id,
            subnet_id: internal.subnet_id,
            port_id,
        },
    )?;

    let already_associated = state.floatingips.values().any(|record| {
        let other = &record.floatingip;
        other.id != fip_id
            && other.floating_network_id == floating_network_id
            && other.port_id == Some(port_id)
            && other.fixed_ip_address == Some(internal.ip_address)
    });
    if already_associated {
        return Err(L3Error::FloatingIPPortAlreadyAssociated {
            floating_ip_address: floatingip.floating_ip_address,
            fip_id,
            port_id,
            fixed_ip: internal.ip_address,
            net_id: floating_network_id,
        });
    }

    debug!(
        "Floating IP {} maps to {} on port {} via router {}",
        fip_id, internal.ip_address, port_id, router_id
    );
    Ok(Some(Association {
        port_id,
        fixed_ip: internal.ip_address,
        router_id,
    }))
}

/// The port address a floating IP will be bound to
fn internal_fixed_ip(port: &Port, requested: Option<IpAddr>) -> Result<FixedIp, L3Error> {
    if let Some(ip) = requested {
        let fixed = port
            .fixed_ips
            .iter()
            .find(|fixed| fixed.ip_address == ip)
            .copied()
            .ok_or_else(|| bad_request(format!("Port {} does not have fixed ip {}", port.id, ip)))?;
        if !fixed.ip_address.is_ipv4() {
            return Err(bad_request(format!(
                "Cannot process floating IP association with {}, since that is not an IPv4 address",
                ip
            )));
        }
        return Ok(fixed);
    }

    let ipv4: Vec<FixedIp> = port
        .fixed_ips
        .iter()
        .filter(|fixed| fixed.ip_address.is_ipv4())
        .copied()
        .collect();
    match ipv4.as_slice() {
        [] => Err(bad_request(format!(
            "Cannot add floating IP to port {} that has no fixed IPv4 addresses",
            port.id
        ))),
        [single] => Ok(*single),
        _ => Err(bad_request(format!(
            "Port {} has multiple fixed IPv4 addresses. Must provide a specific IPv4 address \
             when assigning a floating IP",
            port.id
        ))),
    }
}

/// Router with a gateway on the external network and an interface on the internal subnet
fn router_for_floatingip(state: &L3State, internal_subnet_id: Uuid, external_network_id: Uuid) -> Option<Uuid> {
    state
        .routers
        .values()
        .filter(|record| {
            record
                .router
                .external_gateway_info
                .as_ref()
                .is_some_and(|gateway| gateway.network_id == external_network_id)
        })
        .map(|record| record.router.id)
        .find(|router_id| state.router_has_subnet(*router_id, internal_subnet_id))
}
