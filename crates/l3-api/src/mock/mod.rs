//! In-memory RouterPlugin
//!
//! A complete reference backend for tests and for API layers that need a
//! plugin without a real network stack behind it. Networks, subnets and
//! ports are seeded through the `add_*` helpers; routers, interfaces and
//! floating IPs are managed through the [`RouterPlugin`] operations.
//!
//! The mock is organized into domain-specific modules:
//! - `routers.rs` - router CRUD, gateways and interfaces
//! - `floatingips.rs` - floating IP CRUD and association
//! - `helpers.rs` - topology types, lookups and IP allocation
//!
//! Every operation runs its checks and its mutation under one lock, so a
//! failed operation leaves no partial state behind.

mod floatingips;
mod helpers;
mod routers;

#[cfg(test)]
mod fixtures;

pub use helpers::{
    FixedIp, Network, Port, Subnet, DEVICE_OWNER_FLOATINGIP, DEVICE_OWNER_ROUTER_GW,
    DEVICE_OWNER_ROUTER_INTF,
};

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::warn;
use uuid::Uuid;

use crate::config::L3Config;
use crate::context::RequestContext;
use crate::error::L3Error;
use crate::models::*;
use crate::plugin_trait::RouterPlugin;
use crate::query::{Filters, ListQuery, Projected};
use helpers::{FloatingIpRecord, RouterRecord};

#[derive(Debug, Default)]
pub(crate) struct L3State {
    pub(crate) networks: BTreeMap<Uuid, Network>,
    pub(crate) subnets: BTreeMap<Uuid, Subnet>,
    pub(crate) ports: BTreeMap<Uuid, Port>,
    pub(crate) routers: BTreeMap<Uuid, RouterRecord>,
    pub(crate) floatingips: BTreeMap<Uuid, FloatingIpRecord>,
}

/// Mock RouterPlugin for testing
///
/// Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct MockRouterPlugin {
    pub(crate) state: Arc<Mutex<L3State>>,
    pub(crate) quotas: Option<L3Config>,
}

impl MockRouterPlugin {
    /// Create an empty plugin without quota enforcement
    pub fn new() -> Self {
        Self::default()
    }

    /// Enforce per-tenant router and floating IP limits
    pub fn with_quotas(mut self, quotas: L3Config) -> Self {
        self.quotas = Some(quotas);
        self
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, L3State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // Helper methods for test setup

    pub fn add_network(&self, network: Network) {
        self.state().networks.insert(network.id, network);
    }

    pub fn add_subnet(&self, subnet: Subnet) {
        self.state().subnets.insert(subnet.id, subnet);
    }

    pub fn add_port(&self, port: Port) {
        self.state().insert_port(port);
    }

    /// Current state of a port, including ports the plugin created
    pub fn get_port(&self, id: Uuid) -> Option<Port> {
        self.state().ports.get(&id).cloned()
    }

    /// Interface ports currently attached to a router
    pub fn router_ports(&self, router_id: Uuid) -> Vec<Port> {
        self.state()
            .router_interfaces(router_id)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Gateway port of a router, if it has one
    pub fn gateway_port(&self, router_id: Uuid) -> Option<Port> {
        let state = self.state();
        let port_id = state.routers.get(&router_id)?.gw_port_id?;
        state.ports.get(&port_id).cloned()
    }
}

/// Fail with `OverQuota` when `used` already reaches `limit`. Negative limits are unlimited.
pub(crate) fn check_quota(limit: i64, used: usize, resource: &'static str) -> Result<(), L3Error> {
    if limit < 0 {
        return Ok(());
    }
    if i64::try_from(used).unwrap_or(i64::MAX) >= limit {
        warn!("Quota exceeded for {}: {} of {} in use", resource, used, limit);
        return Err(L3Error::OverQuota { resource });
    }
    Ok(())
}

#[async_trait::async_trait]
impl RouterPlugin for MockRouterPlugin {
    async fn create_router(&self, context: &RequestContext, router: RouterSpec) -> Result<Router, L3Error> {
        routers::create_router(self, context, router)
    }

    async fn update_router(&self, context: &RequestContext, id: Uuid, router: RouterUpdate) -> Result<Router, L3Error> {
        routers::update_router(self, context, id, router)
    }

    async fn get_router(&self, context: &RequestContext, id: Uuid, fields: Option<&[String]>) -> Result<Projected<Router>, L3Error> {
        routers::get_router(self, context, id, fields)
    }

    async fn delete_router(&self, context: &RequestContext, id: Uuid) -> Result<(), L3Error> {
        routers::delete_router(self, context, id)
    }

    async fn list_routers(&self, context: &RequestContext, query: &ListQuery) -> Result<Vec<Projected<Router>>, L3Error> {
        routers::list_routers(self, context, query)
    }

    async fn add_router_interface(&self, context: &RequestContext, router_id: Uuid, interface_info: RouterInterfaceInfo) -> Result<RouterInterface, L3Error> {
        routers::add_router_interface(self, context, router_id, interface_info)
    }

    async fn remove_router_interface(&self, context: &RequestContext, router_id: Uuid, interface_info: RouterInterfaceInfo) -> Result<RouterInterface, L3Error> {
        routers::remove_router_interface(self, context, router_id, interface_info)
    }

    async fn create_floatingip(&self, context: &RequestContext, floatingip: FloatingIpSpec) -> Result<FloatingIp, L3Error> {
        floatingips::create_floatingip(self, context, floatingip)
    }

    async fn update_floatingip(&self, context: &RequestContext, id: Uuid, floatingip: FloatingIpUpdate) -> Result<FloatingIp, L3Error> {
        floatingips::update_floatingip(self, context, id, floatingip)
    }

    async fn get_floatingip(&self, context: &RequestContext, id: Uuid, fields: Option<&[String]>) -> Result<Projected<FloatingIp>, L3Error> {
        floatingips::get_floatingip(self, context, id, fields)
    }

    async fn delete_floatingip(&self, context: &RequestContext, id: Uuid) -> Result<(), L3Error> {
        floatingips::delete_floatingip(self, context, id)
    }

    async fn list_floatingips(&self, context: &RequestContext, query: &ListQuery) -> Result<Vec<Projected<FloatingIp>>, L3Error> {
        floatingips::list_floatingips(self, context, query)
    }

    async fn count_routers(&self, context: &RequestContext, filters: &Filters) -> Result<usize, L3Error> {
        let query = ListQuery { filters: filters.clone(), ..ListQuery::default() };
        Ok(routers::list_routers(self, context, &query)?.len())
    }

    async fn count_floatingips(&self, context: &RequestContext, filters: &Filters) -> Result<usize, L3Error> {
        let query = ListQuery { filters: filters.clone(), ..ListQuery::default() };
        Ok(floatingips::list_floatingips(self, context, &query)?.len())
    }
}
