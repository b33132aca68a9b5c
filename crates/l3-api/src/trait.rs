//! RouterPlugin trait
//!
//! The capability surface an L3 backend must provide. The API layer and the
//! plugin loader hold an `Arc<dyn RouterPlugin>` and never see the concrete
//! backend type.

use uuid::Uuid;

use crate::context::RequestContext;
use crate::error::L3Error;
use crate::models::*;
use crate::query::{Filters, ListQuery, Projected};

/// Trait for router and floating IP backends
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
/// Errors are raised where detected and returned unmodified; the API layer
/// maps them by [`L3Error::category`].
#[async_trait::async_trait]
pub trait RouterPlugin: Send + Sync {
    // Routers

    /// Create a router. The backend assigns `id` and `status`.
    async fn create_router(&self, context: &RequestContext, router: RouterSpec) -> Result<Router, L3Error>;

    /// Apply a partial update. Fails with `RouterNotFound` for unknown ids.
    async fn update_router(&self, context: &RequestContext, id: Uuid, router: RouterUpdate) -> Result<Router, L3Error>;

    /// Fetch a router, restricted to `fields` when given.
    async fn get_router(&self, context: &RequestContext, id: Uuid, fields: Option<&[String]>) -> Result<Projected<Router>, L3Error>;

    /// Delete a router. Fails with `RouterInUse` while it still has interfaces.
    async fn delete_router(&self, context: &RequestContext, id: Uuid) -> Result<(), L3Error>;

    async fn list_routers(&self, context: &RequestContext, query: &ListQuery) -> Result<Vec<Projected<Router>>, L3Error>;

    /// Attach a subnet or port to the router
    async fn add_router_interface(&self, context: &RequestContext, router_id: Uuid, interface_info: RouterInterfaceInfo) -> Result<RouterInterface, L3Error>;

    /// Detach a subnet or port from the router
    async fn remove_router_interface(&self, context: &RequestContext, router_id: Uuid, interface_info: RouterInterfaceInfo) -> Result<RouterInterface, L3Error>;

    // Floating IPs

    async fn create_floatingip(&self, context: &RequestContext, floatingip: FloatingIpSpec) -> Result<FloatingIp, L3Error>;
    async fn update_floatingip(&self, context: &RequestContext, id: Uuid, floatingip: FloatingIpUpdate) -> Result<FloatingIp, L3Error>;
    async fn get_floatingip(&self, context: &RequestContext, id: Uuid, fields: Option<&[String]>) -> Result<Projected<FloatingIp>, L3Error>;
    async fn delete_floatingip(&self, context: &RequestContext, id: Uuid) -> Result<(), L3Error>;
    async fn list_floatingips(&self, context: &RequestContext, query: &ListQuery) -> Result<Vec<Projected<FloatingIp>>, L3Error>;

    // Counts are opt-in

    async fn count_routers(&self, _context: &RequestContext, _filters: &Filters) -> Result<usize, L3Error> {
        Err(L3Error::NotImplemented("count_routers"))
    }

    async fn count_floatingips(&self, _context: &RequestContext, _filters: &Filters) -> Result<usize, L3Error> {
        Err(L3Error::NotImplemented("count_floatingips"))
    }
}
