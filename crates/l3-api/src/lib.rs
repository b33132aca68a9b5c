//! L3 Router and Floating IP API
//!
//! Schema, request pipeline and backend contract for the layer-3
//! `routers` and `floatingips` resources of an SDN control plane.
//!
//! # Example
//!
//! ```no_run
//! use l3_api::{request, RequestContext, RouterPlugin};
//! use serde_json::json;
//!
//! # async fn example(plugin: &dyn RouterPlugin) -> Result<(), Box<dyn std::error::Error>> {
//! let context = RequestContext::new("tenant-a");
//!
//! // Validate a raw request body against the router schema
//! let body = json!({"router": {"name": "edge", "admin_state_up": "true"}});
//! let spec = request::parse_router_create(&context, &body)?;
//!
//! // Hand it to a backend
//! let router = plugin.create_router(&context, spec).await?;
//! println!("{}", serde_json::to_string(&router)?);
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Schema**: attribute tables with mutability, visibility, defaults and validators
//! - **Request pipeline**: body preparation and response projection driven by the schema
//! - **Operation contract**: the [`RouterPlugin`] trait every backend implements
//! - **List queries**: filters, multi-key sort and marker pagination
//! - **test-util**: an in-memory [`MockRouterPlugin`] enforcing every invariant

pub mod config;
pub mod context;
pub mod error;
pub mod extension;
pub mod models;
pub mod query;
pub mod request;
pub mod schema;
#[path = "trait.rs"]
pub mod plugin_trait;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;


pub use config::L3Config;
pub use context::RequestContext;
pub use error::{ErrorCategory, L3Error};
pub use extension::{L3Extension, QuotaRegistry};
pub use models::*;
pub use plugin_trait::RouterPlugin;
pub use query::{Filters, ListQuery, Projected, SortDirection};
pub use schema::{resource_attribute_map, AttributeMap, ResourceKind};
#[cfg(any(test, feature = "test-util"))]
pub use mock::MockRouterPlugin;
