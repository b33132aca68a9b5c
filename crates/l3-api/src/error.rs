//! L3 API errors
//!
//! Every condition carries the identifiers needed to render its message and
//! belongs to an [`ErrorCategory`], so the API layer can map errors to
//! client-facing statuses without inspecting message text.

use std::net::IpAddr;

use thiserror::Error;
use uuid::Uuid;

/// Default reason reported when a router still owns interface ports.
pub const ROUTER_IN_USE_DEFAULT_REASON: &str = "still has ports";

/// Coarse classification of an [`L3Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// A referenced resource does not exist
    NotFound,
    /// The resource is still referenced by something else
    InUse,
    /// The request conflicts with the current state
    Conflict,
    /// The request itself is malformed
    BadRequest,
    /// A tenant quota would be exceeded
    OverQuota,
    /// The backend does not provide the operation
    NotImplemented,
    /// Server-side failure
    Internal,
}

/// Errors raised by the L3 schema layer and by router plugins
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum L3Error {
    /// Referenced router does not exist
    #[error("Router {router_id} could not be found")]
    RouterNotFound { router_id: Uuid },

    /// Router cannot be deleted or modified
    #[error("Router {router_id} {reason}")]
    RouterInUse { router_id: Uuid, reason: String },

    /// The port is not an interface of the router
    #[error("Router {router_id} does not have an interface with id {port_id}")]
    RouterInterfaceNotFound { router_id: Uuid, port_id: Uuid },

    /// The router has no interface on the subnet
    #[error("Router {router_id} has no interface on subnet {subnet_id}")]
    RouterInterfaceNotFoundForSubnet { router_id: Uuid, subnet_id: Uuid },

    /// Removing the interface would orphan floating IP associations
    #[error(
        "Router interface for subnet {subnet_id} on router {router_id} cannot be deleted, \
         as it is required by one or more floating IPs."
    )]
    RouterInterfaceInUseByFloatingIP { router_id: Uuid, subnet_id: Uuid },

    /// Referenced floating IP does not exist
    #[error("Floating IP {floatingip_id} could not be found")]
    FloatingIPNotFound { floatingip_id: Uuid },

    /// No router connects the port's subnet to the external network
    #[error(
        "External network {external_network_id} is not reachable from subnet {subnet_id}.  \
         Therefore, cannot associate Port {port_id} with a Floating IP."
    )]
    ExternalGatewayForFloatingIPNotFound {
        external_network_id: Uuid,
        subnet_id: Uuid,
        port_id: Uuid,
    },

    /// The fixed IP already has a floating IP on this external network
    #[error(
        "Cannot associate floating IP {floating_ip_address} ({fip_id}) with port {port_id} \
         using fixed IP {fixed_ip}, as that fixed IP already has a floating IP on \
         external network {net_id}."
    )]
    FloatingIPPortAlreadyAssociated {
        floating_ip_address: IpAddr,
        fip_id: Uuid,
        port_id: Uuid,
        fixed_ip: IpAddr,
        net_id: Uuid,
    },

    /// Gateway change blocked by dependent floating IPs
    #[error(
        "Gateway cannot be updated for router {router_id}, since a gateway to external \
         network {net_id} is required by one or more floating IPs."
    )]
    RouterExternalGatewayInUseByFloatingIp { router_id: Uuid, net_id: Uuid },

    /// Generic attachment conflict
    #[error("Error {reason} while attempting the operation.")]
    RouterInterfaceAttachmentConflict { reason: String },

    /// Referenced network does not exist
    #[error("Network {net_id} could not be found")]
    NetworkNotFound { net_id: Uuid },

    /// Referenced subnet does not exist
    #[error("Subnet {subnet_id} could not be found")]
    SubnetNotFound { subnet_id: Uuid },

    /// Referenced port does not exist
    #[error("Port {port_id} could not be found")]
    PortNotFound { port_id: Uuid },

    /// Port already owned by another device
    #[error("Unable to complete operation on port {port_id}. The port already has a device {device_id}.")]
    PortInUse { port_id: Uuid, device_id: String },

    /// Requested address already allocated on the network
    #[error("Unable to complete operation for network {net_id}. The IP address {ip_address} is in use.")]
    IpAddressInUse { net_id: Uuid, ip_address: IpAddr },

    /// No free address left on the network
    #[error("No more IP addresses available on network {net_id}.")]
    IpAddressGenerationFailure { net_id: Uuid },

    /// Attribute value failed validation or conversion
    #[error("Invalid input for {attribute}. Reason: {message}.")]
    InvalidInput { attribute: String, message: String },

    /// Required attribute absent from a create request
    #[error("Failed to parse request. Required attribute '{0}' not specified")]
    MissingAttribute(String),

    /// Attribute present in a request that may not carry it
    #[error("Attribute '{attribute}' not allowed in {method}")]
    AttributeNotAllowed { attribute: String, method: &'static str },

    /// Attributes unknown to the resource schema
    #[error("Unrecognized attribute(s) '{0}'")]
    UnrecognizedAttributes(String),

    /// Semantically invalid request for a resource
    #[error("Bad {resource} request: {message}.")]
    BadRequest { resource: &'static str, message: String },

    /// Tenant quota exceeded
    #[error("Quota exceeded for resources: ['{resource}'].")]
    OverQuota { resource: &'static str },

    /// Operation not provided by the backend
    #[error("Operation {0} is not implemented by this plugin")]
    NotImplemented(&'static str),

    /// Configuration could not be loaded
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unexpected backend failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl L3Error {
    /// `RouterInUse` with the default "still has ports" reason
    pub fn router_in_use(router_id: Uuid) -> Self {
        Self::RouterInUse {
            router_id,
            reason: ROUTER_IN_USE_DEFAULT_REASON.to_string(),
        }
    }

    /// `InvalidInput` for the given attribute
    pub fn invalid_input(attribute: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            attribute: attribute.into(),
            message: message.into(),
        }
    }

    /// Category used by the API layer to pick a client-facing status
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::RouterNotFound { .. }
            | Self::RouterInterfaceNotFound { .. }
            | Self::RouterInterfaceNotFoundForSubnet { .. }
            | Self::FloatingIPNotFound { .. }
            | Self::ExternalGatewayForFloatingIPNotFound { .. }
            | Self::NetworkNotFound { .. }
            | Self::SubnetNotFound { .. }
            | Self::PortNotFound { .. } => ErrorCategory::NotFound,
            Self::RouterInUse { .. }
            | Self::RouterInterfaceInUseByFloatingIP { .. }
            | Self::FloatingIPPortAlreadyAssociated { .. }
            | Self::RouterExternalGatewayInUseByFloatingIp { .. }
            | Self::PortInUse { .. }
            | Self::IpAddressInUse { .. } => ErrorCategory::InUse,
            Self::RouterInterfaceAttachmentConflict { .. }
            | Self::IpAddressGenerationFailure { .. } => ErrorCategory::Conflict,
            Self::InvalidInput { .. }
            | Self::MissingAttribute(_)
            | Self::AttributeNotAllowed { .. }
            | Self::UnrecognizedAttributes(_)
            | Self::BadRequest { .. } => ErrorCategory::BadRequest,
            Self::OverQuota { .. } => ErrorCategory::OverQuota,
            Self::NotImplemented(_) => ErrorCategory::NotImplemented,
            Self::InvalidConfig(_) | Self::Internal(_) => ErrorCategory::Internal,
        }
    }

    /// Whether the error means a referenced object is missing
    pub fn is_not_found(&self) -> bool {
        self.category() == ErrorCategory::NotFound
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_router_in_use_default_reason() {
        let id = Uuid::new_v4();
        let err = L3Error::router_in_use(id);
        assert_eq!(err.to_string(), format!("Router {} still has ports", id));
        assert_eq!(err.category(), ErrorCategory::InUse);
    }

    #[test]
    fn test_router_in_use_custom_reason() {
        let id = Uuid::new_v4();
        let err = L3Error::RouterInUse {
            router_id: id,
            reason: "is serving floating IPs".to_string(),
        };
        assert_eq!(err.to_string(), format!("Router {} is serving floating IPs", id));
    }

    #[test]
    fn test_categories() {
        let id = Uuid::new_v4();
        assert!(L3Error::RouterNotFound { router_id: id }.is_not_found());
        assert!(L3Error::FloatingIPNotFound { floatingip_id: id }.is_not_found());
        assert_eq!(
            L3Error::RouterInterfaceAttachmentConflict { reason: "x".into() }.category(),
            ErrorCategory::Conflict
        );
        assert_eq!(
            L3Error::RouterInterfaceInUseByFloatingIP { router_id: id, subnet_id: id }.category(),
            ErrorCategory::InUse
        );
        assert_eq!(
            L3Error::NotImplemented("get_routers_count").category(),
            ErrorCategory::NotImplemented
        );
    }

    #[test]
    fn test_attachment_conflict_message() {
        let err = L3Error::RouterInterfaceAttachmentConflict { reason: "vif busy".into() };
        assert_eq!(err.to_string(), "Error vif busy while attempting the operation.");
    }
}
