//! Request context passed to every plugin operation

use uuid::Uuid;

/// Identity of the caller on whose behalf an operation runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Tenant the caller is scoped to; `None` for unscoped (admin) calls
    pub tenant_id: Option<String>,
    pub user_id: Option<String>,
    pub is_admin: bool,
    pub request_id: String,
}

impl RequestContext {
    /// Non-admin context scoped to a tenant
    pub fn new(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: Some(tenant_id.into()),
            user_id: None,
            is_admin: false,
            request_id: generate_request_id(),
        }
    }

    /// Unscoped admin context
    pub fn admin() -> Self {
        Self {
            tenant_id: None,
            user_id: None,
            is_admin: true,
            request_id: generate_request_id(),
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Whether resources owned by `tenant_id` are visible to this caller
    pub fn can_access(&self, tenant_id: &str) -> bool {
        self.is_admin || self.tenant_id.as_deref() == Some(tenant_id)
    }
}

fn generate_request_id() -> String {
    format!("req-{}", Uuid::new_v4())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_scoping() {
        let ctx = RequestContext::new("tenant-a");
        assert!(ctx.can_access("tenant-a"));
        assert!(!ctx.can_access("tenant-b"));
        assert!(RequestContext::admin().can_access("tenant-b"));
    }

    #[test]
    fn test_request_ids_are_unique() {
        let a = RequestContext::new("t");
        let b = RequestContext::new("t");
        assert!(a.request_id.starts_with("req-"));
        assert_ne!(a.request_id, b.request_id);
    }
}
