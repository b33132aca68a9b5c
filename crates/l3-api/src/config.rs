//! L3 configuration
//!
//! Quota defaults registered for routers and floating IPs. Values come from
//! environment variables; a negative limit means unlimited.

use std::env;

use tracing::debug;

use crate::error::L3Error;

/// Environment variable holding the per-tenant router limit
pub const QUOTA_ROUTER_ENV: &str = "QUOTA_ROUTER";

/// Environment variable holding the per-tenant floating IP limit
pub const QUOTA_FLOATINGIP_ENV: &str = "QUOTA_FLOATINGIP";

pub const DEFAULT_QUOTA_ROUTER: i64 = 10;
pub const DEFAULT_QUOTA_FLOATINGIP: i64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct L3Config {
    /// Routers allowed per tenant
    pub quota_router: i64,
    /// Floating IPs allowed per tenant
    pub quota_floatingip: i64,
}

impl Default for L3Config {
    fn default() -> Self {
        Self {
            quota_router: DEFAULT_QUOTA_ROUTER,
            quota_floatingip: DEFAULT_QUOTA_FLOATINGIP,
        }
    }
}

impl L3Config {
    /// Load from `QUOTA_ROUTER` / `QUOTA_FLOATINGIP`, falling back to defaults
    pub fn from_env() -> Result<Self, L3Error> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load using an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, L3Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self {
            quota_router: read_limit(&lookup, QUOTA_ROUTER_ENV, DEFAULT_QUOTA_ROUTER)?,
            quota_floatingip: read_limit(&lookup, QUOTA_FLOATINGIP_ENV, DEFAULT_QUOTA_FLOATINGIP)?,
        };
        debug!(
            "L3 quotas: router={}, floatingip={}",
            config.quota_router, config.quota_floatingip
        );
        Ok(config)
    }

    /// No limits at all
    pub fn unlimited() -> Self {
        Self { quota_router: -1, quota_floatingip: -1 }
    }
}

fn read_limit<F>(lookup: &F, name: &str, default: i64) -> Result<i64, L3Error>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(raw) => raw.trim().parse::<i64>().map_err(|e| {
            L3Error::InvalidConfig(format!("{} must be an integer, got '{}': {}", name, raw, e))
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = L3Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, L3Config::default());
        assert_eq!(config.quota_router, 10);
        assert_eq!(config.quota_floatingip, 50);
    }

    #[test]
    fn test_overrides() {
        let config = L3Config::from_lookup(lookup_from(&[
            (QUOTA_ROUTER_ENV, "3"),
            (QUOTA_FLOATINGIP_ENV, " -1 "),
        ]))
        .unwrap();
        assert_eq!(config.quota_router, 3);
        assert_eq!(config.quota_floatingip, -1);
    }

    #[test]
    fn test_invalid_value() {
        let err = L3Config::from_lookup(lookup_from(&[(QUOTA_ROUTER_ENV, "ten")])).unwrap_err();
        assert!(matches!(err, L3Error::InvalidConfig(_)));
    }
}
