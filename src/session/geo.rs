//! Best-effort coarse geolocation.
//!
//! Resolution is a capability returning a tagged value, never an error: a
//! failed or unavailable lookup yields [`GeoLocation::Unknown`] so the
//! session transition path cannot be blocked by geo trouble.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;

/// Coarse location attached to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum GeoLocation {
    Resolved { city: String, country: String },
    Unknown,
}

/// Maps a network address to a coarse location.
pub trait GeoResolver: Send + Sync {
    fn resolve(&self, addr: IpAddr) -> GeoLocation;
}

/// Resolver for deployments without a geo database: everything is Unknown.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLookupGeoResolver;

impl GeoResolver for NoLookupGeoResolver {
    fn resolve(&self, _addr: IpAddr) -> GeoLocation {
        GeoLocation::Unknown
    }
}

/// Fixed-table resolver, used in tests and small self-hosted setups.
#[derive(Debug, Default)]
pub struct StaticGeoResolver {
    table: HashMap<IpAddr, (String, String)>,
}

impl StaticGeoResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, addr: IpAddr, city: impl Into<String>, country: impl Into<String>) -> Self {
        self.table.insert(addr, (city.into(), country.into()));
        self
    }
}

impl GeoResolver for StaticGeoResolver {
    fn resolve(&self, addr: IpAddr) -> GeoLocation {
        match self.table.get(&addr) {
            Some((city, country)) => GeoLocation::Resolved {
                city: city.clone(),
                country: country.clone(),
            },
            None => GeoLocation::Unknown,
        }
    }
}
