use std::fmt::{Display, Formatter};

use serde::Deserialize;

/// A region visible to the current credential.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Region {
    /// Region id such as `cn-hangzhou`.
    pub region_id: String,
    /// Localized display name.
    #[serde(default)]
    pub local_name: String,
    /// Region specific endpoint.
    #[serde(default)]
    pub region_endpoint: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct DescribeRegionsResponse {
    pub regions: Regions,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub(crate) struct Regions {
    pub region: Vec<Region>,
}

/// A zone inside a region.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Zone {
    /// Zone id such as `cn-hangzhou-b`.
    pub zone_id: String,
    /// Localized display name.
    #[serde(default)]
    pub local_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct DescribeZonesResponse {
    pub zones: Zones,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub(crate) struct Zones {
    pub zone: Vec<Zone>,
}

/// Key of a resource that is unique by name within a zone, such as a
/// security group or key pair created for a node group.
///
/// Equality and hashing are structural, so it can key a
/// [`cloudrt_core::KeyedResourceCache`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ZoneAndName {
    /// Zone (or region) the resource lives in.
    pub zone_id: String,
    /// Resource name.
    pub name: String,
}

impl ZoneAndName {
    /// Create a new key.
    pub fn new(zone_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            zone_id: zone_id.into(),
            name: name.into(),
        }
    }
}

impl Display for ZoneAndName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.zone_id, self.name)
    }
}
