//! Device targets and the registry that parses them

use std::fmt;

use serde::{Serialize, Serializer};
use url::Host;

use crate::errors::FleetError;

/// One device to update, addressed by host only
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceTarget {
    host: Host<String>,
}

impl DeviceTarget {
    /// Validate a single host token (IPv4, bracketed IPv6 or DNS name)
    pub fn parse(token: &str) -> Result<Self, FleetError> {
        let host = Host::parse(token).map_err(|e| {
            FleetError::Configuration(format!("Invalid device host '{}': {}", token, e))
        })?;
        Ok(Self { host })
    }

    /// Host as it appears in URLs
    pub fn host(&self) -> String {
        self.host.to_string()
    }

    /// `http://host[:port]`, omitting the default HTTP port
    pub fn base_url(&self, port: u16) -> String {
        if port == 80 {
            format!("http://{}", self.host)
        } else {
            format!("http://{}:{}", self.host, port)
        }
    }
}

impl fmt::Display for DeviceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.host)
    }
}

impl Serialize for DeviceTarget {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.host)
    }
}

/// Parse a comma-separated device list.
///
/// Tokens are trimmed and empty tokens dropped. Duplicates are kept and each
/// one is updated on its own. An empty result or any malformed host aborts the
/// whole run before a device is touched.
pub fn parse_targets(raw: &str) -> Result<Vec<DeviceTarget>, FleetError> {
    let targets = raw
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(DeviceTarget::parse)
        .collect::<Result<Vec<_>, _>>()?;

    if targets.is_empty() {
        return Err(FleetError::Configuration(
            "No device targets configured".to_string(),
        ));
    }

    Ok(targets)
}
