//! Device transport seam

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::errors::UpdateError;
use crate::models::target::DeviceTarget;

/// Flash partition addressed by an upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    /// Application image
    Firmware,

    /// Web-asset image
    Www,
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Partition::Firmware => f.write_str("firmware"),
            Partition::Www => f.write_str("www"),
        }
    }
}

/// The device update API, as seen by the updater.
///
/// Implementations must return within `timeout`.
#[async_trait]
pub trait DeviceTransport: Send + Sync {
    /// Send `image` to the partition's update endpoint
    async fn upload(
        &self,
        target: &DeviceTarget,
        partition: Partition,
        image: Bytes,
        timeout: Duration,
    ) -> Result<(), UpdateError>;

    /// Whether the device answers its liveness endpoint
    async fn probe(&self, target: &DeviceTarget, timeout: Duration) -> bool;
}
