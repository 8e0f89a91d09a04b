//! Per-device outcomes and the fleet verdict

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::target::DeviceTarget;

/// Furthest point a device update reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpdateStage {
    /// Application partition upload
    FirmwareUpload,

    /// Post-firmware reboot window
    FirmwareSettle,

    /// Web-asset partition upload
    WwwUpload,

    /// Both partitions accepted
    Verified,

    /// The update task ended without reporting where it stopped
    Unknown,
}

impl UpdateStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateStage::FirmwareUpload => "firmware-upload",
            UpdateStage::FirmwareSettle => "firmware-settle",
            UpdateStage::WwwUpload => "www-upload",
            UpdateStage::Verified => "verified",
            UpdateStage::Unknown => "unknown",
        }
    }
}

impl fmt::Display for UpdateStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of updating one device
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentOutcome {
    pub target: DeviceTarget,
    pub stage: UpdateStage,
    pub success: bool,
    /// Attempts spent in `stage`
    pub attempts: u32,
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

/// Aggregate of one deployment run, in target order
#[derive(Debug, Clone, Serialize)]
pub struct FleetResult {
    pub outcomes: Vec<DeploymentOutcome>,
    pub overall: bool,
}

impl FleetResult {
    pub fn new(outcomes: Vec<DeploymentOutcome>) -> Self {
        let overall = outcomes.iter().all(|o| o.success);
        Self { outcomes, overall }
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &DeploymentOutcome> {
        self.outcomes.iter().filter(|o| !o.success)
    }
}
