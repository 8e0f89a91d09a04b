//! Settings file management

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::deploy::fsm::UpdateSettings;
use crate::deploy::orchestrator::DEFAULT_CONCURRENCY;
use crate::logs::LogLevel;
use crate::utils::BackoffOptions;

/// fwfleet settings, loaded from an optional JSON file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Device HTTP API
    #[serde(default)]
    pub device: DeviceApiSettings,

    /// Retry, timeout and settle policy
    #[serde(default)]
    pub update: UpdatePolicySettings,

    /// Devices updated at once
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Build artifact locations
    #[serde(default)]
    pub artifacts: ArtifactSettings,

    /// Upstream change detection
    #[serde(default)]
    pub upstream: UpstreamSettings,
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            device: DeviceApiSettings::default(),
            update: UpdatePolicySettings::default(),
            concurrency: default_concurrency(),
            artifacts: ArtifactSettings::default(),
            upstream: UpstreamSettings::default(),
        }
    }
}

/// Device HTTP API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceApiSettings {
    /// HTTP port of every device
    #[serde(default = "default_device_port")]
    pub port: u16,

    /// Application image upload endpoint
    #[serde(default = "default_firmware_path")]
    pub firmware_path: String,

    /// Web-asset image upload endpoint
    #[serde(default = "default_www_path")]
    pub www_path: String,

    /// Liveness endpoint polled after a reboot
    #[serde(default = "default_info_path")]
    pub info_path: String,
}

fn default_device_port() -> u16 {
    80
}

fn default_firmware_path() -> String {
    "/api/system/OTA".to_string()
}

fn default_www_path() -> String {
    "/api/system/WWW".to_string()
}

fn default_info_path() -> String {
    "/api/system/info".to_string()
}

impl Default for DeviceApiSettings {
    fn default() -> Self {
        Self {
            port: default_device_port(),
            firmware_path: default_firmware_path(),
            www_path: default_www_path(),
            info_path: default_info_path(),
        }
    }
}

/// Retry and timeout policy, in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdatePolicySettings {
    pub max_attempts: u32,
    pub retry_delay_secs: u64,
    pub max_retry_delay_secs: u64,
    pub request_timeout_secs: u64,
    pub device_timeout_secs: u64,
    pub settle_delay_secs: u64,
    pub settle_probes: u32,
    pub settle_probe_interval_secs: u64,
    pub probe_timeout_secs: u64,
}

impl Default for UpdatePolicySettings {
    fn default() -> Self {
        let defaults = UpdateSettings::default();
        Self {
            max_attempts: defaults.max_attempts,
            retry_delay_secs: defaults.backoff.step.as_secs(),
            max_retry_delay_secs: defaults.backoff.max_delay.as_secs(),
            request_timeout_secs: defaults.request_timeout.as_secs(),
            device_timeout_secs: defaults.device_timeout.as_secs(),
            settle_delay_secs: defaults.settle_delay.as_secs(),
            settle_probes: defaults.settle_probes,
            settle_probe_interval_secs: defaults.settle_probe_interval.as_secs(),
            probe_timeout_secs: defaults.probe_timeout.as_secs(),
        }
    }
}

impl UpdatePolicySettings {
    /// Convert to the updater's settings; at least one attempt is always made
    pub fn to_update_settings(&self) -> UpdateSettings {
        UpdateSettings {
            device_timeout: Duration::from_secs(self.device_timeout_secs),
            max_attempts: self.max_attempts.max(1),
            backoff: BackoffOptions {
                step: Duration::from_secs(self.retry_delay_secs),
                max_delay: Duration::from_secs(self.max_retry_delay_secs),
            },
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            settle_delay: Duration::from_secs(self.settle_delay_secs),
            settle_probes: self.settle_probes,
            settle_probe_interval: Duration::from_secs(self.settle_probe_interval_secs),
            probe_timeout: Duration::from_secs(self.probe_timeout_secs),
        }
    }
}

/// Build artifact paths
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactSettings {
    #[serde(default = "default_firmware_artifact")]
    pub firmware: PathBuf,

    #[serde(default = "default_www_artifact")]
    pub www: PathBuf,
}

fn default_firmware_artifact() -> PathBuf {
    PathBuf::from("ESP-miner/build/esp-miner.bin")
}

fn default_www_artifact() -> PathBuf {
    PathBuf::from("ESP-miner/build/www.bin")
}

impl Default for ArtifactSettings {
    fn default() -> Self {
        Self {
            firmware: default_firmware_artifact(),
            www: default_www_artifact(),
        }
    }
}

/// Upstream repository tracked for changes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamSettings {
    /// GitHub API base URL
    pub api_base: String,

    /// `owner/name`
    pub repo: String,

    pub branch: String,

    /// Flat file holding the last seen revision
    pub marker_file: PathBuf,

    pub timeout_secs: u64,
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".to_string(),
            repo: "skot/ESP-miner".to_string(),
            branch: "master".to_string(),
            marker_file: PathBuf::from(".last_upstream_commit"),
            timeout_secs: 30,
        }
    }
}
