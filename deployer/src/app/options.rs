//! Command line and environment options

use std::collections::HashMap;
use std::path::PathBuf;

use secrecy::SecretString;

use crate::deploy::fsm::UpdateSettings;
use crate::errors::FleetError;
use crate::filesys::file::File;
use crate::logs::{LogLevel, LogOptions};
use crate::storage::settings::{DeviceApiSettings, Settings, UpstreamSettings};
use crate::upstream::Trigger;

/// Environment variable holding the comma-separated device list
pub const DEVICES_ENV: &str = "FWFLEET_DEVICES";

/// Environment variable naming the CI event that started the run
pub const EVENT_ENV: &str = "GITHUB_EVENT_NAME";

/// Environment variable with an optional GitHub API token
pub const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Parsed `command --key=value --flag` arguments
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub command: Option<String>,
    flags: HashMap<String, String>,
}

impl CliArgs {
    /// Parse arguments, program name excluded
    pub fn parse<I>(args: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut cli = CliArgs::default();

        for arg in args {
            if let Some((key, value)) = arg.split_once('=') {
                cli.flags
                    .insert(key.trim_start_matches('-').to_string(), value.to_string());
            } else if arg.starts_with("--") {
                cli.flags
                    .insert(arg.trim_start_matches('-').to_string(), "true".to_string());
            } else if cli.command.is_none() {
                cli.command = Some(arg);
            }
        }

        cli
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.flags
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn has(&self, key: &str) -> bool {
        self.flags.contains_key(key)
    }

    fn parse_flag<T: std::str::FromStr>(&self, key: &str) -> Result<Option<T>, FleetError> {
        self.get(key)
            .map(|raw| {
                raw.parse().map_err(|_| {
                    FleetError::Configuration(format!("Invalid value for --{}: {}", key, raw))
                })
            })
            .transpose()
    }
}

/// Load `--config=<path>` if given, defaults otherwise
pub async fn load_settings(cli: &CliArgs) -> Result<Settings, FleetError> {
    match cli.get("config") {
        Some(path) => File::new(path).read_json::<Settings>().await,
        None => Ok(Settings::default()),
    }
}

/// Logging options from flags, falling back to the settings file
pub fn log_options(cli: &CliArgs, settings: &Settings) -> LogOptions {
    LogOptions {
        log_level: cli
            .get("log-level")
            .and_then(|level| level.parse::<LogLevel>().ok())
            .unwrap_or_else(|| settings.log_level.clone()),
        json_format: cli.has("json-logs"),
        log_dir: cli.get("log-dir").map(PathBuf::from),
    }
}

/// Options of the `check-upstream` command
#[derive(Debug)]
pub struct CheckOptions {
    /// Revision supplied by the caller; fetched from upstream when absent
    pub revision: Option<String>,

    pub trigger: Trigger,

    pub upstream: UpstreamSettings,

    pub github_token: Option<SecretString>,
}

impl CheckOptions {
    pub fn resolve<E>(cli: &CliArgs, settings: &Settings, env: E) -> Self
    where
        E: Fn(&str) -> Option<String>,
    {
        let mut upstream = settings.upstream.clone();
        if let Some(marker) = cli.get("marker") {
            upstream.marker_file = PathBuf::from(marker);
        }
        if let Some(repo) = cli.get("repo") {
            upstream.repo = repo.to_string();
        }
        if let Some(branch) = cli.get("branch") {
            upstream.branch = branch.to_string();
        }

        let trigger = cli
            .get("event")
            .map(str::to_string)
            .or_else(|| env(EVENT_ENV))
            .map(|event| Trigger::from_event_name(&event))
            .unwrap_or(Trigger::Schedule);

        Self {
            revision: cli.get("revision").map(|r| r.trim().to_string()),
            trigger,
            upstream,
            github_token: env(GITHUB_TOKEN_ENV)
                .filter(|t| !t.is_empty())
                .map(SecretString::from),
        }
    }
}

/// Options of the `deploy` command
#[derive(Debug)]
pub struct DeployOptions {
    /// Raw device list; kept secret since it maps the operator's network
    pub devices: SecretString,

    pub firmware: PathBuf,

    pub www: PathBuf,

    pub device_api: DeviceApiSettings,

    pub update: UpdateSettings,

    pub concurrency: usize,

    /// Where to write the JSON report, if anywhere
    pub report: Option<PathBuf>,
}

impl DeployOptions {
    pub fn resolve<E>(cli: &CliArgs, settings: &Settings, env: E) -> Result<Self, FleetError>
    where
        E: Fn(&str) -> Option<String>,
    {
        let devices = cli
            .get("devices")
            .map(str::to_string)
            .or_else(|| env(DEVICES_ENV))
            .ok_or_else(|| {
                FleetError::Configuration(format!(
                    "No devices given: pass --devices=IP1,IP2 or set {}",
                    DEVICES_ENV
                ))
            })?;

        let mut update = settings.update.clone();
        if let Some(attempts) = cli.parse_flag::<u32>("max-attempts")? {
            update.max_attempts = attempts;
        }
        if let Some(timeout) = cli.parse_flag::<u64>("device-timeout")? {
            update.device_timeout_secs = timeout;
        }

        let mut device_api = settings.device.clone();
        if let Some(port) = cli.parse_flag::<u16>("port")? {
            device_api.port = port;
        }

        Ok(Self {
            devices: SecretString::from(devices),
            firmware: cli
                .get("firmware")
                .map(PathBuf::from)
                .unwrap_or_else(|| settings.artifacts.firmware.clone()),
            www: cli
                .get("www")
                .map(PathBuf::from)
                .unwrap_or_else(|| settings.artifacts.www.clone()),
            device_api,
            update: update.to_update_settings(),
            concurrency: cli
                .parse_flag::<usize>("concurrency")?
                .unwrap_or(settings.concurrency)
                .max(1),
            report: cli.get("report").map(PathBuf::from),
        })
    }
}
