//! Command entry points

use std::sync::Arc;
use std::time::Duration;

use secrecy::ExposeSecret;
use tracing::{error, info, info_span, warn, Instrument};

use crate::app::options::{CheckOptions, DeployOptions};
use crate::app::report::{render_summary, write_report};
use crate::deploy::images::FirmwareImages;
use crate::deploy::orchestrator::FleetDeployer;
use crate::deploy::transport::DeviceTransport;
use crate::deploy::updater::DeviceUpdater;
use crate::errors::FleetError;
use crate::filesys::file::File;
use crate::http::client::HttpClient;
use crate::http::device::HttpDeviceTransport;
use crate::http::upstream::fetch_head_revision;
use crate::models::outcome::FleetResult;
use crate::models::target::parse_targets;
use crate::storage::marker::MarkerStore;
use crate::upstream::tracker::RevisionTracker;
use crate::utils::generate_uuid;

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_USAGE: i32 = 2;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

// ============================== CHECK UPSTREAM =================================== //

/// Decide whether a deployment cycle should run.
///
/// Non-scheduled triggers always proceed without touching the marker.
/// Scheduled runs compare against the marker and rewrite it.
pub async fn check_upstream(options: &CheckOptions) -> Result<bool, FleetError> {
    if !options.trigger.gated_by_upstream() {
        info!("{:?} trigger, deployment proceeds unconditionally", options.trigger);
        return Ok(true);
    }

    let store = MarkerStore::new(File::new(&options.upstream.marker_file));
    let previous = store.load().await;

    let current = match options.revision.as_deref().map(str::trim) {
        Some("") => {
            return Err(FleetError::Configuration(
                "--revision must not be blank".to_string(),
            ))
        }
        Some(revision) => revision.to_string(),
        None => {
            let client = HttpClient::new(CONNECT_TIMEOUT)?;
            let token = options
                .github_token
                .as_ref()
                .map(|t| t.expose_secret().to_string());
            fetch_head_revision(&client, &options.upstream, token.as_deref()).await?
        }
    };

    let check = RevisionTracker::check(&previous, &current);
    if let Err(e) = store.save(&check.marker).await {
        warn!(
            "Unable to update revision marker {}: {}",
            store.file().path().display(),
            e
        );
    }

    if check.changed {
        info!("New upstream revision detected: {}", check.marker.revision);
    } else {
        info!("No new upstream revisions ({})", check.marker.revision);
    }
    Ok(check.changed)
}

/// `check-upstream`: prints `changed=<bool>`, exits 0 when a deployment should run
pub async fn run_check_upstream(options: CheckOptions) -> i32 {
    match check_upstream(&options).await {
        Ok(changed) => {
            println!("changed={}", changed);
            if changed {
                EXIT_SUCCESS
            } else {
                EXIT_FAILURE
            }
        }
        Err(e) => {
            error!("Error checking upstream: {}", e);
            println!("changed=false");
            EXIT_FAILURE
        }
    }
}

// ================================== DEPLOY ======================================= //

/// Deploy over HTTP to every configured device
pub async fn deploy(options: &DeployOptions) -> Result<FleetResult, FleetError> {
    let client = HttpClient::new(CONNECT_TIMEOUT)?;
    let transport = Arc::new(HttpDeviceTransport::new(client, options.device_api.clone()));
    deploy_with_transport(options, transport).await
}

/// Deploy through an arbitrary device transport.
///
/// Configuration and artifacts are validated before any device is contacted.
pub async fn deploy_with_transport(
    options: &DeployOptions,
    transport: Arc<dyn DeviceTransport>,
) -> Result<FleetResult, FleetError> {
    let targets = parse_targets(options.devices.expose_secret())?;
    let images = FirmwareImages::load(&options.firmware, &options.www).await?;

    let run_id = generate_uuid();
    let span = info_span!("deploy", run_id = %run_id);

    let result = async move {
        info!("Starting deployment run to {} device(s)", targets.len());
        let updater = DeviceUpdater::new(transport, options.update.clone());
        let deployer = FleetDeployer::new(updater, options.concurrency);
        deployer.deploy(&targets, &images).await
    }
    .instrument(span)
    .await;

    Ok(result)
}

/// `deploy`: prints the summary table, exits 0 only if every device verified
pub async fn run_deploy(options: DeployOptions) -> i32 {
    let result = match deploy(&options).await {
        Ok(result) => result,
        Err(e) => {
            error!("Deployment aborted: {}", e);
            return EXIT_FAILURE;
        }
    };

    print!("{}", render_summary(&result));

    if let Some(path) = &options.report {
        if let Err(e) = write_report(path, &result).await {
            error!("Unable to write report to {}: {}", path.display(), e);
        }
    }

    exit_code(&result)
}

/// Process exit status for a finished run
pub fn exit_code(result: &FleetResult) -> i32 {
    if result.overall {
        EXIT_SUCCESS
    } else {
        EXIT_FAILURE
    }
}
