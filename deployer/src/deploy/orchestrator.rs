//! Fleet-wide fan-out of device updates
//!
//! One task per target, bounded by a semaphore so a large fleet does not
//! saturate the local link. Tasks share nothing mutable; results are joined
//! in target order.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{error, info, info_span, Instrument};

use crate::deploy::images::FirmwareImages;
use crate::deploy::updater::DeviceUpdater;
use crate::models::outcome::{DeploymentOutcome, FleetResult, UpdateStage};
use crate::models::target::DeviceTarget;

/// Default number of devices updated at once
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Fleet deployment orchestrator
pub struct FleetDeployer {
    updater: Arc<DeviceUpdater>,
    concurrency: usize,
}

impl FleetDeployer {
    pub fn new(updater: DeviceUpdater, concurrency: usize) -> Self {
        Self {
            updater: Arc::new(updater),
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Attempt every target and collect one outcome per target, in order.
    ///
    /// A failing or panicking device never prevents the others from being
    /// attempted.
    pub async fn deploy(&self, targets: &[DeviceTarget], images: &FirmwareImages) -> FleetResult {
        info!(
            "Deploying to {} device(s), {} at a time",
            targets.len(),
            self.concurrency
        );

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut handles = Vec::with_capacity(targets.len());

        for (index, target) in targets.iter().enumerate() {
            let sem = Arc::clone(&semaphore);
            let updater = Arc::clone(&self.updater);
            let images = images.clone();
            let target = target.clone();
            let span = info_span!("device", index, host = %target);

            handles.push(tokio::spawn(
                async move {
                    // The semaphore is never closed
                    let _permit = sem.acquire_owned().await.ok();
                    updater.update(&target, &images).await
                }
                .instrument(span),
            ));
        }

        let outcomes = join_all(handles)
            .await
            .into_iter()
            .zip(targets)
            .map(|(joined, target)| match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("Update task for {} did not complete: {}", target, e);
                    DeploymentOutcome {
                        target: target.clone(),
                        stage: UpdateStage::Unknown,
                        success: false,
                        attempts: 0,
                        error: Some(format!(
                            "update task did not complete, last stage unknown: {}",
                            e
                        )),
                        elapsed_ms: 0,
                    }
                }
            })
            .collect();

        let result = FleetResult::new(outcomes);
        info!(
            "Deployment finished: {}/{} device(s) updated",
            result.succeeded(),
            result.outcomes.len()
        );
        result
    }
}
