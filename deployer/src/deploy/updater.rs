//! Two-stage updater for a single device

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};

use crate::deploy::fsm::{UpdateEvent, UpdateFsm, UpdateSettings, UpdateState};
use crate::deploy::images::FirmwareImages;
use crate::deploy::transport::{DeviceTransport, Partition};
use crate::errors::{StageFailed, UpdateError};
use crate::models::outcome::DeploymentOutcome;
use crate::models::target::DeviceTarget;
use crate::utils::calc_linear_backoff;

/// Drives one device from `Idle` to `WwwVerified` or `Failed`.
///
/// Every request timeout and every wait is clamped to what is left of
/// `device_timeout`, so a request in flight is never aborted from outside
/// and the device never overruns its budget.
pub struct DeviceUpdater {
    transport: Arc<dyn DeviceTransport>,
    settings: UpdateSettings,
}

/// Whether a stage handed over to the next one
type Advanced = Result<bool, String>;

impl DeviceUpdater {
    pub fn new(transport: Arc<dyn DeviceTransport>, settings: UpdateSettings) -> Self {
        Self {
            transport,
            settings,
        }
    }

    /// Update one device. Never fails: every problem ends up in the outcome.
    pub async fn update(&self, target: &DeviceTarget, images: &FirmwareImages) -> DeploymentOutcome {
        let started = Instant::now();
        let deadline = started + self.settings.device_timeout;
        let mut fsm = UpdateFsm::new();

        if let Err(e) = self.drive(&mut fsm, target, images, deadline).await {
            error!("Update state machine error for {}: {}", target, e);
            if !fsm.state().is_terminal() {
                let _ = fsm.process(UpdateEvent::GiveUp(e));
            }
        }

        let state = fsm.state();
        let success = state == UpdateState::WwwVerified;
        if success {
            info!("Device {} updated in {:?}", target, started.elapsed());
        } else {
            error!(
                "Device {} failed at {}: {}",
                target,
                state.stage(),
                fsm.error().unwrap_or("unknown error")
            );
        }

        DeploymentOutcome {
            target: target.clone(),
            stage: state.stage(),
            success,
            attempts: fsm.attempts(),
            error: if success {
                None
            } else {
                Some(fsm.error().unwrap_or("unknown error").to_string())
            },
            elapsed_ms: started.elapsed().as_millis() as u64,
        }
    }

    async fn drive(
        &self,
        fsm: &mut UpdateFsm,
        target: &DeviceTarget,
        images: &FirmwareImages,
        deadline: Instant,
    ) -> Result<(), String> {
        fsm.process(UpdateEvent::Start)?;

        if !self
            .upload_stage(fsm, target, Partition::Firmware, &images.firmware, deadline)
            .await?
        {
            return Ok(());
        }

        if !self.settle(fsm, target, deadline).await? {
            return Ok(());
        }

        self.upload_stage(fsm, target, Partition::Www, &images.www, deadline)
            .await?;
        Ok(())
    }

    async fn upload_stage(
        &self,
        fsm: &mut UpdateFsm,
        target: &DeviceTarget,
        partition: Partition,
        image: &Bytes,
        deadline: Instant,
    ) -> Advanced {
        let mut last_error = None;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                let attempts = fsm.attempts();
                let err = last_error
                    .unwrap_or(UpdateError::DeadlineExceeded(self.settings.device_timeout));
                return self.give_up(fsm, attempts, err);
            }

            let timeout = self.settings.request_timeout.min(remaining);
            debug!(
                "Uploading {} image to {} (attempt {}/{}, {} bytes, timeout {:?})",
                partition,
                target,
                fsm.attempts() + 1,
                self.settings.max_attempts,
                image.len(),
                timeout
            );

            match self
                .transport
                .upload(target, partition, image.clone(), timeout)
                .await
            {
                Ok(()) => {
                    fsm.process(UpdateEvent::UploadAccepted)?;
                    info!("{} image accepted by {}", partition, target);
                    return Ok(true);
                }
                Err(e) => {
                    fsm.process(UpdateEvent::AttemptFailed(e.to_string()))?;
                    let attempts = fsm.attempts();
                    warn!(
                        "{} upload to {} failed (attempt {}/{}): {}",
                        partition, target, attempts, self.settings.max_attempts, e
                    );

                    if !fsm.can_retry(self.settings.max_attempts) {
                        return self.give_up(fsm, attempts, e);
                    }

                    let delay = calc_linear_backoff(&self.settings.backoff, attempts);
                    if !sleep_within(delay, deadline).await {
                        warn!("Update budget for {} exhausted before retry", target);
                        return self.give_up(fsm, attempts, e);
                    }
                    last_error = Some(e);
                }
            }
        }
    }

    /// Wait out the reboot after a firmware upload, then probe for liveness
    async fn settle(&self, fsm: &mut UpdateFsm, target: &DeviceTarget, deadline: Instant) -> Advanced {
        info!(
            "Waiting {:?} for {} to reboot",
            self.settings.settle_delay, target
        );
        if !sleep_within(self.settings.settle_delay, deadline).await {
            return self.give_up(
                fsm,
                0,
                UpdateError::DeadlineExceeded(self.settings.device_timeout),
            );
        }

        let mut probes = 0;
        let mut online = self.settings.settle_probes == 0;
        while !online && probes < self.settings.settle_probes {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }

            probes += 1;
            online = self
                .transport
                .probe(target, self.settings.probe_timeout.min(remaining))
                .await;
            if online {
                info!("Device {} is back online", target);
            } else {
                debug!("Device {} not reachable yet (probe {})", target, probes);
                if probes < self.settings.settle_probes
                    && !sleep_within(self.settings.settle_probe_interval, deadline).await
                {
                    break;
                }
            }
        }

        if !online {
            let err = if probes == 0 {
                UpdateError::DeadlineExceeded(self.settings.device_timeout)
            } else {
                UpdateError::SettleTimeout(format!("no answer to {} liveness probe(s)", probes))
            };
            return self.give_up(fsm, probes, err);
        }

        fsm.process(UpdateEvent::Settled)?;
        Ok(true)
    }

    fn give_up(&self, fsm: &mut UpdateFsm, attempts: u32, last_error: UpdateError) -> Advanced {
        let failure = StageFailed {
            stage: fsm.state().stage(),
            attempts,
            last_error,
        };
        fsm.process(UpdateEvent::GiveUp(failure.to_string()))?;
        Ok(false)
    }
}

/// Sleep for `delay` unless that would run past `deadline`
async fn sleep_within(delay: Duration, deadline: Instant) -> bool {
    if Instant::now() + delay > deadline {
        return false;
    }
    sleep(delay).await;
    true
}
