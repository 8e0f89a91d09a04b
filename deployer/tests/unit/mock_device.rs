//! Scripted in-memory device fleet

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use fwfleet::deploy::fsm::UpdateSettings;
use fwfleet::deploy::transport::{DeviceTransport, Partition};
use fwfleet::errors::UpdateError;
use fwfleet::models::target::DeviceTarget;
use fwfleet::utils::BackoffOptions;

/// How a device answers one upload
#[derive(Debug, Clone, Copy)]
pub enum Step {
    Accept,
    Reject(u16),
    /// Holds the request for its full timeout, then fails
    Timeout,
    /// Fails immediately, like a refused connection
    Refuse,
    /// Kills the update task
    Panic,
}

type Key = (String, Partition);

/// Devices keyed by host. Uploads not scripted are accepted.
#[derive(Default)]
pub struct MockDevice {
    scripts: Mutex<HashMap<Key, VecDeque<Step>>>,
    fallback: Mutex<HashMap<Key, Step>>,
    offline: Mutex<HashSet<String>>,
    uploads: Mutex<Vec<Key>>,
    upload_delay: Option<Duration>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MockDevice {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every upload takes `delay` before answering
    pub fn with_upload_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            upload_delay: Some(delay),
            ..Default::default()
        })
    }

    /// Answer the next uploads with `steps`, then fall back
    pub fn script(&self, host: &str, partition: Partition, steps: &[Step]) {
        self.scripts
            .lock()
            .unwrap()
            .insert((host.to_string(), partition), steps.iter().copied().collect());
    }

    /// Answer every upload not covered by a script with `step`
    pub fn always(&self, host: &str, partition: Partition, step: Step) {
        self.fallback
            .lock()
            .unwrap()
            .insert((host.to_string(), partition), step);
    }

    /// Liveness probes to `host` fail
    pub fn offline(&self, host: &str) {
        self.offline.lock().unwrap().insert(host.to_string());
    }

    /// Upload attempts seen for `host` and `partition`
    pub fn attempts(&self, host: &str, partition: Partition) -> usize {
        self.uploads
            .lock()
            .unwrap()
            .iter()
            .filter(|(h, p)| h == host && *p == partition)
            .count()
    }

    pub fn total_uploads(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn next_step(&self, key: &Key) -> Step {
        if let Some(step) = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(key)
            .and_then(VecDeque::pop_front)
        {
            return step;
        }
        self.fallback
            .lock()
            .unwrap()
            .get(key)
            .copied()
            .unwrap_or(Step::Accept)
    }
}

#[async_trait]
impl DeviceTransport for MockDevice {
    async fn upload(
        &self,
        target: &DeviceTarget,
        partition: Partition,
        _image: Bytes,
        timeout: Duration,
    ) -> Result<(), UpdateError> {
        let key = (target.host(), partition);
        self.uploads.lock().unwrap().push(key.clone());
        let step = self.next_step(&key);

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.upload_delay {
            tokio::time::sleep(delay.min(timeout)).await;
        }

        let result = match step {
            Step::Accept => Ok(()),
            Step::Reject(status) => Err(UpdateError::DeviceRejected {
                status,
                body: "Invalid image".to_string(),
            }),
            Step::Timeout => {
                tokio::time::sleep(timeout).await;
                Err(UpdateError::TransientNetwork(
                    "timeout: operation timed out".to_string(),
                ))
            }
            Step::Refuse => Err(UpdateError::TransientNetwork(
                "connect: connection refused".to_string(),
            )),
            Step::Panic => {
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                panic!("{} {} upload crashed", key.0, partition);
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn probe(&self, target: &DeviceTarget, _timeout: Duration) -> bool {
        !self.offline.lock().unwrap().contains(&target.host())
    }
}

/// Short timings for paused-clock tests
pub fn test_settings() -> UpdateSettings {
    UpdateSettings {
        device_timeout: Duration::from_secs(120),
        max_attempts: 3,
        backoff: BackoffOptions {
            step: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
        },
        request_timeout: Duration::from_secs(10),
        settle_delay: Duration::from_secs(2),
        settle_probes: 3,
        settle_probe_interval: Duration::from_secs(1),
        probe_timeout: Duration::from_secs(1),
    }
}

pub fn targets(hosts: &[&str]) -> Vec<DeviceTarget> {
    hosts
        .iter()
        .map(|h| DeviceTarget::parse(h).unwrap())
        .collect()
}
