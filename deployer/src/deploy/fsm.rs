//! Finite State Machine for a two-stage device update

use std::time::Duration;

use crate::models::outcome::UpdateStage;
use crate::utils::BackoffOptions;

/// Update settings
#[derive(Debug, Clone)]
pub struct UpdateSettings {
    /// Budget for one device across every stage, retry and wait
    pub device_timeout: Duration,

    /// Attempts per upload stage
    pub max_attempts: u32,

    /// Delay between attempts
    pub backoff: BackoffOptions,

    /// Timeout of a single upload request
    pub request_timeout: Duration,

    /// Initial wait after the firmware upload is accepted
    pub settle_delay: Duration,

    /// Liveness probes after the initial wait; 0 means wait only
    pub settle_probes: u32,

    /// Delay between liveness probes
    pub settle_probe_interval: Duration,

    /// Timeout of a single liveness probe
    pub probe_timeout: Duration,
}

impl Default for UpdateSettings {
    fn default() -> Self {
        Self {
            device_timeout: Duration::from_secs(180),
            max_attempts: 3,
            backoff: BackoffOptions::default(),
            request_timeout: Duration::from_secs(15),
            settle_delay: Duration::from_secs(10),
            settle_probes: 5,
            settle_probe_interval: Duration::from_secs(5),
            probe_timeout: Duration::from_secs(2),
        }
    }
}

/// Update state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateState {
    /// Nothing sent yet
    Idle,

    /// Sending the application image
    FirmwareUploading,

    /// Application image accepted, device rebooting
    FirmwareVerified,

    /// Sending the web-asset image
    WwwUploading,

    /// Both partitions accepted (terminal)
    WwwVerified,

    /// Gave up in the given stage (terminal)
    Failed(UpdateStage),
}

impl UpdateState {
    /// Stage this state belongs to
    pub fn stage(&self) -> UpdateStage {
        match self {
            UpdateState::Idle | UpdateState::FirmwareUploading => UpdateStage::FirmwareUpload,
            UpdateState::FirmwareVerified => UpdateStage::FirmwareSettle,
            UpdateState::WwwUploading => UpdateStage::WwwUpload,
            UpdateState::WwwVerified => UpdateStage::Verified,
            UpdateState::Failed(stage) => *stage,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, UpdateState::WwwVerified | UpdateState::Failed(_))
    }
}

/// Update event
#[derive(Debug, Clone)]
pub enum UpdateEvent {
    /// Begin the firmware stage
    Start,

    /// Device answered an upload with a success status
    UploadAccepted,

    /// One attempt of the current upload failed
    AttemptFailed(String),

    /// Device is reachable again after the firmware reboot
    Settled,

    /// Stop in the current stage
    GiveUp(String),
}

/// Per-device update FSM
#[derive(Debug, Clone)]
pub struct UpdateFsm {
    state: UpdateState,
    error: Option<String>,
    attempts: u32,
}

impl UpdateFsm {
    /// Create a new FSM in idle state
    pub fn new() -> Self {
        Self {
            state: UpdateState::Idle,
            error: None,
            attempts: 0,
        }
    }

    /// Get current state
    pub fn state(&self) -> UpdateState {
        self.state
    }

    /// Last error, if any
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Attempts made in the current stage
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Process an event and transition state
    pub fn process(&mut self, event: UpdateEvent) -> Result<(), String> {
        let new_state = match (&self.state, &event) {
            (UpdateState::Idle, UpdateEvent::Start) => UpdateState::FirmwareUploading,

            (UpdateState::FirmwareUploading, UpdateEvent::UploadAccepted) => {
                self.attempts += 1;
                UpdateState::FirmwareVerified
            }
            (UpdateState::FirmwareVerified, UpdateEvent::Settled) => {
                self.attempts = 0;
                self.error = None;
                UpdateState::WwwUploading
            }
            (UpdateState::WwwUploading, UpdateEvent::UploadAccepted) => {
                self.attempts += 1;
                UpdateState::WwwVerified
            }

            // A failed attempt keeps the stage; the caller decides whether to retry
            (
                UpdateState::FirmwareUploading | UpdateState::WwwUploading,
                UpdateEvent::AttemptFailed(err),
            ) => {
                self.attempts += 1;
                self.error = Some(err.clone());
                self.state
            }

            (state, UpdateEvent::GiveUp(err)) if !state.is_terminal() => {
                self.error = Some(err.clone());
                UpdateState::Failed(state.stage())
            }

            (state, event) => {
                return Err(format!("Invalid transition: {:?} -> {:?}", state, event));
            }
        };

        self.state = new_state;
        Ok(())
    }

    /// Whether the current upload stage may be attempted again
    pub fn can_retry(&self, max_attempts: u32) -> bool {
        matches!(
            self.state,
            UpdateState::FirmwareUploading | UpdateState::WwwUploading
        ) && self.attempts < max_attempts
    }
}

impl Default for UpdateFsm {
    fn default() -> Self {
        Self::new()
    }
}
