//! Upstream change detection

pub mod tracker;

/// What started this invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Periodic run; only proceeds when upstream moved
    Schedule,

    Push,

    Manual,
}

impl Trigger {
    /// Map a CI event name (`GITHUB_EVENT_NAME` values included)
    pub fn from_event_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "schedule" | "scheduled" | "cron" => Trigger::Schedule,
            "push" => Trigger::Push,
            _ => Trigger::Manual,
        }
    }

    /// Whether the revision tracker decides if this run deploys
    pub fn gated_by_upstream(&self) -> bool {
        *self == Trigger::Schedule
    }
}
