//! Upstream revision tracking
//!
//! The comparison is pure: the stored marker goes in, the verdict and the
//! marker to persist come out. Reading and writing the marker file lives in
//! `storage::marker`.

use chrono::{DateTime, Utc};

/// Last seen upstream revision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionMarker {
    pub revision: String,

    /// When the revision was last checked, if known
    pub checked_at: Option<DateTime<Utc>>,
}

impl RevisionMarker {
    pub fn new(revision: impl Into<String>) -> Self {
        Self {
            revision: revision.into(),
            checked_at: Some(Utc::now()),
        }
    }
}

/// What marker storage held at the start of a check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredMarker {
    /// First run, or storage not retained
    Missing,

    /// Storage unreadable or malformed
    Corrupt(String),

    Present(RevisionMarker),
}

/// Verdict of one check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionCheck {
    /// A deployment cycle should run
    pub changed: bool,

    /// Marker to persist, always the current revision
    pub marker: RevisionMarker,
}

/// Compares the stored marker against the current upstream revision
#[derive(Debug, Default, Clone, Copy)]
pub struct RevisionTracker;

impl RevisionTracker {
    /// Anything but an intact, equal marker counts as changed; a redundant
    /// rebuild is cheaper than a missed one.
    pub fn check(previous: &StoredMarker, current: &str) -> RevisionCheck {
        let current = current.trim();
        let changed = match previous {
            StoredMarker::Present(marker) => marker.revision != current,
            StoredMarker::Missing | StoredMarker::Corrupt(_) => true,
        };

        RevisionCheck {
            changed,
            marker: RevisionMarker::new(current),
        }
    }
}
