//! Revision marker persistence
//!
//! The marker is a flat file holding exactly one revision identifier. It is
//! replaced atomically on every scheduled check.

use std::io::ErrorKind;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::errors::FleetError;
use crate::filesys::file::File;
use crate::upstream::tracker::{RevisionMarker, StoredMarker};

/// Marker file store
#[derive(Debug, Clone)]
pub struct MarkerStore {
    file: File,
}

impl MarkerStore {
    pub fn new(file: File) -> Self {
        Self { file }
    }

    pub fn file(&self) -> &File {
        &self.file
    }

    /// Read the marker. Never fails: unreadable storage is `Corrupt`.
    pub async fn load(&self) -> StoredMarker {
        match self.read_marker().await {
            Ok(marker) => {
                debug!(
                    "Last seen revision {} (checked at {:?})",
                    marker.revision, marker.checked_at
                );
                StoredMarker::Present(marker)
            }
            Err(FleetError::IoError(e)) if e.kind() == ErrorKind::NotFound => {
                debug!("No revision marker at {}", self.file.path().display());
                StoredMarker::Missing
            }
            Err(e) => {
                warn!(
                    "Revision marker {} unusable, treating upstream as changed: {}",
                    self.file.path().display(),
                    e
                );
                StoredMarker::Corrupt(e.to_string())
            }
        }
    }

    /// Overwrite the marker with `marker.revision`
    pub async fn save(&self, marker: &RevisionMarker) -> Result<(), FleetError> {
        self.file.write_atomic(marker.revision.as_bytes()).await
    }

    async fn read_marker(&self) -> Result<RevisionMarker, FleetError> {
        let bytes = self.file.read_bytes().await?;
        let text = String::from_utf8(bytes)
            .map_err(|_| FleetError::MarkerCorrupt("not valid UTF-8".to_string()))?;

        let revision = text.trim();
        if revision.is_empty() {
            return Err(FleetError::MarkerCorrupt("empty".to_string()));
        }
        if revision.split_whitespace().nth(1).is_some() {
            return Err(FleetError::MarkerCorrupt(
                "holds more than one value".to_string(),
            ));
        }

        Ok(RevisionMarker {
            revision: revision.to_string(),
            checked_at: self.file.modified().await.map(DateTime::<Utc>::from),
        })
    }
}
