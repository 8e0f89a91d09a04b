//! Build artifacts shared by every device task

use std::path::Path;

use bytes::Bytes;
use tracing::info;

use crate::errors::FleetError;
use crate::filesys::file::File;
use crate::utils::sha256_hash;

/// Firmware and web-asset images, loaded once.
///
/// Cloning is cheap; every clone shares the same buffers.
#[derive(Debug, Clone)]
pub struct FirmwareImages {
    pub firmware: Bytes,
    pub www: Bytes,
}

impl FirmwareImages {
    pub fn new(firmware: impl Into<Bytes>, www: impl Into<Bytes>) -> Self {
        Self {
            firmware: firmware.into(),
            www: www.into(),
        }
    }

    /// Load both artifacts, failing before any device is touched
    pub async fn load(firmware_path: &Path, www_path: &Path) -> Result<Self, FleetError> {
        let firmware = load_artifact("Firmware", firmware_path).await?;
        let www = load_artifact("WWW", www_path).await?;
        Ok(Self::new(firmware, www))
    }
}

async fn load_artifact(label: &str, path: &Path) -> Result<Vec<u8>, FleetError> {
    let file = File::new(path);
    if !file.exists().await {
        return Err(FleetError::ArtifactMissing(format!(
            "{} file not found at {}",
            label,
            path.display()
        )));
    }

    let contents = file.read_bytes().await?;
    if contents.is_empty() {
        return Err(FleetError::ArtifactMissing(format!(
            "{} file at {} is empty",
            label,
            path.display()
        )));
    }

    info!(
        "{} image: {} ({} bytes, sha256 {})",
        label,
        path.display(),
        contents.len(),
        sha256_hash(&contents)
    );
    Ok(contents)
}
