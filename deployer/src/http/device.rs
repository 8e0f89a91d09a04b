//! Device update API over HTTP

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::deploy::transport::{DeviceTransport, Partition};
use crate::errors::UpdateError;
use crate::http::client::HttpClient;
use crate::models::target::DeviceTarget;
use crate::storage::settings::DeviceApiSettings;

/// Talks to the device's own web server
pub struct HttpDeviceTransport {
    client: HttpClient,
    api: DeviceApiSettings,
}

impl HttpDeviceTransport {
    pub fn new(client: HttpClient, api: DeviceApiSettings) -> Self {
        Self { client, api }
    }

    fn endpoint(&self, target: &DeviceTarget, path: &str) -> String {
        format!("{}{}", target.base_url(self.api.port), path)
    }
}

#[async_trait]
impl DeviceTransport for HttpDeviceTransport {
    async fn upload(
        &self,
        target: &DeviceTarget,
        partition: Partition,
        image: Bytes,
        timeout: Duration,
    ) -> Result<(), UpdateError> {
        let path = match partition {
            Partition::Firmware => &self.api.firmware_path,
            Partition::Www => &self.api.www_path,
        };
        let origin = target.base_url(self.api.port);
        self.client
            .post_octets(&self.endpoint(target, path), &origin, image, timeout)
            .await
    }

    async fn probe(&self, target: &DeviceTarget, timeout: Duration) -> bool {
        self.client
            .is_reachable(&self.endpoint(target, &self.api.info_path), timeout)
            .await
    }
}
