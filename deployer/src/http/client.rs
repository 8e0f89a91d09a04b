//! HTTP client implementation

use std::time::Duration;

use bytes::Bytes;
use reqwest::{header, Client};
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use crate::errors::{FleetError, UpdateError};

const USER_AGENT: &str = concat!("fwfleet/", env!("CARGO_PKG_VERSION"));

/// Thin wrapper over a shared reqwest client.
///
/// Per-request timeouts are set by the caller; the client only bounds the
/// connect phase.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new(connect_timeout: Duration) -> Result<Self, FleetError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(connect_timeout)
            .build()?;

        Ok(Self { client })
    }

    /// Make a GET request and decode a JSON body
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        token: Option<&str>,
        timeout: Duration,
    ) -> Result<T, FleetError> {
        debug!("GET {}", url);

        let mut request = self
            .client
            .get(url)
            .header(header::ACCEPT, "application/vnd.github+json")
            .timeout(timeout);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("HTTP GET failed: {} - {}", status, body);
            return Err(FleetError::Upstream(format!("{}: {}", status, body)));
        }

        let body = response.json().await?;
        Ok(body)
    }

    /// POST a raw binary body, the way the device web UI uploads images.
    ///
    /// `origin` is echoed in `Origin` and `Referer`; device web servers
    /// reject uploads without them.
    pub async fn post_octets(
        &self,
        url: &str,
        origin: &str,
        body: Bytes,
        timeout: Duration,
    ) -> Result<(), UpdateError> {
        debug!("POST {} ({} bytes)", url, body.len());

        let response = self
            .client
            .post(url)
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .header(header::ACCEPT, "application/json, text/plain, */*")
            .header(header::ORIGIN, origin)
            .header(header::REFERER, format!("{}/", origin))
            .body(body)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| UpdateError::from_transport(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpdateError::DeviceRejected {
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }

        Ok(())
    }

    /// GET `url` and report whether it answered with a success status
    pub async fn is_reachable(&self, url: &str, timeout: Duration) -> bool {
        match self.client.get(url).timeout(timeout).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("GET {} failed: {}", url, e);
                false
            }
        }
    }
}
