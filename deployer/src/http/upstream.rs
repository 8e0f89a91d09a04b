//! Upstream head revision lookup

use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use crate::errors::FleetError;
use crate::http::client::HttpClient;
use crate::storage::settings::UpstreamSettings;

#[derive(Debug, Deserialize)]
struct CommitResponse {
    sha: String,
}

/// Fetch the head commit of the tracked branch from the GitHub commits API
pub async fn fetch_head_revision(
    client: &HttpClient,
    upstream: &UpstreamSettings,
    token: Option<&str>,
) -> Result<String, FleetError> {
    let url = format!(
        "{}/repos/{}/commits/{}",
        upstream.api_base.trim_end_matches('/'),
        upstream.repo,
        upstream.branch
    );

    let commit: CommitResponse = client
        .get_json(&url, token, Duration::from_secs(upstream.timeout_secs))
        .await?;

    let sha = commit.sha.trim().to_string();
    if sha.is_empty() {
        return Err(FleetError::Upstream(format!(
            "{} returned an empty revision",
            url
        )));
    }

    info!("Upstream {}@{} is at {}", upstream.repo, upstream.branch, sha);
    Ok(sha)
}
