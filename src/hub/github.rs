use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::debug;

use super::UpstreamHub;
use crate::config::GithubConfig;
use crate::util::SecretString;

/// GitHub-backed hub. One instance per invocation; all calls are one-shot
/// with the client's timeout as the only failure-handling policy.
pub struct GithubHub {
    api_base_url: String,
    download_base_url: String,
    token: Option<SecretString>,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct ReleaseResponse {
    tag_name: String,
}

impl GithubHub {
    pub fn new(config: &GithubConfig, token: Option<String>) -> Result<Self> {
        Ok(Self {
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            download_base_url: config.download_base_url.trim_end_matches('/').to_string(),
            token: token.map(SecretString::from),
            client: Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .user_agent(concat!("skillbump/", env!("CARGO_PKG_VERSION")))
                .build()
                .context("failed to build HTTP client")?,
        })
    }

    async fn get_api(&self, url: &str) -> Result<reqwest::Response> {
        let mut req = self
            .client
            .get(url)
            .header("accept", "application/vnd.github+json");

        if let Some(ref token) = self.token {
            req = req.header("authorization", format!("Bearer {}", token.expose()));
        }

        let response = req
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", url))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            bail!("GitHub API error {}: {}", status, error_text);
        }

        Ok(response)
    }
}

#[async_trait]
impl UpstreamHub for GithubHub {
    async fn latest_commit(&self, repo: &str) -> Result<String> {
        let url = format!("{}/repos/{}/commits/HEAD", self.api_base_url, repo);
        debug!("Fetching latest commit for {}", repo);

        let commit: CommitResponse = self
            .get_api(&url)
            .await?
            .json()
            .await
            .context("Failed to parse commit response")?;

        Ok(commit.sha)
    }

    async fn latest_release_tag(&self, repo: &str) -> Result<String> {
        let url = format!("{}/repos/{}/releases/latest", self.api_base_url, repo);
        debug!("Fetching latest release for {}", repo);

        let release: ReleaseResponse = self
            .get_api(&url)
            .await?
            .json()
            .await
            .context("Failed to parse release response")?;

        Ok(release.tag_name)
    }

    async fn fetch_sha256(&self, url: &str) -> Result<String> {
        debug!("Fetching {} for digest", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", url))?;

        if !response.status().is_success() {
            bail!("Fetch of {} failed with status {}", url, response.status());
        }

        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("Failed to read body of {}", url))?;

        Ok(hex_digest(&bytes))
    }

    fn release_archive_url(&self, repo: &str, tag: &str) -> String {
        format!(
            "{}/{}/archive/refs/tags/{}.tar.gz",
            self.download_base_url, repo, tag
        )
    }
}

fn hex_digest(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}
