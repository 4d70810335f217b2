// Upstream hub: the external collaborators the resolver consults.
//
// The commit-lookup API, release-lookup API, and plain HTTPS fetch are
// opaque services behind this trait; the resolver never cares which
// implementation answers.

pub mod github;

pub use github::GithubHub;

use anyhow::{bail, Result};
use async_trait::async_trait;

#[async_trait]
pub trait UpstreamHub: Send + Sync {
    /// Latest commit sha on the default branch of `owner/repo`.
    async fn latest_commit(&self, repo: &str) -> Result<String>;

    /// Tag name of the latest published release of `owner/repo`.
    async fn latest_release_tag(&self, repo: &str) -> Result<String>;

    /// Fetch the bytes at `url` and return their SHA-256 digest as lowercase hex.
    async fn fetch_sha256(&self, url: &str) -> Result<String>;

    /// Archive URL for a release tag, derived from the download base template.
    fn release_archive_url(&self, repo: &str, tag: &str) -> String;
}

/// Canned in-memory hub for tests. Unset answers fail, which doubles as a
/// "no network call expected" assertion.
#[cfg(test)]
#[derive(Default)]
pub struct MockHub {
    pub commit: Option<String>,
    pub release_tag: Option<String>,
    pub sha256: Option<String>,
}

#[cfg(test)]
impl MockHub {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
#[async_trait]
impl UpstreamHub for MockHub {
    async fn latest_commit(&self, repo: &str) -> Result<String> {
        match &self.commit {
            Some(sha) => Ok(sha.clone()),
            None => bail!("MockHub: no commit configured for {}", repo),
        }
    }

    async fn latest_release_tag(&self, repo: &str) -> Result<String> {
        match &self.release_tag {
            Some(tag) => Ok(tag.clone()),
            None => bail!("MockHub: no release tag configured for {}", repo),
        }
    }

    async fn fetch_sha256(&self, url: &str) -> Result<String> {
        match &self.sha256 {
            Some(digest) => Ok(digest.clone()),
            None => bail!("MockHub: no digest configured for {}", url),
        }
    }

    fn release_archive_url(&self, repo: &str, tag: &str) -> String {
        format!("mock://{}/archive/refs/tags/{}.tar.gz", repo, tag)
    }
}
