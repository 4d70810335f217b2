use anyhow::{bail, Result};
use std::str::FromStr;
use tracing::{debug, info};

use crate::hub::UpstreamHub;
use crate::recipe::Recipe;

/// One of the three fixed update-detection policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Track the latest commit on the default branch (`source.rev`)
    TrackLatestCommit,
    /// Track the latest tagged release (`context.version` + archive sha256)
    TrackLatestRelease,
    /// Track the SHA-256 digest of the bytes at `source.url`
    TrackContentHash,
}

impl Strategy {
    pub fn as_str(&self) -> &str {
        match self {
            Strategy::TrackLatestCommit => "track-latest-commit",
            Strategy::TrackLatestRelease => "track-latest-release",
            Strategy::TrackContentHash => "track-content-hash",
        }
    }
}

impl FromStr for Strategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "track-latest-commit" | "commit" => Ok(Strategy::TrackLatestCommit),
            "track-latest-release" | "release" => Ok(Strategy::TrackLatestRelease),
            "track-content-hash" | "hash" => Ok(Strategy::TrackContentHash),
            _ => bail!(
                "Unknown strategy: {}. Valid options: track-latest-commit, track-latest-release, track-content-hash",
                s
            ),
        }
    }
}

/// The comparison pair for one probe, plus what to write when the keys differ.
pub struct Probe {
    /// Key previously stored in the descriptor (empty string if absent)
    pub stored: String,
    /// Key freshly derived from upstream
    pub upstream: String,
    plan: MutationPlan,
}

/// What a strategy writes into the descriptor on a key mismatch.
enum MutationPlan {
    /// `source.rev` := sha, plus a patch bump
    SetRev { sha: String },
    /// `context.version` := version, `source.sha256` := digest of the
    /// archive at `archive_url` (fetched only when a change is applied)
    SetRelease { version: String, archive_url: String },
    /// `source.sha256` := digest, plus a patch bump
    SetSha256 { digest: String },
}

impl Strategy {
    /// Derive the comparison pair from upstream and the descriptor.
    ///
    /// All three strategies share the same contract: one upstream lookup,
    /// one stored key, one mutation plan. The release strategy re-derives
    /// the archive URL from the tag template; the descriptor's own
    /// `source.url` is never fetched for it.
    pub async fn probe(&self, recipe: &Recipe, hub: &dyn UpstreamHub) -> Result<Probe> {
        match self {
            Strategy::TrackLatestCommit => {
                let repo = recipe.github_repo()?;
                let sha = hub.latest_commit(&repo).await?;
                Ok(Probe {
                    stored: recipe.get_or_empty("source.rev"),
                    upstream: sha.clone(),
                    plan: MutationPlan::SetRev { sha },
                })
            }
            Strategy::TrackLatestRelease => {
                let repo = recipe.github_repo()?;
                let tag = hub.latest_release_tag(&repo).await?;
                let version = tag.strip_prefix('v').unwrap_or(&tag).to_string();
                // Upstream tags are assumed to carry the v prefix; the
                // template keeps it even when the tag name did not.
                let archive_url = hub.release_archive_url(&repo, &format!("v{}", version));
                Ok(Probe {
                    stored: recipe.get_or_empty("context.version"),
                    upstream: version.clone(),
                    plan: MutationPlan::SetRelease {
                        version,
                        archive_url,
                    },
                })
            }
            Strategy::TrackContentHash => {
                let url = recipe.source_url()?.to_string();
                let digest = hub.fetch_sha256(&url).await?;
                Ok(Probe {
                    stored: recipe.get_or_empty("source.sha256"),
                    upstream: digest.clone(),
                    plan: MutationPlan::SetSha256 { digest },
                })
            }
        }
    }
}

/// Result of one resolver run, reported to the caller and the results sink.
#[derive(Debug)]
pub struct Resolution {
    pub old_key: String,
    pub new_key: String,
    pub changed: bool,
}

/// Compare the stored key against upstream and update the descriptor on
/// mismatch. Uniform over all strategies; key comparison is exact byte
/// equality, never a semantic-version ordering.
pub async fn resolve(
    recipe: &mut Recipe,
    strategy: Strategy,
    hub: &dyn UpstreamHub,
    dry_run: bool,
) -> Result<Resolution> {
    let probe = strategy.probe(recipe, hub).await?;
    debug!(
        "{}: stored key '{}', upstream key '{}'",
        strategy.as_str(),
        probe.stored,
        probe.upstream
    );

    if probe.stored == probe.upstream {
        info!("{} is up to date", recipe.path().display());
        return Ok(Resolution {
            old_key: probe.stored,
            new_key: probe.upstream,
            changed: false,
        });
    }

    info!(
        "{}: '{}' -> '{}'",
        strategy.as_str(),
        probe.stored,
        probe.upstream
    );

    if dry_run {
        info!("Dry run: leaving {} untouched", recipe.path().display());
        return Ok(Resolution {
            old_key: probe.stored,
            new_key: probe.upstream,
            changed: false,
        });
    }

    match probe.plan {
        MutationPlan::SetRev { sha } => {
            recipe.set("source.rev", &sha)?;
            let (old, new) = recipe.bump_patch()?;
            info!("Bumped package.version {} -> {}", old, new);
        }
        MutationPlan::SetRelease {
            version,
            archive_url,
        } => {
            let digest = hub.fetch_sha256(&archive_url).await?;
            recipe.set("context.version", &version)?;
            recipe.set("source.sha256", &digest)?;
        }
        MutationPlan::SetSha256 { digest } => {
            recipe.set("source.sha256", &digest)?;
            let (old, new) = recipe.bump_patch()?;
            info!("Bumped package.version {} -> {}", old, new);
        }
    }
    recipe.save()?;

    Ok(Resolution {
        old_key: probe.stored,
        new_key: probe.upstream,
        changed: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::MockHub;
    use std::fs;
    use tempfile::TempDir;

    const SAMPLE: &str = "\
context:
  version: \"2.4.0\"
package:
  name: demo-skill
  version: 1.2.3
source:
  git: https://github.com/acme/demo-skill.git
  rev: abc123
  url: https://github.com/acme/demo-skill/archive/refs/tags/v2.4.0.tar.gz
  sha256: 0f0e0d
";

    fn sample_recipe(tmp: &TempDir) -> Recipe {
        let path = tmp.path().join("recipe.yaml");
        fs::write(&path, SAMPLE).unwrap();
        Recipe::load(&path).unwrap()
    }

    #[test]
    fn test_strategy_from_str_canonical() {
        assert_eq!(
            Strategy::from_str("track-latest-commit").unwrap(),
            Strategy::TrackLatestCommit
        );
        assert_eq!(
            Strategy::from_str("track-latest-release").unwrap(),
            Strategy::TrackLatestRelease
        );
        assert_eq!(
            Strategy::from_str("track-content-hash").unwrap(),
            Strategy::TrackContentHash
        );
    }

    #[test]
    fn test_strategy_from_str_aliases() {
        assert_eq!(
            Strategy::from_str("commit").unwrap(),
            Strategy::TrackLatestCommit
        );
        assert_eq!(
            Strategy::from_str("RELEASE").unwrap(),
            Strategy::TrackLatestRelease
        );
        assert_eq!(
            Strategy::from_str("hash").unwrap(),
            Strategy::TrackContentHash
        );
    }

    #[test]
    fn test_strategy_from_str_invalid() {
        let result = Strategy::from_str("track-the-moon");
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Valid options: track-latest-commit"));
    }

    #[test]
    fn test_as_str_roundtrip() {
        for strategy in &[
            Strategy::TrackLatestCommit,
            Strategy::TrackLatestRelease,
            Strategy::TrackContentHash,
        ] {
            assert_eq!(Strategy::from_str(strategy.as_str()).unwrap(), *strategy);
        }
    }

    #[tokio::test]
    async fn test_commit_strategy_up_to_date() {
        let tmp = TempDir::new().unwrap();
        let mut recipe = sample_recipe(&tmp);
        let hub = MockHub {
            commit: Some("abc123".to_string()),
            ..MockHub::new()
        };

        let res = resolve(&mut recipe, Strategy::TrackLatestCommit, &hub, false)
            .await
            .unwrap();
        assert!(!res.changed);
        assert_eq!(res.old_key, "abc123");
        assert_eq!(res.new_key, "abc123");
        // No mutation on disk
        let reloaded = Recipe::load(recipe.path()).unwrap();
        assert_eq!(reloaded.get("package.version"), Some("1.2.3"));
    }

    #[tokio::test]
    async fn test_commit_strategy_updates_rev_and_bumps_patch() {
        let tmp = TempDir::new().unwrap();
        let mut recipe = sample_recipe(&tmp);
        let hub = MockHub {
            commit: Some("def456".to_string()),
            ..MockHub::new()
        };

        let res = resolve(&mut recipe, Strategy::TrackLatestCommit, &hub, false)
            .await
            .unwrap();
        assert!(res.changed);
        assert_eq!(res.old_key, "abc123");
        assert_eq!(res.new_key, "def456");

        let reloaded = Recipe::load(recipe.path()).unwrap();
        assert_eq!(reloaded.get("source.rev"), Some("def456"));
        assert_eq!(reloaded.get("package.version"), Some("1.2.4"));
        // Other fields untouched
        assert_eq!(reloaded.get("context.version"), Some("2.4.0"));
        assert_eq!(reloaded.get("source.sha256"), Some("0f0e0d"));
    }

    #[tokio::test]
    async fn test_release_strategy_updates_context_version_and_sha() {
        let tmp = TempDir::new().unwrap();
        let mut recipe = sample_recipe(&tmp);
        let hub = MockHub {
            release_tag: Some("v2.5.0".to_string()),
            sha256: Some("bb".repeat(32)),
            ..MockHub::new()
        };

        let res = resolve(&mut recipe, Strategy::TrackLatestRelease, &hub, false)
            .await
            .unwrap();
        assert!(res.changed);
        assert_eq!(res.old_key, "2.4.0");
        assert_eq!(res.new_key, "2.5.0");

        let reloaded = Recipe::load(recipe.path()).unwrap();
        assert_eq!(reloaded.get("context.version"), Some("2.5.0"));
        assert_eq!(reloaded.get("source.sha256"), Some("bb".repeat(32).as_str()));
        // Release tracking does not touch the package's own version
        assert_eq!(reloaded.get("package.version"), Some("1.2.3"));
        assert_eq!(reloaded.get("source.rev"), Some("abc123"));
    }

    #[tokio::test]
    async fn test_release_strategy_tag_without_v_prefix() {
        let tmp = TempDir::new().unwrap();
        let mut recipe = sample_recipe(&tmp);
        let hub = MockHub {
            release_tag: Some("2.5.0".to_string()),
            sha256: Some("cc".repeat(32)),
            ..MockHub::new()
        };

        let res = resolve(&mut recipe, Strategy::TrackLatestRelease, &hub, false)
            .await
            .unwrap();
        assert_eq!(res.new_key, "2.5.0");
    }

    #[tokio::test]
    async fn test_hash_strategy_updates_sha_and_bumps_patch() {
        let tmp = TempDir::new().unwrap();
        let mut recipe = sample_recipe(&tmp);
        let hub = MockHub {
            sha256: Some("dd".repeat(32)),
            ..MockHub::new()
        };

        let res = resolve(&mut recipe, Strategy::TrackContentHash, &hub, false)
            .await
            .unwrap();
        assert!(res.changed);
        assert_eq!(res.old_key, "0f0e0d");
        assert_eq!(res.new_key, "dd".repeat(32));

        let reloaded = Recipe::load(recipe.path()).unwrap();
        assert_eq!(reloaded.get("source.sha256"), Some("dd".repeat(32).as_str()));
        assert_eq!(reloaded.get("package.version"), Some("1.2.4"));
    }

    #[tokio::test]
    async fn test_hash_strategy_up_to_date() {
        let tmp = TempDir::new().unwrap();
        let mut recipe = sample_recipe(&tmp);
        let hub = MockHub {
            sha256: Some("0f0e0d".to_string()),
            ..MockHub::new()
        };

        let res = resolve(&mut recipe, Strategy::TrackContentHash, &hub, false)
            .await
            .unwrap();
        assert!(!res.changed);
    }

    #[tokio::test]
    async fn test_dry_run_reports_but_never_writes() {
        let tmp = TempDir::new().unwrap();
        let mut recipe = sample_recipe(&tmp);
        let hub = MockHub {
            commit: Some("def456".to_string()),
            ..MockHub::new()
        };

        let res = resolve(&mut recipe, Strategy::TrackLatestCommit, &hub, true)
            .await
            .unwrap();
        assert!(!res.changed);
        assert_eq!(res.old_key, "abc123");
        assert_eq!(res.new_key, "def456");

        let reloaded = Recipe::load(recipe.path()).unwrap();
        assert_eq!(reloaded.get("source.rev"), Some("abc123"));
        assert_eq!(reloaded.get("package.version"), Some("1.2.3"));
    }

    #[tokio::test]
    async fn test_missing_stored_key_reads_as_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("recipe.yaml");
        fs::write(
            &path,
            "package:\n  name: fresh\n  version: 0.1.0\nsource:\n  git: https://github.com/acme/fresh.git\n",
        )
        .unwrap();
        let mut recipe = Recipe::load(&path).unwrap();
        let hub = MockHub {
            commit: Some("def456".to_string()),
            ..MockHub::new()
        };

        let res = resolve(&mut recipe, Strategy::TrackLatestCommit, &hub, false)
            .await
            .unwrap();
        assert!(res.changed);
        assert_eq!(res.old_key, "");
        assert_eq!(res.new_key, "def456");

        let reloaded = Recipe::load(&path).unwrap();
        assert_eq!(reloaded.get("source.rev"), Some("def456"));
        assert_eq!(reloaded.get("package.version"), Some("0.1.1"));
    }

    #[tokio::test]
    async fn test_malformed_source_url_is_fatal_without_mutation() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("recipe.yaml");
        let original = "package:\n  name: odd\n  version: 1.0.0\nsource:\n  git: ssh://git.example.org/odd.git\n  rev: abc123\n";
        fs::write(&path, original).unwrap();
        let mut recipe = Recipe::load(&path).unwrap();
        let hub = MockHub {
            commit: Some("def456".to_string()),
            ..MockHub::new()
        };

        let result = resolve(&mut recipe, Strategy::TrackLatestCommit, &hub, false).await;
        assert!(result.is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), original);
    }

    #[tokio::test]
    async fn test_upstream_failure_propagates_without_mutation() {
        let tmp = TempDir::new().unwrap();
        let mut recipe = sample_recipe(&tmp);
        let hub = MockHub::new(); // no answers configured

        let result = resolve(&mut recipe, Strategy::TrackLatestCommit, &hub, false).await;
        assert!(result.is_err());

        let reloaded = Recipe::load(recipe.path()).unwrap();
        assert_eq!(reloaded.get("source.rev"), Some("abc123"));
    }

    #[tokio::test]
    async fn test_release_archive_fetch_failure_aborts_before_write() {
        let tmp = TempDir::new().unwrap();
        let mut recipe = sample_recipe(&tmp);
        // Tag resolves but the archive digest does not
        let hub = MockHub {
            release_tag: Some("v9.9.9".to_string()),
            ..MockHub::new()
        };

        let result = resolve(&mut recipe, Strategy::TrackLatestRelease, &hub, false).await;
        assert!(result.is_err());

        let reloaded = Recipe::load(recipe.path()).unwrap();
        assert_eq!(reloaded.get("context.version"), Some("2.4.0"));
        assert_eq!(reloaded.get("source.sha256"), Some("0f0e0d"));
    }
}
