use anyhow::{bail, Context, Result};
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

use crate::version::PackageVersion;

/// GitHub URL prefix recognised when deriving `owner/repo` identifiers.
const GITHUB_PREFIX: &str = "https://github.com/";

/// A package's recipe descriptor, loaded from `recipe.yaml`.
///
/// The descriptor is a plain YAML document; fields are addressed by dotted
/// paths (`source.rev`, `context.version`, ...) and mutated in place. The
/// enclosing version-control system is the source of truth for history, so
/// no backup or journal is kept here.
#[derive(Debug)]
pub struct Recipe {
    path: PathBuf,
    doc: Value,
}

impl Recipe {
    /// Load a recipe descriptor from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("No recipe found at {}", path.display()))?;
        let doc: Value = serde_yaml::from_str(&content)
            .with_context(|| format!("Invalid recipe YAML at {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            doc,
        })
    }

    /// Persist the descriptor back to its original path.
    pub fn save(&self) -> Result<()> {
        let content = serde_yaml::to_string(&self.doc)
            .with_context(|| format!("Failed to serialize recipe for {}", self.path.display()))?;
        fs::write(&self.path, content)
            .with_context(|| format!("Failed to write recipe at {}", self.path.display()))?;
        debug!("Wrote recipe {}", self.path.display());
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read a string field by dotted path. Returns None if any segment is
    /// missing or the leaf is not a scalar string.
    pub fn get(&self, dotted: &str) -> Option<&str> {
        let mut node = &self.doc;
        for segment in dotted.split('.') {
            node = node.get(segment)?;
        }
        node.as_str()
    }

    /// Read a string field, treating an absent field as the empty string.
    /// Stored comparison keys use this: a recipe that has never tracked a
    /// key simply compares unequal to any upstream value.
    pub fn get_or_empty(&self, dotted: &str) -> String {
        self.get(dotted).unwrap_or_default().to_string()
    }

    /// Write a string field by dotted path, creating intermediate mappings
    /// as needed.
    pub fn set(&mut self, dotted: &str, value: &str) -> Result<()> {
        let mut node = &mut self.doc;
        if !node.is_mapping() {
            bail!(
                "Recipe at {} is not a YAML mapping document",
                self.path.display()
            );
        }

        let segments: Vec<&str> = dotted.split('.').collect();
        let (leaf, parents) = segments.split_last().expect("dotted path is never empty");

        for segment in parents {
            let map = node.as_mapping_mut().with_context(|| {
                format!("Field '{}' is not a mapping in {}", segment, self.path.display())
            })?;
            node = map
                .entry(Value::from(*segment))
                .or_insert_with(|| Value::Mapping(Mapping::new()));
        }

        let map = node.as_mapping_mut().with_context(|| {
            format!("Cannot set '{}' in {}: parent is not a mapping", dotted, self.path.display())
        })?;
        map.insert(Value::from(*leaf), Value::from(value));
        Ok(())
    }

    /// The recipe's own `package.version`, parsed as a strict
    /// three-component version.
    pub fn package_version(&self) -> Result<PackageVersion> {
        let raw = self.get("package.version").with_context(|| {
            format!("Recipe at {} has no package.version", self.path.display())
        })?;
        PackageVersion::from_str(raw)
    }

    /// Increment the patch component of `package.version` in place.
    /// Returns the old and new version strings.
    pub fn bump_patch(&mut self) -> Result<(String, String)> {
        let old = self.package_version()?;
        let new = old.bumped_patch();
        self.set("package.version", &new.to_string())?;
        Ok((old.to_string(), new.to_string()))
    }

    /// Derive the `owner/repo` identifier from the recipe's source fields.
    ///
    /// Two URL shapes are recognised: a clone URL in `source.git`
    /// (`https://github.com/owner/repo[.git]`) and an archive URL in
    /// `source.url` (`https://github.com/owner/repo/...`). Anything else is
    /// an unrecoverable configuration error.
    pub fn github_repo(&self) -> Result<String> {
        if let Some(git) = self.get("source.git") {
            if let Some(repo) = repo_from_git_url(git) {
                return Ok(repo);
            }
        }
        if let Some(url) = self.get("source.url") {
            if let Some(repo) = repo_from_archive_url(url) {
                return Ok(repo);
            }
        }
        bail!(
            "Cannot derive a GitHub owner/repo from the source fields of {}",
            self.path.display()
        )
    }

    /// The literal download URL used by the content-hash strategy.
    pub fn source_url(&self) -> Result<&str> {
        self.get("source.url").with_context(|| {
            format!("Recipe at {} has no source.url", self.path.display())
        })
    }
}

fn repo_from_git_url(url: &str) -> Option<String> {
    let rest = url.strip_prefix(GITHUB_PREFIX)?;
    let rest = rest.strip_suffix(".git").unwrap_or(rest);
    let mut segments = rest.split('/').filter(|s| !s.is_empty());
    let owner = segments.next()?;
    let repo = segments.next()?;
    Some(format!("{}/{}", owner, repo))
}

fn repo_from_archive_url(url: &str) -> Option<String> {
    let rest = url.strip_prefix(GITHUB_PREFIX)?;
    let mut segments = rest.split('/').filter(|s| !s.is_empty());
    let owner = segments.next()?;
    let repo = segments.next()?;
    Some(format!("{}/{}", owner, repo))
}
