use anyhow::{bail, Result};
use std::fmt;
use std::str::FromStr;

/// A three-component `major.minor.patch` package version.
///
/// Recipe descriptors always carry exactly three numeric components; the
/// resolver only ever increments the patch component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackageVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl PackageVersion {
    /// Return the same version with the patch component incremented by 1.
    pub fn bumped_patch(&self) -> Self {
        Self {
            major: self.major,
            minor: self.minor,
            patch: self.patch + 1,
        }
    }
}

impl FromStr for PackageVersion {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 3 {
            bail!(
                "Invalid package version '{}': expected exactly three dotted components",
                s
            );
        }

        let parse = |part: &str| -> Result<u64> {
            if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
                bail!("Invalid package version '{}': non-numeric component", s);
            }
            Ok(part.parse()?)
        };

        Ok(Self {
            major: parse(parts[0])?,
            minor: parse(parts[1])?,
            patch: parse(parts[2])?,
        })
    }
}

impl fmt::Display for PackageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}
