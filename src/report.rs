//! Results sink for the enclosing automation pipeline.
//!
//! Every resolve emits the old and new comparison keys as `key=value`
//! lines, whether or not anything changed. When the `GITHUB_OUTPUT`
//! environment variable names a file (the CI convention), lines are
//! appended there; otherwise they go to stdout.

use anyhow::{Context, Result};
use std::env;
use std::fs::OpenOptions;
use std::io::Write;
use tracing::debug;

const OUTPUT_ENV: &str = "GITHUB_OUTPUT";

/// Emit the two machine-readable result lines for one resolve.
pub fn emit(old_key: &str, new_key: &str) -> Result<()> {
    let lines = format!("old-version={}\nnew-version={}\n", old_key, new_key);

    match env::var(OUTPUT_ENV) {
        Ok(path) if !path.is_empty() => {
            debug!("Appending results to {}", path);
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("Failed to open results sink {}", path))?;
            file.write_all(lines.as_bytes())
                .with_context(|| format!("Failed to write results sink {}", path))?;
        }
        _ => {
            print!("{}", lines);
        }
    }

    Ok(())
}
