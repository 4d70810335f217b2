use anyhow::{Context, Result};
use glob::glob;
use std::path::Path;
use tracing::info;

use crate::config::Config;

/// Print the packages that carry a recipe descriptor, one per line.
pub fn run(config_path: Option<String>, recipes_dir: Option<String>) -> Result<()> {
    let mut config = Config::load_with_path(config_path)?;
    if let Some(dir) = recipes_dir {
        config.recipes.dir = dir;
    }

    let packages = find_packages(&config)?;
    info!(
        "{} recipe(s) under {}",
        packages.len(),
        config.recipes.dir
    );

    for package in &packages {
        println!("{}", package);
    }

    Ok(())
}

fn find_packages(config: &Config) -> Result<Vec<String>> {
    let pattern = format!("{}/*/{}", config.recipes.dir, config.recipes.file);
    let mut packages: Vec<String> = glob(&pattern)
        .context("Invalid recipes glob pattern")?
        .filter_map(|entry| entry.ok())
        .filter_map(|path| {
            path.parent()
                .and_then(Path::file_name)
                .and_then(|n| n.to_str())
                .map(|n| n.to_string())
        })
        .collect();
    packages.sort();
    Ok(packages)
}
