use anyhow::Result;
use std::str::FromStr;
use tracing::info;

use crate::config::Config;
use crate::hub::GithubHub;
use crate::recipe::Recipe;
use crate::report;
use crate::resolver::{self, Strategy};

pub async fn run(
    package: String,
    strategy: String,
    config_path: Option<String>,
    recipes_dir: Option<String>,
    dry_run: bool,
) -> Result<()> {
    // Validate the strategy before touching the filesystem or the network;
    // an unknown name must not trigger either.
    let strategy = Strategy::from_str(&strategy)?;

    let mut config = Config::load_with_path(config_path)?;
    if let Some(dir) = recipes_dir {
        config.recipes.dir = dir;
    }

    let recipe_path = config.recipe_path(&package);
    info!(
        "Resolving {} with {} ({})",
        package,
        strategy.as_str(),
        recipe_path.display()
    );

    let mut recipe = Recipe::load(&recipe_path)?;
    let hub = GithubHub::new(&config.github, config.github_token())?;

    let resolution = resolver::resolve(&mut recipe, strategy, &hub, dry_run).await?;
    report::emit(&resolution.old_key, &resolution.new_key)?;

    if resolution.changed {
        info!(
            "Updated {}: '{}' -> '{}'",
            package, resolution.old_key, resolution.new_key
        );
    } else {
        info!("{} is up to date", package);
    }

    Ok(())
}
