use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub recipes: RecipesConfig,
    #[serde(default)]
    pub github: GithubConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipesConfig {
    /// Root directory holding one subdirectory per package
    #[serde(default = "default_recipes_dir")]
    pub dir: String,

    /// Descriptor filename inside each package directory
    #[serde(default = "default_recipe_file")]
    pub file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    /// REST API base. Overridable for GitHub Enterprise and for tests.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Base for release archive downloads
    /// (`<base>/<owner/repo>/archive/refs/tags/v<version>.tar.gz`)
    #[serde(default = "default_download_base_url")]
    pub download_base_url: String,

    /// Environment variable holding an optional API token.
    /// Unauthenticated calls work too, with lower rate limits.
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// HTTP client timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for RecipesConfig {
    fn default() -> Self {
        Self {
            dir: default_recipes_dir(),
            file: default_recipe_file(),
        }
    }
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            download_base_url: default_download_base_url(),
            token_env: default_token_env(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_recipes_dir() -> String {
    "recipes".to_string()
}

fn default_recipe_file() -> String {
    "recipe.yaml".to_string()
}

fn default_api_base_url() -> String {
    "https://api.github.com".to_string()
}

fn default_download_base_url() -> String {
    "https://github.com".to_string()
}

fn default_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Config {
    /// Load config from repo root or user config directory
    #[allow(dead_code)]
    pub fn load() -> Result<Self> {
        Self::load_with_path(None)
    }

    /// Load configuration from a specific path, or use default search paths
    pub fn load_with_path(path: Option<String>) -> Result<Self> {
        // If explicit path provided, use it
        if let Some(config_path) = path {
            debug!("Loading config from explicit path: {}", config_path);
            return Self::load_from_path(&config_path);
        }

        // Try repo root first (per-repo config)
        if let Ok(config) = Self::load_from_path("skillbump.toml") {
            debug!("Loaded config from ./skillbump.toml");
            return Ok(config);
        }

        // Try user config directory
        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("skillbump").join("config.toml");
            if let Ok(config) = Self::load_from_path(&config_path) {
                debug!("Loaded config from {:?}", config_path);
                return Ok(config);
            }
        }

        // Return defaults
        debug!("Using default config");
        Ok(Self::default())
    }

    fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Path of the recipe descriptor for one package
    pub fn recipe_path(&self, package: &str) -> PathBuf {
        Path::new(&self.recipes.dir)
            .join(package)
            .join(&self.recipes.file)
    }

    /// Optional API token from the configured environment variable.
    /// Absence is not an error.
    pub fn github_token(&self) -> Option<String> {
        env::var(&self.github.token_env)
            .ok()
            .filter(|t| !t.is_empty())
    }
}
