use anyhow::Result;
use std::env;
use std::path::Path;

use crate::config::Config;

struct CheckResult {
    passed: Vec<String>,
    warnings: Vec<String>,
    errors: Vec<String>,
}

impl CheckResult {
    fn new() -> Self {
        Self {
            passed: Vec::new(),
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn pass(&mut self, msg: impl Into<String>) {
        self.passed.push(msg.into());
    }

    fn warn(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    fn error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }
}

pub fn run(config_path: Option<String>) -> Result<()> {
    let mut results = CheckResult::new();

    // 1. Try to load config
    let config = match Config::load_with_path(config_path.clone()) {
        Ok(config) => {
            let source = config_path.as_deref().unwrap_or("default search path");
            results.pass(format!("Config loaded from {}", source));
            config
        }
        Err(e) => {
            // Diagnostic command: config load failure is reported through
            // print_results, not propagated (which would double-print).
            results.error(format!("Failed to load config: {}", e));
            print_results(&results);
            anyhow::bail!("1 config error(s) found");
        }
    };

    // 2. Recipes root
    let recipes_dir = Path::new(&config.recipes.dir);
    if recipes_dir.is_dir() {
        let count = recipes_dir
            .read_dir()
            .map(|entries| {
                entries
                    .flatten()
                    .filter(|e| e.path().join(&config.recipes.file).is_file())
                    .count()
            })
            .unwrap_or(0);
        results.pass(format!(
            "Recipes dir: {} ({} recipe(s) named {})",
            config.recipes.dir, count, config.recipes.file
        ));
        if count == 0 {
            results.warn(format!(
                "No {} files found under {}",
                config.recipes.file, config.recipes.dir
            ));
        }
    } else {
        results.error(format!(
            "Recipes dir '{}' does not exist",
            config.recipes.dir
        ));
    }

    // 3. API endpoints
    check_url("github.api_base_url", &config.github.api_base_url, &mut results);
    check_url(
        "github.download_base_url",
        &config.github.download_base_url,
        &mut results,
    );

    // 4. API token (optional — absence only lowers rate limits)
    match env::var(&config.github.token_env) {
        Ok(v) if !v.trim().is_empty() => {
            results.pass(format!("API token: {} is set", config.github.token_env));
        }
        _ => {
            results.warn(format!(
                "API token: {} is not set — unauthenticated calls are rate-limited",
                config.github.token_env
            ));
        }
    }

    // 5. Timeout sanity
    if config.github.timeout_secs == 0 {
        results.error("github.timeout_secs is 0 — every request would fail".to_string());
    } else if config.github.timeout_secs < 5 {
        results.warn(format!(
            "github.timeout_secs {}s is very short — archive downloads may not finish",
            config.github.timeout_secs
        ));
    } else {
        results.pass(format!("HTTP timeout: {}s", config.github.timeout_secs));
    }

    print_results(&results);

    if !results.errors.is_empty() {
        anyhow::bail!("{} config error(s) found", results.errors.len());
    }

    Ok(())
}

fn check_url(name: &str, url: &str, results: &mut CheckResult) {
    if url.starts_with("https://") || url.starts_with("http://") {
        results.pass(format!("{}: {}", name, url));
    } else {
        results.error(format!("{} '{}' is not an http(s) URL", name, url));
    }
}

fn print_results(results: &CheckResult) {
    println!();
    for msg in &results.passed {
        println!("  \u{2713} {}", msg);
    }
    for msg in &results.warnings {
        println!("  ! {}", msg);
    }
    for msg in &results.errors {
        println!("  \u{2717} {}", msg);
    }
    println!();
    println!(
        "{} passed, {} warnings, {} errors",
        results.passed.len(),
        results.warnings.len(),
        results.errors.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_result_accumulates() {
        let mut results = CheckResult::new();
        results.pass("ok");
        results.warn("hmm");
        results.error("bad");
        assert_eq!(results.passed.len(), 1);
        assert_eq!(results.warnings.len(), 1);
        assert_eq!(results.errors.len(), 1);
    }

    #[test]
    fn test_check_url_accepts_http_and_https() {
        let mut results = CheckResult::new();
        check_url("a", "https://api.github.com", &mut results);
        check_url("b", "http://localhost:8080", &mut results);
        assert_eq!(results.passed.len(), 2);
        assert!(results.errors.is_empty());
    }

    #[test]
    fn test_check_url_rejects_other_schemes() {
        let mut results = CheckResult::new();
        check_url("a", "ftp://example.org", &mut results);
        check_url("b", "api.github.com", &mut results);
        assert_eq!(results.errors.len(), 2);
    }

    #[test]
    fn test_run_with_missing_explicit_config_fails() {
        let result = run(Some("/nonexistent/skillbump.toml".to_string()));
        assert!(result.is_err());
    }
}
