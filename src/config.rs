use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::catalog;
use crate::loader::{self, LoaderSettings};
use crate::logging;
use crate::theme::KNOWN_CATEGORIES;

const DEFAULT_ENV_PREFIX: &str = "DEX";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub ui: UIConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            timeout: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    catalog::POKEAPI_BASE.to_string()
}

fn default_user_agent() -> String {
    format!("dex-tui/{}", crate::VERSION)
}

fn default_timeout() -> Duration {
    catalog::DEFAULT_TIMEOUT
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_category_window")]
    pub category_window: usize,
    #[serde(default = "default_fetch_categories")]
    pub fetch_categories: bool,
    #[serde(default = "default_categories")]
    pub categories: Vec<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            category_window: default_category_window(),
            fetch_categories: default_fetch_categories(),
            categories: default_categories(),
        }
    }
}

impl CatalogConfig {
    pub fn loader_settings(&self) -> LoaderSettings {
        LoaderSettings {
            page_size: self.page_size,
            category_window: self.category_window,
        }
    }
}

fn default_page_size() -> usize {
    loader::DEFAULT_PAGE_SIZE
}

fn default_category_window() -> usize {
    loader::DEFAULT_CATEGORY_WINDOW
}

fn default_fetch_categories() -> bool {
    true
}

fn default_categories() -> Vec<String> {
    KNOWN_CATEGORIES.iter().map(|c| c.to_string()).collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UIConfig {
    #[serde(default = "default_theme")]
    pub theme: String,
}

impl Default for UIConfig {
    fn default() -> Self {
        Self {
            theme: default_theme(),
        }
    }
}

fn default_theme() -> String {
    "dark".into()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default)]
    pub directory: Option<PathBuf>,
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: None,
            filter: default_log_filter(),
        }
    }
}

fn default_log_filter() -> String {
    logging::DEFAULT_FILTER.to_string()
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub env_prefix: Option<String>,
}

pub fn load(options: LoadOptions) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(path) = options.config_file.as_ref() {
        if !path.exists() {
            bail!("config file {} not found", path.display());
        }
        let from_file = read_config_file(path)?;
        cfg = merge_config(cfg, from_file);
    } else if let Some(default_path) = default_config_path() {
        if default_path.exists() {
            let from_file = read_config_file(&default_path)?;
            cfg = merge_config(cfg, from_file);
        }
    }

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    let defaults = Config::default();
    for (key, value) in env_overrides(prefix) {
        apply_env_value(&mut cfg, &defaults, &key, value);
    }

    Ok(cfg)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&data)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
    Ok(config)
}

fn merge_config(mut base: Config, other: Config) -> Config {
    if !other.api.base_url.trim().is_empty() {
        base.api.base_url = other.api.base_url;
    }
    if !other.api.user_agent.trim().is_empty() {
        base.api.user_agent = other.api.user_agent;
    }
    if !other.api.timeout.is_zero() {
        base.api.timeout = other.api.timeout;
    }

    if other.catalog.page_size != 0 {
        base.catalog.page_size = other.catalog.page_size;
    }
    if other.catalog.category_window != 0 {
        base.catalog.category_window = other.catalog.category_window;
    }
    base.catalog.fetch_categories = other.catalog.fetch_categories;
    if !other.catalog.categories.is_empty() {
        base.catalog.categories = other.catalog.categories;
    }

    if !other.ui.theme.is_empty() {
        base.ui.theme = other.ui.theme;
    }

    if other.logging.directory.is_some() {
        base.logging.directory = other.logging.directory;
    }
    if !other.logging.filter.trim().is_empty() {
        base.logging.filter = other.logging.filter;
    }

    base
}

fn env_overrides(prefix: &str) -> HashMap<String, String> {
    let mut map: HashMap<String, String> = HashMap::new();
    let upper_prefix = format!("{}_", prefix.to_uppercase());

    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(&upper_prefix) {
            let normalized = stripped.to_ascii_lowercase().replace("__", ".");
            map.insert(normalized, value);
        }
    }
    map
}

fn apply_env_value(cfg: &mut Config, defaults: &Config, key: &str, value: String) {
    match key {
        "api.base_url" => cfg.api.base_url = value,
        "api.user_agent" => cfg.api.user_agent = value,
        "api.timeout" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.api.timeout = duration;
            }
        }
        "catalog.page_size" => {
            if let Ok(parsed) = value.parse::<usize>() {
                cfg.catalog.page_size = if parsed == 0 {
                    defaults.catalog.page_size
                } else {
                    parsed
                };
            }
        }
        "catalog.category_window" => {
            if let Ok(parsed) = value.parse::<usize>() {
                cfg.catalog.category_window = if parsed == 0 {
                    defaults.catalog.category_window
                } else {
                    parsed
                };
            }
        }
        "catalog.fetch_categories" => {
            cfg.catalog.fetch_categories =
                matches!(value.as_str(), "1" | "true" | "TRUE" | "True");
        }
        "catalog.categories" => {
            cfg.catalog.categories = value
                .split(',')
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect();
        }
        "ui.theme" => cfg.ui.theme = value,
        "logging.directory" => {
            cfg.logging.directory = (!value.trim().is_empty()).then(|| PathBuf::from(value));
        }
        "logging.filter" => {
            if !value.trim().is_empty() {
                cfg.logging.filter = value;
            }
        }
        _ => {}
    }
}

pub fn default_path() -> Option<PathBuf> {
    default_config_path()
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("dex-tui").join("config.yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::{tempdir, TempDir};

    fn isolated(prefix: &str, file: PathBuf) -> LoadOptions {
        LoadOptions {
            config_file: Some(file),
            env_prefix: Some(prefix.to_string()),
        }
    }

    fn empty_config(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("empty.yaml");
        fs::write(&path, "{}\n").unwrap();
        path
    }

    #[test]
    fn load_defaults_from_empty_file() {
        let dir = tempdir().unwrap();
        let cfg = load(isolated("DEXTEST_DEFAULTS", empty_config(&dir))).unwrap();
        assert_eq!(cfg.ui.theme, "dark");
        assert_eq!(cfg.api.base_url, catalog::POKEAPI_BASE);
        assert_eq!(cfg.catalog.page_size, 20);
        assert_eq!(cfg.catalog.category_window, 200);
        assert_eq!(cfg.catalog.categories.len(), KNOWN_CATEGORIES.len());
        assert!(cfg.api.user_agent.starts_with("dex-tui/"));
        assert_eq!(cfg.logging, LoggingConfig::default());
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = load(isolated(
            "DEXTEST_MISSING",
            PathBuf::from("/nonexistent/dex-tui/typo.yaml"),
        ))
        .unwrap_err();
        assert!(
            err.to_string().contains("/nonexistent/dex-tui/typo.yaml"),
            "got {err:#}"
        );
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "api:\n  base_url: http://localhost:8080/api/v2\n  timeout: 5s\ncatalog:\n  page_size: 12\n  fetch_categories: false\nui:\n  theme: light\nlogging:\n  directory: /tmp/dex-logs\n",
        )
        .unwrap();
        let cfg = load(isolated("DEXTEST_FILE", path)).unwrap();
        assert_eq!(cfg.api.base_url, "http://localhost:8080/api/v2");
        assert_eq!(cfg.api.timeout, Duration::from_secs(5));
        assert_eq!(cfg.catalog.page_size, 12);
        assert_eq!(cfg.catalog.category_window, 200);
        assert!(!cfg.catalog.fetch_categories);
        assert_eq!(cfg.ui.theme, "light");
        assert_eq!(cfg.logging.directory, Some(PathBuf::from("/tmp/dex-logs")));
        assert_eq!(cfg.logging.filter, logging::DEFAULT_FILTER);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "catalog: [not, a, map").unwrap();
        let err = load(isolated("DEXTEST_BROKEN", path)).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse config file"));
    }

    #[test]
    fn env_overrides() {
        env::set_var("DEXTEST_ENV_UI__THEME", "light");
        env::set_var("DEXTEST_ENV_CATALOG__PAGE_SIZE", "40");
        env::set_var("DEXTEST_ENV_CATALOG__CATEGORIES", "Fire, water,,");
        env::set_var("DEXTEST_ENV_LOGGING__FILTER", "dex_tui=debug");
        let dir = tempdir().unwrap();
        let cfg = load(isolated("DEXTEST_ENV", empty_config(&dir))).unwrap();
        assert_eq!(cfg.ui.theme, "light");
        assert_eq!(cfg.catalog.page_size, 40);
        assert_eq!(cfg.catalog.categories, vec!["fire", "water"]);
        assert_eq!(cfg.logging.filter, "dex_tui=debug");
        env::remove_var("DEXTEST_ENV_UI__THEME");
        env::remove_var("DEXTEST_ENV_LOGGING__FILTER");
        env::remove_var("DEXTEST_ENV_CATALOG__PAGE_SIZE");
        env::remove_var("DEXTEST_ENV_CATALOG__CATEGORIES");
    }

    #[test]
    fn loader_settings_follow_catalog_section() {
        let cfg = CatalogConfig {
            page_size: 9,
            category_window: 90,
            ..Default::default()
        };
        let settings = cfg.loader_settings();
        assert_eq!(settings.page_size, 9);
        assert_eq!(settings.category_window, 90);
    }
}
