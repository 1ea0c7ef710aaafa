//! Configuration and store factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use labreview_core::catalog::{builtin_catalog, load_catalog, Catalog};
use labreview_core::engine::ReviewEngineConfig;
use labreview_core::traits::ReviewStore;

use crate::file::JsonFileStore;
use crate::memory::MemoryStore;

/// Which backend persists task records and prompts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoreConfig {
    File {
        #[serde(default = "default_data_dir")]
        data_dir: PathBuf,
    },
    Memory,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::File {
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./labreview-data")
}

/// Top-level labreview configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabreviewConfig {
    /// Storage backend.
    #[serde(default)]
    pub store: StoreConfig,
    /// Milliseconds between two scored reports.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    /// Estimated review minutes per report.
    #[serde(default = "default_minutes_per_report")]
    pub minutes_per_report: f64,
    /// Refuse runs over experiments without a prompt.
    #[serde(default = "default_true")]
    pub require_prompts: bool,
    /// Optional catalog file replacing the built-in courses.
    #[serde(default)]
    pub catalog: Option<PathBuf>,
}

fn default_tick_interval() -> u64 {
    500
}
fn default_minutes_per_report() -> f64 {
    0.1
}
fn default_true() -> bool {
    true
}

impl Default for LabreviewConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            tick_interval_ms: default_tick_interval(),
            minutes_per_report: default_minutes_per_report(),
            require_prompts: true,
            catalog: None,
        }
    }
}

impl LabreviewConfig {
    /// Engine settings derived from this configuration.
    pub fn engine_config(&self) -> ReviewEngineConfig {
        ReviewEngineConfig {
            tick_interval: Duration::from_millis(self.tick_interval_ms),
            minutes_per_report: self.minutes_per_report,
            require_prompts: self.require_prompts,
        }
    }

    /// The configured catalog, or the built-in one.
    pub fn load_catalog(&self) -> Result<Catalog> {
        match &self.catalog {
            Some(path) => load_catalog(path),
            None => Ok(builtin_catalog()),
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

fn resolve_path(path: &Path) -> PathBuf {
    PathBuf::from(resolve_env_vars(&path.to_string_lossy()))
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `labreview.toml` in the current directory
/// 2. `~/.config/labreview/config.toml`
///
/// Environment variable overrides: `LABREVIEW_DATA_DIR`, `LABREVIEW_TICK_MS`.
pub fn load_config() -> Result<LabreviewConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<LabreviewConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("labreview.toml");
        if local.exists() {
            Some(local)
        } else if let Some(home) = dirs_path() {
            let global = home.join("config.toml");
            if global.exists() {
                Some(global)
            } else {
                None
            }
        } else {
            None
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            parse_config_str(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => LabreviewConfig::default(),
    };

    // Apply env var overrides
    if let Ok(dir) = std::env::var("LABREVIEW_DATA_DIR") {
        config.store = StoreConfig::File {
            data_dir: PathBuf::from(dir),
        };
    }

    if let Ok(ms) = std::env::var("LABREVIEW_TICK_MS") {
        config.tick_interval_ms = ms
            .trim()
            .parse()
            .with_context(|| format!("invalid LABREVIEW_TICK_MS: {ms}"))?;
    }

    Ok(config)
}

/// Parse a TOML config string and resolve `${VAR}` references in paths.
pub fn parse_config_str(content: &str) -> Result<LabreviewConfig> {
    let mut config: LabreviewConfig = toml::from_str(content)?;
    if let StoreConfig::File { data_dir } = &mut config.store {
        *data_dir = resolve_path(data_dir);
    }
    config.catalog = config.catalog.as_deref().map(resolve_path);
    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("labreview"))
}

/// Create a store instance from its configuration.
pub fn create_store(config: &StoreConfig) -> Arc<dyn ReviewStore> {
    match config {
        StoreConfig::File { data_dir } => Arc::new(JsonFileStore::new(data_dir)),
        StoreConfig::Memory => Arc::new(MemoryStore::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_LABREVIEW_TEST_VAR", "hello");
        assert_eq!(resolve_env_vars("${_LABREVIEW_TEST_VAR}"), "hello");
        assert_eq!(
            resolve_env_vars("prefix_${_LABREVIEW_TEST_VAR}_suffix"),
            "prefix_hello_suffix"
        );
        assert_eq!(resolve_env_vars("unterminated ${"), "unterminated ${");
        std::env::remove_var("_LABREVIEW_TEST_VAR");
    }

    #[test]
    fn default_config() {
        let config = LabreviewConfig::default();
        assert_eq!(config.tick_interval_ms, 500);
        assert!(config.require_prompts);
        assert!(config.catalog.is_none());
        let engine = config.engine_config();
        assert_eq!(engine.tick_interval, Duration::from_millis(500));
        assert!((engine.minutes_per_report - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn parse_store_config() {
        std::env::set_var("_LABREVIEW_TEST_HOME", "/srv/grading");
        let config = parse_config_str(
            r#"
tick_interval_ms = 50
require_prompts = false

[store]
type = "file"
data_dir = "${_LABREVIEW_TEST_HOME}/data"
"#,
        )
        .unwrap();
        std::env::remove_var("_LABREVIEW_TEST_HOME");

        assert_eq!(config.tick_interval_ms, 50);
        assert!(!config.require_prompts);
        assert_eq!(
            config.store,
            StoreConfig::File {
                data_dir: PathBuf::from("/srv/grading/data")
            }
        );
    }

    #[test]
    fn parse_memory_store() {
        let config = parse_config_str("[store]\ntype = \"memory\"\n").unwrap();
        assert_eq!(config.store, StoreConfig::Memory);
        assert_eq!(create_store(&config.store).name(), "memory");
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config_from(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn catalog_falls_back_to_builtin() {
        let config = LabreviewConfig::default();
        assert_eq!(config.load_catalog().unwrap().courses.len(), 4);
    }
}
