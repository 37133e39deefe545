use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::{Path, PathBuf};

use super::{
    types::{Config, RulesConfig},
    ConfigError,
};

const CONFIG_PATH_ENV: &str = "AUTOSTRM_CONFIG";
const RULES_PATH_ENV: &str = "AUTOSTRM_RULES";
const OUTPUT_DIR_ENV: &str = "AUTOSTRM_OUTPUT_DIR";

/// File locations for one process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    pub config: PathBuf,
    pub rules: PathBuf,
    pub base_output_dir: PathBuf,
}

impl Default for ConfigPaths {
    fn default() -> Self {
        Self {
            config: PathBuf::from("/auto-strm/config/config.toml"),
            rules: PathBuf::from("/auto-strm/config/rules.toml"),
            base_output_dir: PathBuf::from("/auto-strm/strm/"),
        }
    }
}

impl ConfigPaths {
    /// Defaults overridden by `AUTOSTRM_CONFIG`, `AUTOSTRM_RULES` and
    /// `AUTOSTRM_OUTPUT_DIR`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let var = |key: &str, fallback: PathBuf| {
            std::env::var(key).map(PathBuf::from).unwrap_or(fallback)
        };
        Self {
            config: var(CONFIG_PATH_ENV, defaults.config),
            rules: var(RULES_PATH_ENV, defaults.rules),
            base_output_dir: var(OUTPUT_DIR_ENV, defaults.base_output_dir),
        }
    }
}

/// Load configuration and rules with environment variable overrides.
pub fn load_config(paths: &ConfigPaths) -> Result<Config, ConfigError> {
    if !paths.config.exists() {
        return Err(ConfigError::FileNotFound(paths.config.display().to_string()));
    }

    let mut config: Config = Figment::new()
        .merge(Toml::file(&paths.config))
        .merge(Env::prefixed("AUTOSTRM_").split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;
    // Figment dictionaries are sorted by key; rule order comes from the document.
    config.naming_rules = RulesConfig::from_toml(&read_file(&paths.config)?)?.naming_rules;

    let rules = load_rules(&paths.rules)?;
    let config = config.normalize(rules);

    tracing::info!(
        "Loaded {} sources, {} naming rules, {} tasks",
        config.sources.len(),
        config.naming_rules.len(),
        config.tasks.len()
    );

    Ok(config)
}

/// Load the standalone rules file. A missing file yields no rules.
pub fn load_rules(path: &Path) -> Result<RulesConfig, ConfigError> {
    if !path.exists() {
        tracing::warn!("Rules file not found at {}, using none", path.display());
        return Ok(RulesConfig::default());
    }

    RulesConfig::from_toml(&read_file(path)?)
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path)
        .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))
}

/// Load configuration from TOML strings (useful for testing)
pub fn load_config_from_str(config_toml: &str, rules_toml: &str) -> Result<Config, ConfigError> {
    let config: Config =
        toml::from_str(config_toml).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    let rules: RulesConfig =
        toml::from_str(rules_toml).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    Ok(config.normalize(rules))
}
