use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::ConfigError;

/// Kind of media a task discerns and materializes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Movie,
    #[serde(rename = "tvshow")]
    TvShow,
    Album,
    #[serde(rename = "episodedetails")]
    EpisodeDetails,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Movie => "movie",
            MediaType::TvShow => "tvshow",
            MediaType::Album => "album",
            MediaType::EpisodeDetails => "episodedetails",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Default display language for tasks that don't set one.
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub sources: BTreeMap<String, SourceConfig>,
    #[serde(default)]
    pub metadata_providers: BTreeMap<String, MetadataProviderConfig>,
    /// Naming rules in declaration order.
    #[serde(default, deserialize_with = "ordered_rules", skip_serializing)]
    pub naming_rules: Vec<NamingRule>,
    #[serde(default)]
    pub outputs: BTreeMap<String, OutputConfig>,
    #[serde(default)]
    pub tasks: BTreeMap<String, TaskConfig>,
}

fn default_language() -> String {
    "en".to_string()
}

/// Separate rules file, only carries naming rules.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RulesConfig {
    #[serde(default, deserialize_with = "ordered_rules", skip_serializing)]
    pub naming_rules: Vec<NamingRule>,
}

impl RulesConfig {
    /// Read the `naming_rules` tables of a TOML document, ignoring
    /// everything else in it.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

/// `[naming_rules.<name>]` tables as a list in document order, with each
/// table key copied into the rule's `name`.
fn ordered_rules<'de, D>(deserializer: D) -> Result<Vec<NamingRule>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let table = toml::Table::deserialize(deserializer)?;
    table
        .into_iter()
        .map(|(name, value)| {
            let mut rule = NamingRule::deserialize(value).map_err(serde::de::Error::custom)?;
            rule.name = name;
            Ok(rule)
        })
        .collect()
}

/// Where files are listed from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SourceConfig {
    /// Backend discriminator ("webdav", "local_folder").
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    /// Root path to traverse.
    pub path: String,
    /// WebDAV server base URL (e.g., "http://nas:5005").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_address: Option<String>,
    /// Prefix of the URL written into reference files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visit_url_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default)]
    pub use_pagination: bool,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_page_size() -> usize {
    1000
}

/// External catalog used to enrich parsed titles.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetadataProviderConfig {
    /// Backend discriminator ("tmdb").
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    pub api_key: String,
    /// Base URL (default: https://api.themoviedb.org/3).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Image base URL for posters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_base_url: Option<String>,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    30
}

/// A named filename pattern.
///
/// The regex exposes the named groups `title`, `year`, `subtitle` and
/// `nonengtitle`; dots inside `title` and `nonengtitle` stand for spaces.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NamingRule {
    #[serde(default)]
    pub name: String,
    pub regex: String,
    pub supported_media_types: Vec<MediaType>,
    #[serde(default)]
    pub example: String,
}

impl NamingRule {
    pub fn supports(&self, media_type: MediaType) -> bool {
        self.supported_media_types.contains(&media_type)
    }
}

/// Library layout the task writes into.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Backend discriminator ("jellyfin").
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub library_name: String,
    /// Directory under the base output dir.
    pub output_dir: String,
}

/// One configured unit of work.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TaskConfig {
    #[serde(default)]
    pub name: String,
    pub source: String,
    pub metadata_provider: String,
    pub media_type: MediaType,
    /// A file is eligible if any of these patterns matches its filename.
    pub file_patterns: Vec<String>,
    /// Allow-list of naming rules; all merged rules apply when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub naming_rules: Option<Vec<String>>,
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// Everything a task needs, resolved from the configuration.
#[derive(Debug, Clone)]
pub struct TaskContext {
    pub name: String,
    pub source: Arc<SourceConfig>,
    pub metadata_provider: MetadataProviderConfig,
    pub output: OutputConfig,
    pub media_type: MediaType,
    pub file_patterns: Vec<String>,
    pub naming_rules: Vec<NamingRule>,
    /// Base output dir joined with the output's `output_dir`.
    pub destination: PathBuf,
    pub language: String,
}

impl Config {
    /// Copy every table key into the entry's `name` field and fold in the
    /// rules file. Rules file entries come first; a rule from this config
    /// replaces a same-named one in its slot, or is appended.
    pub fn normalize(mut self, rules: RulesConfig) -> Self {
        for (key, source) in self.sources.iter_mut() {
            source.name = key.clone();
        }
        for (key, provider) in self.metadata_providers.iter_mut() {
            provider.name = key.clone();
        }
        for (key, output) in self.outputs.iter_mut() {
            output.name = key.clone();
        }
        for (key, task) in self.tasks.iter_mut() {
            task.name = key.clone();
        }

        let mut merged = rules.naming_rules;
        for rule in std::mem::take(&mut self.naming_rules) {
            match merged.iter_mut().find(|existing| existing.name == rule.name) {
                Some(slot) => *slot = rule,
                None => merged.push(rule),
            }
        }
        self.naming_rules = merged;
        self
    }

    pub fn naming_rule(&self, name: &str) -> Option<&NamingRule> {
        self.naming_rules.iter().find(|rule| rule.name == name)
    }

    pub fn source(&self, name: &str) -> Result<&SourceConfig, ConfigError> {
        self.sources
            .get(name)
            .ok_or_else(|| ConfigError::missing("source", name))
    }

    pub fn metadata_provider(&self, name: &str) -> Result<&MetadataProviderConfig, ConfigError> {
        self.metadata_providers
            .get(name)
            .ok_or_else(|| ConfigError::missing("metadata provider", name))
    }

    pub fn output(&self, name: &str) -> Result<&OutputConfig, ConfigError> {
        self.outputs
            .get(name)
            .ok_or_else(|| ConfigError::missing("output", name))
    }

    pub fn task(&self, name: &str) -> Result<&TaskConfig, ConfigError> {
        self.tasks
            .get(name)
            .ok_or_else(|| ConfigError::missing("task", name))
    }

    /// Naming rules that apply to a task, in declaration order. An
    /// allow-list only filters; it does not reorder.
    pub fn naming_rules_for(&self, task: &TaskConfig) -> Vec<NamingRule> {
        match &task.naming_rules {
            Some(allowed) => {
                tracing::info!(
                    "Task '{}' uses its own naming rules: {}",
                    task.name,
                    allowed.join(", ")
                );
                for name in allowed.iter().filter(|name| self.naming_rule(name).is_none()) {
                    tracing::warn!(
                        "Task '{}' references unknown naming rule '{}'",
                        task.name,
                        name
                    );
                }
                self.naming_rules
                    .iter()
                    .filter(|rule| allowed.contains(&rule.name))
                    .cloned()
                    .collect()
            }
            None => {
                tracing::info!("Task '{}' uses all naming rules", task.name);
                self.naming_rules.clone()
            }
        }
    }

    /// Resolve a task and everything it references.
    pub fn task_context(
        &self,
        task_name: &str,
        base_output_dir: &Path,
    ) -> Result<TaskContext, ConfigError> {
        let task = self.task(task_name)?;
        let source = self.source(&task.source)?;
        let metadata_provider = self.metadata_provider(&task.metadata_provider)?;
        let output = self.output(&task.output)?;

        Ok(TaskContext {
            name: task.name.clone(),
            source: Arc::new(source.clone()),
            metadata_provider: metadata_provider.clone(),
            output: output.clone(),
            media_type: task.media_type,
            file_patterns: task.file_patterns.clone(),
            naming_rules: self.naming_rules_for(task),
            destination: base_output_dir.join(&output.output_dir),
            language: task
                .language
                .clone()
                .unwrap_or_else(|| self.language.clone()),
        })
    }
}
