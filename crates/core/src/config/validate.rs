use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Every backend has a `type`
/// - Paginated sources have a non-zero page size
/// - Every task has at least one file pattern
///
/// Dangling references are not checked here; they only abort the task that
/// carries them.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    for (name, source) in &config.sources {
        if source.kind.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "sources.{}.type cannot be empty",
                name
            )));
        }
        if source.page_size == 0 {
            return Err(ConfigError::ValidationError(format!(
                "sources.{}.page_size cannot be 0",
                name
            )));
        }
    }

    for (name, provider) in &config.metadata_providers {
        if provider.kind.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "metadata_providers.{}.type cannot be empty",
                name
            )));
        }
    }

    for (name, output) in &config.outputs {
        if output.kind.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "outputs.{}.type cannot be empty",
                name
            )));
        }
    }

    for (name, task) in &config.tasks {
        if task.file_patterns.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "tasks.{}.file_patterns cannot be empty",
                name
            )));
        }
    }

    Ok(())
}
