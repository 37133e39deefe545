use regex_lite::Regex;

use crate::config::ConfigError;

/// Filename inclusion patterns of a task. A file is eligible when any
/// pattern matches somewhere in its filename.
#[derive(Debug, Clone)]
pub struct InclusionFilter {
    patterns: Vec<Regex>,
}

impl InclusionFilter {
    pub fn new(patterns: &[String]) -> Result<Self, ConfigError> {
        let patterns = patterns
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| {
                    ConfigError::ValidationError(format!(
                        "invalid file pattern '{}': {}",
                        pattern, e
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn matches(&self, filename: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(filename))
    }
}
