use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Test,
    Live,
}

/// Settings shared by every transaction started from one host.
///
/// Every field has a default so a partial (or absent) JSON file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowConfig {
    #[serde(default)]
    pub environment: Environment,
    /// Currency applied to payment submissions that do not name one.
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Bound of the orchestrator actor's command mailbox.
    #[serde(default = "default_mailbox_capacity")]
    pub mailbox_capacity: usize,
    /// Where the caller expects to be returned once the transaction ends.
    #[serde(default)]
    pub return_target: Option<String>,
}

fn default_currency() -> String {
    "EUR".to_string()
}

fn default_mailbox_capacity() -> usize {
    32
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            currency: default_currency(),
            mailbox_capacity: default_mailbox_capacity(),
            return_target: None,
        }
    }
}

impl FlowConfig {
    /// Loads the config from a JSON file, or returns the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let data = std::fs::read_to_string(path)?;
                Ok(serde_json::from_str(&data)?)
            }
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_without_path_uses_defaults() {
        let config = FlowConfig::load(None).unwrap();
        assert_eq!(config, FlowConfig::default());
        assert_eq!(config.currency, "EUR");
        assert_eq!(config.mailbox_capacity, 32);
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"environment": "live", "currency": "USD"}}"#).unwrap();

        let config = FlowConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.environment, Environment::Live);
        assert_eq!(config.currency, "USD");
        assert_eq!(config.mailbox_capacity, 32);
        assert!(config.return_target.is_none());
    }

    #[test]
    fn test_load_malformed_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not json").unwrap();
        assert!(FlowConfig::load(Some(file.path())).is_err());
    }
}
