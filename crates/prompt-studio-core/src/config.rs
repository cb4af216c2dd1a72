use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

use crate::form::{clamp_max_output_tokens, step_temperature, FormState, Model};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine config directory")]
    NoConfigDir,
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Startup defaults for the form. Read-only: nothing is ever written back, and
/// credentials are never read from here.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub default_model: Option<String>,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub instruction: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from the default location. A missing file yields defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path()?;

        if !config_path.exists() {
            return Ok(Self::new());
        }

        Self::load_from(&config_path)
    }

    /// Load from an explicit path. The file must exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let config_content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&config_content, path)
    }

    fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        serde_json::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn get_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;

        Ok(config_dir.join("prompt-studio").join("config.json"))
    }

    /// Build the form the session starts with.
    ///
    /// Config values go through the same clamping the widgets apply, and an
    /// unknown model id falls back to the default model.
    pub fn initial_form(&self) -> FormState {
        let mut form = FormState::default();

        if let Some(id) = &self.default_model {
            match Model::from_str(id) {
                Some(model) => form.set_model(model),
                None => warn!(model = %id, "unknown model in config, using default"),
            }
        }

        if let Some(temperature) = self.temperature {
            form.set_temperature(step_temperature(temperature, 0));
        }

        if let Some(max_output_tokens) = self.max_output_tokens {
            form.set_max_output_tokens(clamp_max_output_tokens(max_output_tokens));
        }

        if let Some(instruction) = &self.instruction {
            form.set_instruction(instruction.clone());
        }

        form
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_config_gives_default_form() {
        let form = Config::new().initial_form();
        assert_eq!(form, FormState::default());
    }

    #[test]
    fn test_initial_form_applies_values() {
        let config: Config = serde_json::from_str(
            r#"{"default_model": "llama-3", "temperature": 0.3, "max_output_tokens": 512, "instruction": "be kind"}"#,
        )
        .unwrap();
        let form = config.initial_form();

        assert_eq!(form.model(), Model::Llama3);
        assert!((form.temperature() - 0.3).abs() < 1e-6);
        assert_eq!(form.max_output_tokens(), 512);
        assert_eq!(form.instruction(), "be kind");
    }

    #[test]
    fn test_initial_form_clamps_and_ignores_unknown_model() {
        let config = Config {
            default_model: Some("mistral".to_string()),
            temperature: Some(4.0),
            max_output_tokens: Some(100_000),
            instruction: None,
        };
        let form = config.initial_form();

        assert_eq!(form.model(), Model::Gpt4);
        assert_eq!(form.temperature(), 1.0);
        assert_eq!(form.max_output_tokens(), 8000);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"default_model": "claude-3"}}"#).unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.default_model.as_deref(), Some("claude-3"));
        assert_eq!(config.temperature, None);
    }

    #[test]
    fn test_load_from_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::load_from(&dir.path().join("nope.json"));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_load_from_malformed_file_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ nope").unwrap();
        let result = Config::load_from(file.path());
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }
}
