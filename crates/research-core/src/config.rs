//! Workflow configuration
//!
//! Loaded from TOML; every field has a default so an empty file is valid.
//!
//! ```toml
//! max_revisions = 3
//! suspension_timeout_secs = 600
//!
//! [report]
//! model = "gpt-4.1"
//! temperature = 0.3
//!
//! [backend]
//! base_url = "https://api.openai.com/v1"
//! model = "gpt-4.1-mini"
//! api_key_env = "OPENAI_API_KEY"
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::ResearchError;
use crate::gate::DEFAULT_MAX_REVISIONS;
use crate::prompts::PromptTemplates;

/// Workflow configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    /// Maximum revision rounds before giving up
    pub max_revisions: usize,
    /// Timeout applied to each suspension point; none by default
    pub suspension_timeout_secs: Option<u64>,
    /// Report synthesis settings
    pub report: ReportSettings,
    /// Prompt templates
    pub templates: PromptTemplates,
    /// Generation backend settings
    pub backend: BackendSettings,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            max_revisions: DEFAULT_MAX_REVISIONS,
            suspension_timeout_secs: None,
            report: ReportSettings::default(),
            templates: PromptTemplates::default(),
            backend: BackendSettings::default(),
        }
    }
}

impl ResearchConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse configuration from TOML text
    ///
    /// # Errors
    /// `ResearchError::Config` on malformed TOML or unknown value types
    pub fn from_toml_str(text: &str) -> Result<Self, ResearchError> {
        let config: Self =
            toml::from_str(text).map_err(|e| ResearchError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    ///
    /// # Errors
    /// `ResearchError::Config` if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ResearchError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ResearchError::Config(format!("{}: {e}", path.display())))?;
        tracing::debug!(path = %path.display(), "Loaded research config");
        Self::from_toml_str(&text)
    }

    /// Check value ranges
    ///
    /// # Errors
    /// `ResearchError::Config` describing the first invalid value
    pub fn validate(&self) -> Result<(), ResearchError> {
        if let Some(t) = self.report.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(ResearchError::Config(format!(
                    "report.temperature must be within 0.0..=2.0, got {t}"
                )));
            }
        }
        if self.suspension_timeout_secs == Some(0) {
            return Err(ResearchError::Config(
                "suspension_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// With maximum revision rounds
    #[inline]
    #[must_use]
    pub fn with_max_revisions(mut self, max: usize) -> Self {
        self.max_revisions = max;
        self
    }

    /// With suspension timeout
    ///
    /// Rounded up to whole seconds, never below one second.
    #[inline]
    #[must_use]
    pub fn with_suspension_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.suspension_timeout_secs = timeout.map(whole_secs_ceil);
        self
    }

    /// With prompt templates
    #[inline]
    #[must_use]
    pub fn with_templates(mut self, templates: PromptTemplates) -> Self {
        self.templates = templates;
        self
    }

    /// With report settings
    #[inline]
    #[must_use]
    pub fn with_report(mut self, report: ReportSettings) -> Self {
        self.report = report;
        self
    }

    /// Suspension timeout as a duration
    #[must_use]
    pub fn suspension_timeout(&self) -> Option<Duration> {
        self.suspension_timeout_secs.map(Duration::from_secs)
    }
}

fn whole_secs_ceil(timeout: Duration) -> u64 {
    let secs = timeout.as_secs() + u64::from(timeout.subsec_nanos() > 0);
    secs.max(1)
}

/// Model settings for report synthesis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    /// Model requested for synthesis
    pub model: Option<String>,
    /// Sampling temperature for synthesis
    pub temperature: Option<f32>,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            model: Some("gpt-4.1".to_string()),
            temperature: Some(0.3),
        }
    }
}

/// Connection settings for the generation backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    /// API base URL
    pub base_url: String,
    /// Default model for drafting and revision
    pub model: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4.1-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(ResearchConfig::from_toml_str("").unwrap(), ResearchConfig::default());
    }

    #[test]
    fn partial_toml_overrides() {
        let config = ResearchConfig::from_toml_str(
            r#"
            max_revisions = 2
            suspension_timeout_secs = 90

            [report]
            temperature = 0.1

            [templates.persona]
            role = "Librarian"
            goal = "Find sources"
            backstory = "Decades in archives."
            "#,
        )
        .unwrap();

        assert_eq!(config.max_revisions, 2);
        assert_eq!(config.suspension_timeout(), Some(Duration::from_secs(90)));
        assert_eq!(config.report.temperature, Some(0.1));
        assert_eq!(config.report.model.as_deref(), Some("gpt-4.1"));
        assert_eq!(config.templates.persona.role, "Librarian");
        assert_eq!(config.templates.draft, PromptTemplates::default().draft);
    }

    #[test]
    fn out_of_range_temperature_rejected() {
        let err = ResearchConfig::from_toml_str("[report]\ntemperature = 5.0").unwrap_err();
        assert!(matches!(err, ResearchError::Config(_)));
    }

    #[test]
    fn zero_timeout_rejected() {
        assert!(ResearchConfig::from_toml_str("suspension_timeout_secs = 0").is_err());
    }

    #[test]
    fn sub_second_timeout_rounds_up() {
        let config = ResearchConfig::new().with_suspension_timeout(Some(Duration::from_millis(900)));
        assert_eq!(config.suspension_timeout(), Some(Duration::from_secs(1)));
        assert!(config.validate().is_ok());

        let config = config.with_suspension_timeout(Some(Duration::from_millis(1500)));
        assert_eq!(config.suspension_timeout(), Some(Duration::from_secs(2)));

        let config = config.with_suspension_timeout(Some(Duration::ZERO));
        assert_eq!(config.suspension_timeout(), Some(Duration::from_secs(1)));

        let config = config.with_suspension_timeout(Some(Duration::from_secs(30)));
        assert_eq!(config.suspension_timeout_secs, Some(30));

        let config = config.with_suspension_timeout(None);
        assert_eq!(config.suspension_timeout(), None);
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_revisions = 7").unwrap();

        let config = ResearchConfig::load(file.path()).unwrap();
        assert_eq!(config.max_revisions, 7);
    }

    #[test]
    fn load_missing_file_is_config_error() {
        let err = ResearchConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ResearchError::Config(_)));
    }
}
