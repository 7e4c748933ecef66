//! Engine configuration
//!
//! Loaded from TOML; every field has a default so an empty document is valid.
//!
//! ```toml
//! default_neighborhood = "p"
//!
//! [render]
//! html_mode = "sanitize"
//! autolink = true
//!
//! [coordinator]
//! default_deadline_ms = 2000
//! unknown_target_retries = 1
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;
use xref_markup::{HtmlMode, RenderOptions};

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct XrefConfig {
    /// Renderer options
    pub render: RenderOptions,
    /// Coordinator options
    pub coordinator: CoordinatorConfig,
    /// Neighborhood assumed for projects missing from the directory
    pub default_neighborhood: String,
}

/// Coordinator options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Deadline applied to writes that carry none
    pub default_deadline_ms: Option<u64>,
    /// Drop-and-retry rounds when the graph rejects an unknown target
    pub unknown_target_retries: u32,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            default_deadline_ms: None,
            unknown_target_retries: 1,
        }
    }
}

impl Default for XrefConfig {
    fn default() -> Self {
        Self {
            render: RenderOptions::default(),
            coordinator: CoordinatorConfig::default(),
            default_neighborhood: "p".to_string(),
        }
    }
}

impl XrefConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a TOML document
    ///
    /// # Errors
    /// - [`ConfigError::Parse`] for malformed TOML or wrongly typed fields
    /// - [`ConfigError::Invalid`] for out-of-range values
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML
    ///
    /// # Errors
    /// Returns [`ConfigError::Serialize`] if TOML cannot represent the value
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }

    /// Check value ranges
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] naming the first bad field
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.render.max_source_bytes == 0 {
            return Err(ConfigError::invalid("render.max_source_bytes", "must be positive"));
        }
        let class = &self.render.link_class;
        if class.is_empty()
            || !class
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        {
            return Err(ConfigError::invalid(
                "render.link_class",
                "must be a non-empty CSS class name",
            ));
        }
        if self.coordinator.default_deadline_ms == Some(0) {
            return Err(ConfigError::invalid(
                "coordinator.default_deadline_ms",
                "must be positive when set",
            ));
        }
        if self.default_neighborhood.is_empty() || self.default_neighborhood.contains(['/', ':']) {
            return Err(ConfigError::invalid(
                "default_neighborhood",
                "must be a non-empty name without '/' or ':'",
            ));
        }
        Ok(())
    }

    /// With raw HTML mode
    #[inline]
    #[must_use]
    pub fn with_html_mode(mut self, mode: HtmlMode) -> Self {
        self.render.html_mode = mode;
        self
    }

    /// With renderer options
    #[inline]
    #[must_use]
    pub fn with_render(mut self, render: RenderOptions) -> Self {
        self.render = render;
        self
    }

    /// With default write deadline
    #[inline]
    #[must_use]
    pub fn with_default_deadline(mut self, deadline: Duration) -> Self {
        self.coordinator.default_deadline_ms =
            Some(u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// With unknown-target retry rounds
    #[inline]
    #[must_use]
    pub fn with_unknown_target_retries(mut self, retries: u32) -> Self {
        self.coordinator.unknown_target_retries = retries;
        self
    }

    /// With default neighborhood
    #[inline]
    #[must_use]
    pub fn with_default_neighborhood(mut self, neighborhood: impl Into<String>) -> Self {
        self.default_neighborhood = neighborhood.into();
        self
    }

    /// Default write deadline
    #[must_use]
    pub fn default_deadline(&self) -> Option<Duration> {
        self.coordinator
            .default_deadline_ms
            .map(Duration::from_millis)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Malformed TOML
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialization failed
    #[error("cannot serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Value out of range
    #[error("invalid value for {field}: {reason}")]
    Invalid {
        /// Dotted field path
        field: &'static str,
        /// What is wrong
        reason: &'static str,
    },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: &'static str) -> Self {
        Self::Invalid { field, reason }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_document_is_default() {
        assert_eq!(XrefConfig::from_toml_str("").unwrap(), XrefConfig::default());
    }

    #[test]
    fn parses_all_sections() {
        let config = XrefConfig::from_toml_str(
            r#"
            default_neighborhood = "u"

            [render]
            html_mode = "escape"
            autolink = false
            max_source_bytes = 4096
            link_class = "xref"

            [coordinator]
            default_deadline_ms = 250
            unknown_target_retries = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.default_neighborhood, "u");
        assert_eq!(config.render.html_mode, HtmlMode::Escape);
        assert!(!config.render.autolink);
        assert_eq!(config.render.max_source_bytes, 4096);
        assert_eq!(config.render.link_class, "xref");
        assert_eq!(config.default_deadline(), Some(Duration::from_millis(250)));
        assert_eq!(config.coordinator.unknown_target_retries, 3);
    }

    #[test]
    fn partial_sections_keep_defaults() {
        let config = XrefConfig::from_toml_str("[render]\nhtml_mode = \"strip\"\n").unwrap();
        assert_eq!(config.render.html_mode, HtmlMode::Strip);
        assert!(config.render.autolink);
        assert_eq!(config.coordinator.unknown_target_retries, 1);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            XrefConfig::from_toml_str("[render]\nhtml_mode = \"raw\"\n"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            XrefConfig::from_toml_str("[render]\nmax_source_bytes = 0\n"),
            Err(ConfigError::Invalid { field: "render.max_source_bytes", .. })
        ));
        assert!(matches!(
            XrefConfig::from_toml_str("[render]\nlink_class = \"a\\\" onclick\"\n"),
            Err(ConfigError::Invalid { field: "render.link_class", .. })
        ));
        assert!(matches!(
            XrefConfig::from_toml_str("[coordinator]\ndefault_deadline_ms = 0\n"),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(XrefConfig::from_toml_str("default_neighborhood = \"\"").is_err());
    }

    #[test]
    fn toml_roundtrip() {
        let config = XrefConfig::new()
            .with_html_mode(HtmlMode::Escape)
            .with_default_deadline(Duration::from_secs(2))
            .with_default_neighborhood("u");
        let text = config.to_toml_string().unwrap();
        assert_eq!(XrefConfig::from_toml_str(&text).unwrap(), config);
    }
}
