//! Catalogue configuration (TOML).
//!
//! Every section and field is optional; defaults reproduce the standard
//! behaviour, so an empty file is a valid configuration.
//!
//! ```toml
//! [sources]
//! enabled = ["raw_input", "direct_input", "xinput", "gaming_input", "hid"]
//!
//! [capabilities]
//! low_confidence_probe = true
//! flight_stick_estimate = true
//! probe_axis_threshold = 4
//!
//! [registry]
//! name_prefix_key_len = 17
//! name_donor = "direct_input"
//! name_recipients = ["raw_input", "hid"]
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::caps::ParseOptions;
use crate::error::ConfigError;
use crate::registry::NameDecoration;
use crate::sources::SourceKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub enabled: Vec<SourceKind>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            enabled: SourceKind::ALL.to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapabilitiesConfig {
    pub low_confidence_probe: bool,
    pub flight_stick_estimate: bool,
    pub probe_axis_threshold: u32,
}

impl Default for CapabilitiesConfig {
    fn default() -> Self {
        let opts = ParseOptions::default();
        Self {
            low_confidence_probe: opts.low_confidence_probe,
            flight_stick_estimate: opts.flight_stick_estimate,
            probe_axis_threshold: opts.probe_axis_threshold,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub name_prefix_key_len: usize,
    pub name_donor: SourceKind,
    pub name_recipients: Vec<SourceKind>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        let naming = NameDecoration::default();
        Self {
            name_prefix_key_len: naming.key_len,
            name_donor: naming.donor,
            name_recipients: naming.recipients,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub sources: SourcesConfig,
    pub capabilities: CapabilitiesConfig,
    pub registry: RegistryConfig,
}

impl CatalogConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let cfg: CatalogConfig = toml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.registry.name_prefix_key_len == 0 {
            return Err(ConfigError::Invalid {
                field: "registry.name_prefix_key_len",
                reason: "must be at least 1".into(),
            });
        }
        if self.registry.name_recipients.contains(&self.registry.name_donor) {
            return Err(ConfigError::Invalid {
                field: "registry.name_recipients",
                reason: format!("donor `{}` cannot also be a recipient", self.registry.name_donor),
            });
        }
        Ok(())
    }

    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            low_confidence_probe: self.capabilities.low_confidence_probe,
            flight_stick_estimate: self.capabilities.flight_stick_estimate,
            probe_axis_threshold: self.capabilities.probe_axis_threshold,
        }
    }

    pub fn name_decoration(&self) -> NameDecoration {
        NameDecoration {
            key_len: self.registry.name_prefix_key_len,
            donor: self.registry.name_donor,
            recipients: self.registry.name_recipients.clone(),
        }
    }

    #[inline]
    pub fn is_enabled(&self, kind: SourceKind) -> bool {
        self.sources.enabled.contains(&kind)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_default() {
        let cfg = CatalogConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, CatalogConfig::default());
        assert_eq!(cfg.parse_options(), ParseOptions::default());
        assert_eq!(cfg.name_decoration(), NameDecoration::default());
        assert!(SourceKind::ALL.iter().all(|k| cfg.is_enabled(*k)));
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = CatalogConfig::from_toml_str(
            r#"
            [sources]
            enabled = ["hid", "xinput"]

            [capabilities]
            flight_stick_estimate = false
            "#,
        )
        .unwrap();
        assert!(cfg.is_enabled(SourceKind::Hid));
        assert!(!cfg.is_enabled(SourceKind::DirectInput));
        assert!(!cfg.parse_options().flight_stick_estimate);
        assert!(cfg.parse_options().low_confidence_probe);
        assert_eq!(cfg.registry.name_prefix_key_len, 17);
    }

    #[test]
    fn zero_prefix_length_is_rejected() {
        let err = CatalogConfig::from_toml_str("[registry]\nname_prefix_key_len = 0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "registry.name_prefix_key_len",
                ..
            }
        ));
    }

    #[test]
    fn donor_cannot_be_recipient() {
        let err = CatalogConfig::from_toml_str(
            "[registry]\nname_donor = \"hid\"\nname_recipients = [\"hid\"]\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn unknown_source_is_a_parse_error() {
        let err = CatalogConfig::from_toml_str("[sources]\nenabled = [\"bluetooth\"]\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn toml_round_trip() {
        let cfg = CatalogConfig::default();
        let text = cfg.to_toml_string().unwrap();
        assert_eq!(CatalogConfig::from_toml_str(&text).unwrap(), cfg);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = CatalogConfig::load("/nonexistent/padcat.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
